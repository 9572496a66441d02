use clap::{Args, Parser, Subcommand};

use crate::commands;
use crate::config::Config;
use crate::export::{CypherFormat, OptimizationType, Quotes, TxFormat};
use crate::meta::MetaConfig;
use crate::utils::CancellationToken;

#[derive(Parser)]
#[command(
    name = "metagraph",
    version,
    about = "Profile graph schemas and export graphs as CSV or Cypher"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Graph snapshot (JSON) to read instead of the configured Neo4j database
    #[arg(short, long, global = true)]
    pub input: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Schema statistics and sampled metadata
    Meta {
        #[command(subcommand)]
        meta_action: MetaAction,
    },
    /// Export the graph or part of it
    Export {
        #[command(subcommand)]
        export_type: ExportType,
    },
    /// Load an exported CSV file into a graph snapshot
    Import {
        #[command(subcommand)]
        import_type: ImportType,
    },
    /// Neo4j database operations
    Database {
        #[command(subcommand)]
        db_action: DatabaseAction,
    },
}

/// Sampling and filter flags of the metadata commands.
#[derive(Args, Debug, Clone, Default)]
pub struct SamplingArgs {
    /// Nodes to sample per label, -1 for all
    #[arg(long, allow_negative_numbers = true)]
    pub sample: Option<i64>,
    /// Relationships per node and type to inspect, -1 for no cap
    #[arg(long, allow_negative_numbers = true)]
    pub max_rels: Option<i64>,
    #[arg(long, value_delimiter = ',')]
    pub include_labels: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub exclude_labels: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub include_rels: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub exclude_rels: Vec<String>,
    /// Seed for the sampling jitter
    #[arg(long)]
    pub seed: Option<u64>,
}

impl SamplingArgs {
    pub fn apply(&self, mut config: MetaConfig) -> MetaConfig {
        if let Some(sample) = self.sample {
            config.sample = sample;
        }
        if let Some(max_rels) = self.max_rels {
            config.max_rels = max_rels;
        }
        config.include_labels.extend(self.include_labels.iter().cloned());
        config.exclude_labels.extend(self.exclude_labels.iter().cloned());
        config.include_rels.extend(self.include_rels.iter().cloned());
        config.exclude_rels.extend(self.exclude_rels.iter().cloned());
        config
    }
}

#[derive(Subcommand)]
pub enum MetaAction {
    /// Label, type and pattern counts
    Stats {
        #[arg(long, value_delimiter = ',')]
        labels: Option<Vec<String>>,
        #[arg(long, value_delimiter = ',')]
        rel_types: Option<Vec<String>>,
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// One row per label/type and property
    Data {
        #[command(flatten)]
        sampling: SamplingArgs,
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Nested schema map per label and relationship type
    Schema {
        #[command(flatten)]
        sampling: SamplingArgs,
    },
    /// Labels and the relationship patterns between them
    Graph {
        #[arg(long, value_delimiter = ',')]
        labels: Option<Vec<String>>,
        #[arg(long, value_delimiter = ',')]
        rel_types: Option<Vec<String>>,
        /// Drop patterns that no sampled relationship confirms
        #[arg(long)]
        prune: bool,
        #[arg(long, allow_negative_numbers = true)]
        sample: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        max_rels: Option<i64>,
        /// Always scan from the start label instead of the sparser side
        #[arg(long)]
        scan_from_side: bool,
        #[arg(long, default_value = "table")]
        format: String,
    },
}

/// What part of the graph an export covers.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Comma separated node ids
    #[arg(long)]
    pub nodes: Option<String>,
    /// Comma separated relationship ids, endpoints are included
    #[arg(long)]
    pub rels: Option<String>,
    /// Only nodes with one of these labels
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,
    /// Only relationships of these types
    #[arg(long, value_delimiter = ',')]
    pub rel_types: Vec<String>,
}

#[derive(Subcommand)]
pub enum ExportType {
    /// CSV in the combined layout or as bulk import files
    Csv {
        /// Output file, stdout when omitted
        output: Option<String>,
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long)]
        bulk_import: bool,
        #[arg(long)]
        separate_header: bool,
        #[arg(long)]
        separate_files: bool,
        #[arg(long)]
        quotes: Option<Quotes>,
        #[arg(long)]
        differentiate_nulls: bool,
        #[arg(long)]
        use_types: bool,
        #[arg(long)]
        delim: Option<String>,
        #[arg(long)]
        array_delim: Option<String>,
        #[arg(long)]
        batch_size: Option<usize>,
        /// Print progress rows with the produced text as JSON lines
        #[arg(long)]
        stream: bool,
    },
    /// Cypher statement script
    Cypher {
        /// Output file, stdout when omitted
        output: Option<String>,
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long)]
        format: Option<TxFormat>,
        #[arg(long)]
        cypher_format: Option<CypherFormat>,
        #[arg(long)]
        optimization: Option<OptimizationType>,
        #[arg(long)]
        unwind_batch_size: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        separate_files: bool,
        #[arg(long)]
        if_not_exists: bool,
        #[arg(long)]
        await_for_indexes: Option<u64>,
        #[arg(long)]
        stream: bool,
    },
}

#[derive(Subcommand)]
pub enum ImportType {
    /// CSV in the combined export layout
    Csv {
        file_path: String,
        /// Snapshot file to write
        output_path: String,
        #[arg(long)]
        ignore_duplicate_nodes: bool,
        /// The file was exported with --differentiate-nulls
        #[arg(long)]
        differentiate_nulls: bool,
        #[arg(long, default_value = ",")]
        delim: char,
        #[arg(long, default_value = ";")]
        array_delim: String,
    },
}

#[derive(Subcommand)]
pub enum DatabaseAction {
    /// Write the database to a snapshot file
    Snapshot { output_path: String },
    /// Show database statistics
    Stats {
        #[arg(long, default_value = "table")]
        format: String,
    },
}

impl Cli {
    pub async fn execute(self, config: Config, cancel: CancellationToken) -> anyhow::Result<()> {
        let input = self.input.as_deref();
        match self.command {
            Commands::Meta { meta_action } => {
                commands::meta::handle_meta(meta_action, input, &config, &cancel).await
            }
            Commands::Export { export_type } => {
                commands::export::handle_export(export_type, input, &config, &cancel).await
            }
            Commands::Import { import_type } => commands::import::handle_import(import_type),
            Commands::Database { db_action } => {
                commands::database::handle_database(db_action, &config).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sampling_flags_extend_config() {
        let cli = Cli::parse_from([
            "metagraph",
            "meta",
            "data",
            "--sample",
            "-1",
            "--exclude-labels",
            "A,B",
        ]);
        let Commands::Meta {
            meta_action: MetaAction::Data { sampling, .. },
        } = cli.command
        else {
            panic!("expected meta data");
        };
        let config = sampling.apply(MetaConfig::default());
        assert_eq!(config.sample, -1);
        assert_eq!(config.max_rels, 100);
        assert!(!config.label_allowed("B"));
    }

    #[test]
    fn test_export_enums_parse() {
        let cli = Cli::parse_from([
            "metagraph",
            "--input",
            "g.json",
            "export",
            "cypher",
            "--format",
            "cypher-shell",
            "--cypher-format",
            "updateAll",
            "--optimization",
            "unwind_batch",
        ]);
        let Commands::Export {
            export_type:
                ExportType::Cypher {
                    format,
                    cypher_format,
                    optimization,
                    ..
                },
        } = cli.command
        else {
            panic!("expected export cypher");
        };
        assert_eq!(cli.input.as_deref(), Some("g.json"));
        assert_eq!(format, Some(TxFormat::CypherShell));
        assert_eq!(cypher_format, Some(CypherFormat::UpdateAll));
        assert_eq!(optimization, Some(OptimizationType::UnwindBatch));
    }
}
