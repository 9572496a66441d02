//! Graph export to CSV files and Cypher statement scripts.

pub mod batch;
pub mod csv;
pub mod cypher;
pub mod progress;
pub mod sink;
pub mod stream;
pub mod subgraph;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::graph::GraphStore;
use crate::utils::CancellationToken;

pub use batch::BatchState;
pub use cypher::{CypherExporter, CypherOutcome, ExportCounters, ExportPhase};
pub use progress::{ProgressInfo, ProgressReporter};
pub use sink::{ExportSink, FileSink, MemorySink};
pub use stream::{stream_export, ProgressStream};
pub use subgraph::{Selection, SubGraph};

pub const DEFAULT_BATCH_SIZE: usize = 20_000;
pub const DEFAULT_UNWIND_BATCH_SIZE: usize = 20;
pub const DEFAULT_AWAIT_SECONDS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Cypher,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Cypher => "cypher",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction framing of the generated Cypher script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxFormat {
    #[default]
    #[serde(rename = "neo4j-shell")]
    Neo4jShell,
    #[serde(rename = "cypher-shell")]
    CypherShell,
    #[serde(rename = "plain")]
    Plain,
}

impl TxFormat {
    pub fn begin(self) -> Option<&'static str> {
        match self {
            TxFormat::Neo4jShell => Some("BEGIN"),
            TxFormat::CypherShell => Some(":begin"),
            TxFormat::Plain => None,
        }
    }

    pub fn commit(self) -> Option<&'static str> {
        match self {
            TxFormat::Neo4jShell => Some("COMMIT"),
            TxFormat::CypherShell => Some(":commit"),
            TxFormat::Plain => None,
        }
    }

    pub fn schema_await(self, seconds: u64) -> String {
        match self {
            TxFormat::Neo4jShell => "SCHEMA AWAIT".to_string(),
            TxFormat::CypherShell | TxFormat::Plain => {
                format!("CALL db.awaitIndexes({seconds});")
            }
        }
    }
}

impl FromStr for TxFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "neo4j-shell" => Ok(TxFormat::Neo4jShell),
            "cypher-shell" => Ok(TxFormat::CypherShell),
            "plain" => Ok(TxFormat::Plain),
            other => Err(format!("unknown format '{other}' (neo4j-shell, cypher-shell, plain)")),
        }
    }
}

/// How node and relationship statements treat entities already present in
/// the target database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CypherFormat {
    #[default]
    Create,
    UpdateAll,
    AddStructure,
    UpdateStructure,
}

impl CypherFormat {
    /// Formats that merge relationships and need a per-relationship id to
    /// tell parallel relationships apart.
    pub fn merges_relationships(self) -> bool {
        matches!(self, CypherFormat::UpdateAll | CypherFormat::UpdateStructure)
    }
}

impl FromStr for CypherFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "create" => Ok(CypherFormat::Create),
            "updateAll" => Ok(CypherFormat::UpdateAll),
            "addStructure" => Ok(CypherFormat::AddStructure),
            "updateStructure" => Ok(CypherFormat::UpdateStructure),
            other => Err(format!(
                "unknown cypher format '{other}' (create, updateAll, addStructure, updateStructure)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationType {
    #[default]
    None,
    UnwindBatch,
    UnwindBatchParams,
}

impl FromStr for OptimizationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(OptimizationType::None),
            "unwind_batch" => Ok(OptimizationType::UnwindBatch),
            "unwind_batch_params" => Ok(OptimizationType::UnwindBatchParams),
            other => Err(format!(
                "unknown optimization '{other}' (none, unwind_batch, unwind_batch_params)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Optimizations {
    #[serde(rename = "type")]
    pub kind: OptimizationType,
    pub unwind_batch_size: usize,
}

impl Default for Optimizations {
    fn default() -> Self {
        Self {
            kind: OptimizationType::None,
            unwind_batch_size: DEFAULT_UNWIND_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Quotes {
    #[default]
    Always,
    None,
    IfNeeded,
}

impl FromStr for Quotes {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "always" => Ok(Quotes::Always),
            "none" => Ok(Quotes::None),
            "ifNeeded" => Ok(Quotes::IfNeeded),
            other => Err(format!("unknown quotes mode '{other}' (always, none, ifNeeded)")),
        }
    }
}

/// Options of one export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    pub batch_size: usize,
    pub format: TxFormat,
    pub cypher_format: CypherFormat,
    pub use_optimizations: Optimizations,
    pub separate_files: bool,
    pub bulk_import: bool,
    pub separate_header: bool,
    pub quotes: Quotes,
    pub differentiate_nulls: bool,
    pub use_types: bool,
    pub delim: String,
    pub array_delim: String,
    pub if_not_exists: bool,
    pub await_for_indexes: u64,
    pub stream: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            format: TxFormat::default(),
            cypher_format: CypherFormat::default(),
            use_optimizations: Optimizations::default(),
            separate_files: false,
            bulk_import: false,
            separate_header: false,
            quotes: Quotes::default(),
            differentiate_nulls: false,
            use_types: false,
            delim: ",".to_string(),
            array_delim: ";".to_string(),
            if_not_exists: false,
            await_for_indexes: DEFAULT_AWAIT_SECONDS,
            stream: false,
        }
    }
}

impl ExportConfig {
    /// Rejects option combinations before the store is touched.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::malformed("batchSize must be greater than 0"));
        }
        if self.use_optimizations.kind != OptimizationType::None
            && self.use_optimizations.unwind_batch_size == 0
        {
            return Err(Error::malformed("unwindBatchSize must be greater than 0"));
        }
        if self.delim.len() != 1 {
            return Err(Error::malformed(format!(
                "delim must be a single ASCII character, got '{}'",
                self.delim
            )));
        }
        if self.array_delim.is_empty() {
            return Err(Error::malformed("arrayDelim cannot be empty"));
        }
        if self.bulk_import && self.stream {
            return Err(Error::malformed("bulkImport cannot be combined with stream"));
        }
        Ok(())
    }

    pub fn delimiter(&self) -> u8 {
        self.delim.as_bytes().first().copied().unwrap_or(b',')
    }

    pub fn optimized(&self) -> bool {
        self.use_optimizations.kind != OptimizationType::None
    }
}

/// A complete export request: what to export, in which format, how.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub format: ExportFormat,
    pub selection: Selection,
    pub config: ExportConfig,
    /// Destination reported in progress rows
    pub file: Option<String>,
}

/// Runs `job` against `store`, writing to `sink` and reporting through
/// `reporter`. The final progress row is returned on success.
pub fn run_export<S: GraphStore + ?Sized>(
    store: &S,
    job: &ExportJob,
    sink: &mut dyn ExportSink,
    reporter: &mut ProgressReporter,
    cancel: &CancellationToken,
) -> Result<ProgressInfo> {
    job.config.validate()?;
    let subgraph = SubGraph::select(store, &job.selection)?;
    reporter.set_source(subgraph.describe());
    tracing::info!(
        format = %job.format,
        source = %subgraph.describe(),
        "starting export"
    );
    match job.format {
        ExportFormat::Csv => {
            csv::CsvExporter::new(&subgraph, &job.config, cancel).export(sink, reporter)?;
        }
        ExportFormat::Cypher => {
            CypherExporter::new(&subgraph, &job.config, cancel).export(sink, reporter)?;
        }
    }
    reporter.done()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.batch_size, 20_000);
        assert_eq!(config.format, TxFormat::Neo4jShell);
        assert_eq!(config.use_optimizations.unwind_batch_size, 20);
        assert_eq!(config.quotes, Quotes::Always);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_combinations() {
        let bulk_stream = ExportConfig {
            bulk_import: true,
            stream: true,
            ..ExportConfig::default()
        };
        assert!(matches!(bulk_stream.validate(), Err(Error::MalformedInput(_))));
        let zero = ExportConfig {
            batch_size: 0,
            ..ExportConfig::default()
        };
        assert!(zero.validate().is_err());
        let delim = ExportConfig {
            delim: "||".into(),
            ..ExportConfig::default()
        };
        assert!(delim.validate().is_err());
    }

    #[test]
    fn test_camel_case_config() {
        let config: ExportConfig = serde_json::from_str(
            r#"{
                "batchSize": 10,
                "format": "cypher-shell",
                "cypherFormat": "updateAll",
                "useOptimizations": {"type": "unwind_batch_params", "unwindBatchSize": 5},
                "quotes": "ifNeeded",
                "differentiateNulls": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.format, TxFormat::CypherShell);
        assert_eq!(config.cypher_format, CypherFormat::UpdateAll);
        assert_eq!(config.use_optimizations.kind, OptimizationType::UnwindBatchParams);
        assert_eq!(config.quotes, Quotes::IfNeeded);
        assert!(config.differentiate_nulls);
        assert_eq!(config.array_delim, ";");
    }

    #[test]
    fn test_tx_markers() {
        assert_eq!(TxFormat::Neo4jShell.begin(), Some("BEGIN"));
        assert_eq!(TxFormat::CypherShell.commit(), Some(":commit"));
        assert_eq!(TxFormat::Plain.begin(), None);
        assert_eq!(TxFormat::Neo4jShell.schema_await(300), "SCHEMA AWAIT");
        assert_eq!(TxFormat::Plain.schema_await(300), "CALL db.awaitIndexes(300);");
    }
}
