use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::cli::ImportType;
use crate::graph::Snapshot;
use crate::import::{self, ImportConfig, ImportSummary};

pub fn handle_import(import_type: ImportType) -> Result<()> {
    match import_type {
        ImportType::Csv {
            file_path,
            output_path,
            ignore_duplicate_nodes,
            differentiate_nulls,
            delim,
            array_delim,
        } => {
            let config = ImportConfig {
                ignore_duplicate_nodes,
                differentiate_nulls,
                delim,
                array_delim,
            };
            let summary = import_csv(&file_path, &output_path, &config)?;
            print_import_summary(&summary, &output_path);
        }
    }

    Ok(())
}

fn import_csv(file_path: &str, output_path: &str, config: &ImportConfig) -> Result<ImportSummary> {
    if !Path::new(file_path).exists() {
        return Err(anyhow::anyhow!("File not found: {}", file_path));
    }
    let file = File::open(file_path).with_context(|| format!("Failed to open '{file_path}'"))?;
    let (graph, summary) = import::load(BufReader::new(file), config)
        .with_context(|| format!("Failed to import '{file_path}'"))?;

    Snapshot::from_store(&graph)?
        .save(output_path)
        .with_context(|| format!("Failed to write snapshot '{output_path}'"))?;
    tracing::info!(
        file_path,
        output_path,
        nodes = summary.nodes,
        relationships = summary.relationships,
        "csv imported"
    );
    Ok(summary)
}

fn print_import_summary(summary: &ImportSummary, output_path: &str) {
    println!("Import completed: {}", output_path);
    println!("  Nodes: {}", summary.nodes);
    println!("  Relationships: {}", summary.relationships);
    println!("  Properties: {}", summary.properties);
    if summary.skipped_duplicates > 0 {
        println!("  Skipped duplicate nodes: {}", summary.skipped_duplicates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_import_writes_loadable_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("graph.csv");
        let mut file = File::create(&csv_path).unwrap();
        write!(
            file,
            "\"_id\",\"_labels\",\"name\",\"_start\",\"_end\",\"_type\",\"since\"\n\
             \"0\",\":Person\",\"Ann\",,,,\n\
             \"1\",\":Person\",\"Bob\",,,,\n\
             ,,,\"0\",\"1\",\"KNOWS\",\"2020\"\n"
        )
        .unwrap();
        drop(file);

        let out = dir.path().join("graph.json");
        let summary = import_csv(
            csv_path.to_str().unwrap(),
            out.to_str().unwrap(),
            &ImportConfig::default(),
        )
        .unwrap();
        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.relationships, 1);

        let graph = Snapshot::load(&out).unwrap().into_graph().unwrap();
        assert_eq!(graph.node_len(), 2);
        assert_eq!(graph.relationship_len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("graph.json");
        let err = import_csv(
            "/nonexistent/graph.csv",
            out.to_str().unwrap(),
            &ImportConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("File not found"));
        assert!(!out.exists());
    }
}
