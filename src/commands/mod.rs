pub mod database;
pub mod export;
pub mod import;
pub mod meta;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::graph::{MemoryGraph, Snapshot};
use crate::neo4j::Neo4jConnection;

/// The graph a command works on: the `--input` snapshot, or a snapshot
/// pulled from the configured database.
pub async fn load_graph(input: Option<&str>, config: &Config) -> Result<MemoryGraph> {
    match input {
        Some(path) => {
            let snapshot = Snapshot::load(path)
                .with_context(|| format!("Failed to read graph snapshot '{path}'"))?;
            let graph = snapshot
                .into_graph()
                .with_context(|| format!("Invalid graph snapshot '{path}'"))?;
            tracing::info!(
                path,
                nodes = graph.node_len(),
                relationships = graph.relationship_len(),
                "graph snapshot loaded"
            );
            Ok(graph)
        }
        None => {
            let connection = Neo4jConnection::new(config).await?;
            connection.snapshot().await
        }
    }
}
