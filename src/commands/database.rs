use anyhow::{Context, Result};

use crate::cli::DatabaseAction;
use crate::config::Config;
use crate::graph::Snapshot;
use crate::neo4j::{DatabaseStats, Neo4jConnection};

pub async fn handle_database(db_action: DatabaseAction, config: &Config) -> Result<()> {
    match db_action {
        DatabaseAction::Snapshot { output_path } => snapshot_database(config, &output_path).await?,
        DatabaseAction::Stats { format } => show_database_stats(config, &format).await?,
    }

    Ok(())
}

async fn snapshot_database(config: &Config, output_path: &str) -> Result<()> {
    println!("Snapshotting database to {}", output_path);

    let connection = Neo4jConnection::new(config).await?;
    println!("Testing Neo4j connectivity...");
    connection.test_connection().await?;

    let graph = connection.snapshot().await?;
    let snapshot = Snapshot::from_store(&graph)?;
    snapshot
        .save(output_path)
        .with_context(|| format!("Failed to write snapshot '{output_path}'"))?;

    println!("Snapshot written:");
    println!("  Nodes: {}", snapshot.nodes.len());
    println!("  Relationships: {}", snapshot.relationships.len());
    println!("  Constraints: {}", snapshot.constraints.len());
    println!("  Indexes: {}", snapshot.indexes.len());
    Ok(())
}

async fn show_database_stats(config: &Config, format: &str) -> Result<()> {
    let connection = Neo4jConnection::new(config).await?;
    let stats = connection.get_database_stats().await?;
    print_database_stats(&stats, format)
}

fn print_database_stats(stats: &DatabaseStats, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!("\nDatabase Statistics:");
    println!("  Total nodes: {}", stats.node_count);
    println!("  Total relationships: {}", stats.relationship_count);

    println!("\nNodes by label:");
    for (label, count) in &stats.label_counts {
        println!("  {}: {}", label, count);
    }
    Ok(())
}
