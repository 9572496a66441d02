use anyhow::Result;

use super::load_graph;
use crate::cli::MetaAction;
use crate::config::Config;
use crate::meta::{
    GraphStats, MetaGraph, MetaGraphBuilder, MetaGraphConfig, MetaItemCollector, MetaRow,
    SampleSelector, ScanPolicy, StatsAggregator,
};
use crate::utils::CancellationToken;

pub async fn handle_meta(
    meta_action: MetaAction,
    input: Option<&str>,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    // options are checked before any store round trip
    match meta_action {
        MetaAction::Stats {
            labels,
            rel_types,
            format,
        } => {
            let graph = load_graph(input, config).await?;
            let stats = StatsAggregator::new(&graph, cancel)
                .aggregate(labels.as_deref(), rel_types.as_deref())?;
            print_stats(&stats, &format)?
        }
        MetaAction::Data { sampling, format } => {
            let meta_config = sampling.apply(config.meta.clone());
            meta_config.validate()?;
            let mut selector = selector(sampling.seed);
            let graph = load_graph(input, config).await?;
            let data = MetaItemCollector::new(&graph, &meta_config, cancel).collect(&mut selector)?;
            print_rows(&data.rows(), &format)?
        }
        MetaAction::Schema { sampling } => {
            let meta_config = sampling.apply(config.meta.clone());
            meta_config.validate()?;
            let mut selector = selector(sampling.seed);
            let graph = load_graph(input, config).await?;
            let data = MetaItemCollector::new(&graph, &meta_config, cancel).collect(&mut selector)?;
            let stats = StatsAggregator::new(&graph, cancel).aggregate(None, None)?;
            let schema = data.schema(&stats.labels, &stats.rel_type_stats());
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        MetaAction::Graph {
            labels,
            rel_types,
            prune,
            sample,
            max_rels,
            scan_from_side,
            format,
        } => {
            let graph_config = MetaGraphConfig {
                labels,
                rel_types,
                prune,
                sample: sample.unwrap_or(config.meta.sample),
                max_rels: max_rels.unwrap_or(config.meta.max_rels),
                policy: if scan_from_side {
                    ScanPolicy::FromSide
                } else {
                    ScanPolicy::LowerDegreeRatio
                },
            };
            graph_config.validate()?;
            let graph = load_graph(input, config).await?;
            let meta_graph = MetaGraphBuilder::new(&graph, cancel).build(&graph_config)?;
            print_meta_graph(&meta_graph, &format)?
        }
    }

    Ok(())
}

fn selector(seed: Option<u64>) -> SampleSelector {
    match seed {
        Some(seed) => SampleSelector::seeded(seed),
        None => SampleSelector::new(),
    }
}

fn print_stats(stats: &GraphStats, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }
    println!(
        "Labels: {}  Relationship types: {}  Property keys: {}",
        stats.label_count, stats.rel_type_count, stats.property_key_count
    );
    println!("Nodes: {}  Relationships: {}", stats.node_count, stats.rel_count);
    println!("\n{:<40} {:>12}", "Label", "Count");
    for (label, count) in &stats.labels {
        println!("{:<40} {:>12}", label, count);
    }
    println!("\n{:<40} {:>12}", "Pattern", "Count");
    for (pattern, count) in &stats.rel_types {
        println!("{:<40} {:>12}", pattern, count);
    }
    Ok(())
}

fn print_rows(rows: &[MetaRow], format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }
    println!(
        "{:<20} {:<20} {:<14} {:>7} {:<6} {:<6} {:<6} {}",
        "Label", "Property", "Type", "Count", "Unique", "Index", "Exists", "Other"
    );
    for row in rows {
        println!(
            "{:<20} {:<20} {:<14} {:>7} {:<6} {:<6} {:<6} {}",
            row.label,
            row.property,
            row.type_name,
            row.count,
            row.unique,
            row.index,
            row.existence,
            row.other.join(",")
        );
    }
    Ok(())
}

fn print_meta_graph(meta_graph: &MetaGraph, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(meta_graph)?);
        return Ok(());
    }
    println!("{:<30} {:>12}", "Label", "Count");
    for node in &meta_graph.nodes {
        println!("{:<30} {:>12}", node.label, node.count);
    }
    println!(
        "\n{:<50} {:>10} {:>10} {:>10}",
        "Pattern", "Out", "In", "Count"
    );
    for edge in &meta_graph.edges {
        let pattern = format!(
            "(:{})-[:{}]->(:{})",
            edge.start_label, edge.rel_type, edge.end_label
        );
        println!(
            "{:<50} {:>10} {:>10} {:>10}",
            pattern, edge.out, edge.incoming, edge.count
        );
    }
    Ok(())
}
