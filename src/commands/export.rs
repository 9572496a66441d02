use anyhow::{Context, Result};
use std::sync::Arc;

use super::load_graph;
use crate::cli::{ExportType, SelectionArgs};
use crate::config::Config;
use crate::export::{
    run_export, stream_export, ExportConfig, ExportFormat, ExportJob, FileSink, MemorySink,
    ProgressInfo, ProgressReporter, Selection,
};
use crate::utils::ident::parse_id_list;
use crate::utils::CancellationToken;

pub async fn handle_export(
    export_type: ExportType,
    input: Option<&str>,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut export_config = config.export_defaults();
    let (format, output, selection) = match export_type {
        ExportType::Csv {
            output,
            selection,
            bulk_import,
            separate_header,
            separate_files,
            quotes,
            differentiate_nulls,
            use_types,
            delim,
            array_delim,
            batch_size,
            stream,
        } => {
            export_config.bulk_import |= bulk_import;
            export_config.separate_header |= separate_header;
            export_config.separate_files |= separate_files;
            export_config.differentiate_nulls |= differentiate_nulls;
            export_config.use_types |= use_types;
            export_config.stream |= stream;
            if let Some(quotes) = quotes {
                export_config.quotes = quotes;
            }
            if let Some(delim) = delim {
                export_config.delim = delim;
            }
            if let Some(array_delim) = array_delim {
                export_config.array_delim = array_delim;
            }
            if let Some(batch_size) = batch_size {
                export_config.batch_size = batch_size;
            }
            (ExportFormat::Csv, output, selection)
        }
        ExportType::Cypher {
            output,
            selection,
            format,
            cypher_format,
            optimization,
            unwind_batch_size,
            batch_size,
            separate_files,
            if_not_exists,
            await_for_indexes,
            stream,
        } => {
            export_config.separate_files |= separate_files;
            export_config.if_not_exists |= if_not_exists;
            export_config.stream |= stream;
            if let Some(format) = format {
                export_config.format = format;
            }
            if let Some(cypher_format) = cypher_format {
                export_config.cypher_format = cypher_format;
            }
            if let Some(optimization) = optimization {
                export_config.use_optimizations.kind = optimization;
            }
            if let Some(size) = unwind_batch_size {
                export_config.use_optimizations.unwind_batch_size = size;
            }
            if let Some(batch_size) = batch_size {
                export_config.batch_size = batch_size;
            }
            if let Some(seconds) = await_for_indexes {
                export_config.await_for_indexes = seconds;
            }
            (ExportFormat::Cypher, output, selection)
        }
    };
    // fail on bad options before a database round trip
    export_config.validate()?;

    let job = ExportJob {
        format,
        selection: selection_of(&selection)?,
        config: export_config,
        file: output.clone(),
    };
    let graph = load_graph(input, config).await?;

    if job.config.stream {
        return stream_rows(graph, job, cancel.clone());
    }

    let mut reporter = ProgressReporter::new(job.file.clone(), job.format, job.config.batch_size);
    match output {
        Some(path) => {
            let mut sink = file_sink(&path, &job.config);
            let info = run_export(&graph, &job, &mut sink, &mut reporter, cancel)
                .with_context(|| format!("Export to '{path}' failed"))?;
            println!("Export completed: {}", info.source);
            println!("  Nodes: {}", info.nodes);
            println!("  Relationships: {}", info.relationships);
            println!("  Properties: {}", info.properties);
            println!("  Batches: {}", info.batches);
            println!("  Time: {} ms", info.time);
            for path in sink.paths() {
                println!("  Wrote {}", path.display());
            }
        }
        None => {
            let mut sink = MemorySink::new();
            let info = run_export(&graph, &job, &mut sink, &mut reporter, cancel)?;
            print!("{}", sink.drain_all());
            tracing::info!(
                nodes = info.nodes,
                relationships = info.relationships,
                "export completed"
            );
        }
    }
    Ok(())
}

fn selection_of(args: &SelectionArgs) -> Result<Selection> {
    if args.nodes.is_some() || args.rels.is_some() {
        let parse = |raw: &Option<String>| -> Result<Vec<u64>> {
            match raw {
                Some(raw) => parse_id_list(raw).map_err(|e| anyhow::anyhow!(e)),
                None => Ok(Vec::new()),
            }
        };
        return Ok(Selection::Ids {
            nodes: parse(&args.nodes)?,
            relationships: parse(&args.rels)?,
        });
    }
    if !args.labels.is_empty() || !args.rel_types.is_empty() {
        return Ok(Selection::Filtered {
            labels: args.labels.clone(),
            rel_types: args.rel_types.clone(),
        });
    }
    Ok(Selection::Database)
}

fn file_sink(path: &str, config: &ExportConfig) -> FileSink {
    if config.separate_files || config.bulk_import || config.separate_header {
        FileSink::separate(path)
    } else {
        FileSink::single(path)
    }
}

/// Prints every progress row as one JSON line.
fn stream_rows(
    graph: crate::graph::MemoryGraph,
    job: ExportJob,
    cancel: CancellationToken,
) -> Result<()> {
    let mut last: Option<ProgressInfo> = None;
    for row in stream_export(Arc::new(graph), job, cancel) {
        println!("{}", serde_json::to_string(&row)?);
        last = Some(row);
    }
    match last.and_then(|row| row.failed) {
        Some(failure) => Err(anyhow::anyhow!("Streamed export failed: {failure}")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_from_flags() {
        let ids = SelectionArgs {
            rels: Some("3, 4".into()),
            ..SelectionArgs::default()
        };
        assert_eq!(
            selection_of(&ids).unwrap(),
            Selection::Ids {
                nodes: vec![],
                relationships: vec![3, 4]
            }
        );
        let labels = SelectionArgs {
            labels: vec!["Person".into()],
            ..SelectionArgs::default()
        };
        assert!(matches!(selection_of(&labels).unwrap(), Selection::Filtered { .. }));
        assert_eq!(selection_of(&SelectionArgs::default()).unwrap(), Selection::Database);
        let bad = SelectionArgs {
            nodes: Some("1,x".into()),
            ..SelectionArgs::default()
        };
        assert!(selection_of(&bad).is_err());
    }

    #[test]
    fn test_separate_outputs_use_one_file_per_name() {
        let config = ExportConfig {
            bulk_import: true,
            ..ExportConfig::default()
        };
        let sink = file_sink("out/export.csv", &config);
        assert_eq!(
            sink.path_for("nodes.Person"),
            std::path::Path::new("out/export.nodes.Person.csv")
        );
        let single = file_sink("export.csv", &ExportConfig::default());
        assert_eq!(single.path_for("nodes"), std::path::Path::new("export.csv"));
    }
}
