//! Single-pass CSV export in the default combined layout or as bulk import
//! files per label combination and relationship type.

use ::csv::{QuoteStyle, Terminator, WriterBuilder};
use std::collections::BTreeMap;
use std::io::Write;

use super::batch::BatchState;
use super::progress::ProgressReporter;
use super::sink::ExportSink;
use super::subgraph::{first_values, SubGraph};
use super::{ExportConfig, Quotes};
use crate::error::{Error, Result};
use crate::graph::GraphStore;
use crate::models::{MetaType, Node, Properties, Relationship, Value};
use crate::utils::ident::csv_label_field;
use crate::utils::CancellationToken;

/// Header type suffix of a value, as read back by the importer.
pub fn type_name(value: &Value) -> String {
    match value {
        Value::List(_) => format!("{}[]", scalar_type_name(value.element_type())),
        other => scalar_type_name(other.meta_type()).to_string(),
    }
}

fn scalar_type_name(meta: MetaType) -> &'static str {
    match meta {
        MetaType::Integer => "long",
        MetaType::Float => "double",
        MetaType::Boolean => "boolean",
        MetaType::Map => "map",
        _ => "string",
    }
}

fn typed(name: &str, value: Option<&&Value>, use_types: bool) -> String {
    match value {
        Some(value) if use_types => format!("{name}:{}", type_name(value)),
        _ => name.to_string(),
    }
}

/// One CSV destination: logical name, header and the entities written to it.
struct Section<'a> {
    name: String,
    header: Vec<String>,
    rows: Vec<Row<'a>>,
}

enum Row<'a> {
    Node(&'a Node),
    Relationship(&'a Relationship),
}

pub struct CsvExporter<'a, S: GraphStore + ?Sized> {
    subgraph: &'a SubGraph<'a, S>,
    config: &'a ExportConfig,
    cancel: &'a CancellationToken,
}

impl<'a, S: GraphStore + ?Sized> CsvExporter<'a, S> {
    pub fn new(
        subgraph: &'a SubGraph<'a, S>,
        config: &'a ExportConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            subgraph,
            config,
            cancel,
        }
    }

    pub fn export(&self, sink: &mut dyn ExportSink, reporter: &mut ProgressReporter) -> Result<()> {
        let sections = if self.config.bulk_import {
            self.bulk_sections()
        } else {
            self.default_sections()
        };
        let node_keys: Vec<&str> = self.subgraph.node_properties().into_keys().collect();
        let rel_keys: Vec<&str> = self.subgraph.rel_properties().into_keys().collect();

        let mut batch = BatchState::new(self.config.batch_size);
        let (mut nodes, mut rels, mut props) = (0u64, 0u64, 0u64);
        for section in &sections {
            let header_target = if self.config.separate_header {
                format!("header.{}", section.name)
            } else {
                section.name.clone()
            };
            let header: Vec<Option<String>> = section.header.iter().cloned().map(Some).collect();
            self.write_record(sink, &header_target, &header)?;

            for row in &section.rows {
                self.cancel.check()?;
                if batch.advance() {
                    reporter.next_batch();
                    self.progress(sink, reporter, (nodes, rels, props))?;
                    (nodes, rels, props) = (0, 0, 0);
                }
                let record = match row {
                    Row::Node(node) => {
                        nodes += 1;
                        props += non_null(&node.properties);
                        if self.config.bulk_import {
                            self.bulk_node_record(node, &section.header)
                        } else {
                            self.node_record(node, &node_keys, &rel_keys)
                        }
                    }
                    Row::Relationship(rel) => {
                        rels += 1;
                        props += non_null(&rel.properties);
                        if self.config.bulk_import {
                            self.bulk_rel_record(rel, &section.header)
                        } else {
                            self.rel_record(rel, &node_keys, &rel_keys)
                        }
                    }
                };
                self.write_record(sink, &section.name, &record)?;
            }
        }
        if batch.finish() {
            reporter.next_batch();
        }
        sink.flush()?;
        self.progress(sink, reporter, (nodes, rels, props))?;
        tracing::debug!(
            sections = sections.len(),
            blocks = ?batch.closed_blocks(),
            "csv export written"
        );
        Ok(())
    }

    fn progress(
        &self,
        sink: &mut dyn ExportSink,
        reporter: &mut ProgressReporter,
        (nodes, rels, props): (u64, u64, u64),
    ) -> Result<()> {
        if let Some(data) = sink.take_streamed() {
            reporter.attach(data);
        }
        reporter.update(nodes, rels, props)
    }

    /// `all`, or `nodes` and `relationships` when files are separated.
    fn default_sections(&self) -> Vec<Section<'a>> {
        let use_types = self.config.use_types;
        let node_props = self.subgraph.node_properties();
        let rel_props = self.subgraph.rel_properties();
        let (id, labels, start, end, rel_type) = if use_types {
            ("_id:id", "_labels:label", "_start:id", "_end:id", "_type:label")
        } else {
            ("_id", "_labels", "_start", "_end", "_type")
        };

        let mut node_header = vec![id.to_string(), labels.to_string()];
        node_header.extend(node_props.iter().map(|(k, v)| typed(k, Some(v), use_types)));
        let mut rel_header = vec![start.to_string(), end.to_string(), rel_type.to_string()];
        rel_header.extend(rel_props.iter().map(|(k, v)| typed(k, Some(v), use_types)));

        let node_rows = self.subgraph.nodes().iter().copied().map(Row::Node);
        let rel_rows = self.subgraph.relationships().iter().copied().map(Row::Relationship);
        if self.config.separate_files {
            vec![
                Section {
                    name: "nodes".to_string(),
                    header: node_header,
                    rows: node_rows.collect(),
                },
                Section {
                    name: "relationships".to_string(),
                    header: rel_header,
                    rows: rel_rows.collect(),
                },
            ]
        } else {
            node_header.extend(rel_header);
            vec![Section {
                name: "all".to_string(),
                header: node_header,
                rows: node_rows.chain(rel_rows).collect(),
            }]
        }
    }

    /// `nodes.<A_B>` per label combination and `relationships.<T>` per type.
    fn bulk_sections(&self) -> Vec<Section<'a>> {
        let mut node_groups: BTreeMap<String, Vec<&'a Node>> = BTreeMap::new();
        for node in self.subgraph.nodes().iter().copied() {
            let key = node.sorted_labels().join("_");
            node_groups.entry(key).or_default().push(node);
        }
        let mut rel_groups: BTreeMap<&'a str, Vec<&'a Relationship>> = BTreeMap::new();
        for rel in self.subgraph.relationships().iter().copied() {
            rel_groups.entry(rel.rel_type.as_str()).or_default().push(rel);
        }

        let mut sections = Vec::with_capacity(node_groups.len() + rel_groups.len());
        for (labels, nodes) in node_groups {
            let values = first_values(nodes.iter().map(|n| &n.properties));
            let mut header = vec![":ID".to_string()];
            header.extend(values.iter().map(|(k, v)| typed(k, Some(v), true)));
            header.push(":LABEL".to_string());
            let name = if labels.is_empty() {
                "nodes".to_string()
            } else {
                format!("nodes.{labels}")
            };
            sections.push(Section {
                name,
                header,
                rows: nodes.into_iter().map(Row::Node).collect(),
            });
        }
        for (rel_type, rels) in rel_groups {
            let values = first_values(rels.iter().map(|r| &r.properties));
            let mut header = vec![
                ":START_ID".to_string(),
                ":END_ID".to_string(),
                ":TYPE".to_string(),
            ];
            header.extend(values.iter().map(|(k, v)| typed(k, Some(v), true)));
            sections.push(Section {
                name: format!("relationships.{rel_type}"),
                header,
                rows: rels.into_iter().map(Row::Relationship).collect(),
            });
        }
        sections
    }

    fn node_record(
        &self,
        node: &Node,
        node_keys: &[&str],
        rel_keys: &[&str],
    ) -> Vec<Option<String>> {
        let mut record = Vec::with_capacity(5 + node_keys.len() + rel_keys.len());
        record.push(Some(node.id.to_string()));
        record.push(Some(csv_label_field(&node.labels)));
        record.extend(node_keys.iter().map(|k| plain(node.properties.get(*k))));
        if !self.config.separate_files {
            record.extend(std::iter::repeat(None).take(3 + rel_keys.len()));
        }
        record
    }

    fn rel_record(
        &self,
        rel: &Relationship,
        node_keys: &[&str],
        rel_keys: &[&str],
    ) -> Vec<Option<String>> {
        let mut record = Vec::with_capacity(5 + node_keys.len() + rel_keys.len());
        if !self.config.separate_files {
            record.extend(std::iter::repeat(None).take(2 + node_keys.len()));
        }
        record.push(Some(rel.start.to_string()));
        record.push(Some(rel.end.to_string()));
        record.push(Some(rel.rel_type.clone()));
        record.extend(rel_keys.iter().map(|k| plain(rel.properties.get(*k))));
        record
    }

    fn bulk_node_record(&self, node: &Node, header: &[String]) -> Vec<Option<String>> {
        let mut record = vec![Some(node.id.to_string())];
        record.extend(
            property_columns(header, 1, 1)
                .map(|k| self.bulk_value(node.properties.get(k))),
        );
        record.push(Some(node.labels.join(&self.config.array_delim)));
        record
    }

    fn bulk_rel_record(&self, rel: &Relationship, header: &[String]) -> Vec<Option<String>> {
        let mut record = vec![
            Some(rel.start.to_string()),
            Some(rel.end.to_string()),
            Some(rel.rel_type.clone()),
        ];
        record.extend(
            property_columns(header, 3, 0)
                .map(|k| self.bulk_value(rel.properties.get(k))),
        );
        record
    }

    /// Bulk import files join list elements with the array delimiter.
    fn bulk_value(&self, value: Option<&Value>) -> Option<String> {
        match value {
            Some(Value::List(items)) => Some(
                items
                    .iter()
                    .map(Value::to_plain_string)
                    .collect::<Vec<_>>()
                    .join(&self.config.array_delim),
            ),
            other => plain(other),
        }
    }

    fn write_record(
        &self,
        sink: &mut dyn ExportSink,
        name: &str,
        record: &[Option<String>],
    ) -> Result<()> {
        let line = if self.config.differentiate_nulls {
            self.encode_differentiated(record)
        } else {
            self.encode(record)?
        };
        sink.writer(name)?.write_all(&line)?;
        Ok(())
    }

    fn encode(&self, record: &[Option<String>]) -> Result<Vec<u8>> {
        let style = match self.config.quotes {
            Quotes::Always => QuoteStyle::Always,
            Quotes::None => QuoteStyle::Never,
            Quotes::IfNeeded => QuoteStyle::Necessary,
        };
        let mut writer = WriterBuilder::new()
            .delimiter(self.config.delimiter())
            .quote_style(style)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(record.iter().map(|f| f.as_deref().unwrap_or("")))?;
        writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }

    /// Nulls stay bare and empty, empty strings are always quoted.
    fn encode_differentiated(&self, record: &[Option<String>]) -> Vec<u8> {
        let delim = self.config.delimiter() as char;
        let fields: Vec<String> = record
            .iter()
            .map(|field| match field {
                None => String::new(),
                Some(s) if s.is_empty() => "\"\"".to_string(),
                Some(s) => {
                    let needed = s.contains([delim, '"', '\n', '\r']);
                    match self.config.quotes {
                        Quotes::Always => quote(s),
                        Quotes::IfNeeded if needed => quote(s),
                        _ => s.clone(),
                    }
                }
            })
            .collect();
        let mut line = fields.join(&delim.to_string()).into_bytes();
        line.push(b'\n');
        line
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn plain(value: Option<&Value>) -> Option<String> {
    value.filter(|v| !v.is_null()).map(Value::to_plain_string)
}

fn non_null(properties: &Properties) -> u64 {
    properties.values().filter(|v| !v.is_null()).count() as u64
}

/// Property names of a bulk header, with the leading and trailing fixed
/// columns skipped and the type suffix removed.
fn property_columns(
    header: &[String],
    leading: usize,
    trailing: usize,
) -> impl Iterator<Item = &str> {
    header[leading..header.len() - trailing]
        .iter()
        .map(|column| column.rsplit_once(':').map_or(column.as_str(), |(name, _)| name))
}
