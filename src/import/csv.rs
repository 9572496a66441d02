use ::csv::{ReaderBuilder, StringRecord};
use std::io::Read;

use super::{ImportConfig, ImportSummary};
use crate::error::{Error, Result};
use crate::graph::MemoryGraph;
use crate::models::{Node, NodeId, Properties, Value};
use crate::utils::ident::parse_label_field;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Long,
    Double,
    Boolean,
    String,
    Map,
}

impl Scalar {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "long" | "int" | "short" | "byte" => Some(Scalar::Long),
            "double" | "float" => Some(Scalar::Double),
            "boolean" => Some(Scalar::Boolean),
            "string" | "char" => Some(Scalar::String),
            "map" => Some(Scalar::Map),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Scalar(Scalar),
    Array(Scalar),
}

#[derive(Debug, Clone)]
struct Column {
    index: usize,
    name: String,
    kind: Option<ColumnType>,
}

/// Positions of the fixed columns and the property columns of each side.
#[derive(Debug, Default)]
struct Layout {
    id: Option<usize>,
    labels: Option<usize>,
    start: Option<usize>,
    end: Option<usize>,
    rel_type: Option<usize>,
    node_props: Vec<Column>,
    rel_props: Vec<Column>,
}

/// Splits `name:type` when the suffix is a known type. Other colons are part
/// of the name.
fn split_typed(raw: &str) -> (&str, Option<&str>) {
    match raw.rsplit_once(':') {
        Some((name, suffix)) if !name.is_empty() && is_type_suffix(suffix) => (name, Some(suffix)),
        _ => (raw, None),
    }
}

fn is_type_suffix(suffix: &str) -> bool {
    let base = suffix.strip_suffix("[]").unwrap_or(suffix);
    matches!(base, "id" | "label") || Scalar::parse(base).is_some()
}

fn column_type(suffix: &str) -> Option<ColumnType> {
    match suffix.strip_suffix("[]") {
        Some(base) => Scalar::parse(base).map(ColumnType::Array),
        None => Scalar::parse(suffix).map(ColumnType::Scalar),
    }
}

impl Layout {
    fn parse(headers: &StringRecord) -> Result<Self> {
        let mut layout = Layout::default();
        for (index, raw) in headers.iter().enumerate() {
            let (name, suffix) = split_typed(raw);
            match name {
                "_id" => layout.id = Some(index),
                "_labels" => layout.labels = Some(index),
                "_start" => layout.start = Some(index),
                "_end" => layout.end = Some(index),
                "_type" => layout.rel_type = Some(index),
                _ => {
                    let column = Column {
                        index,
                        name: name.to_string(),
                        kind: suffix.and_then(column_type),
                    };
                    if layout.start.is_some() || layout.rel_type.is_some() {
                        layout.rel_props.push(column);
                    } else {
                        layout.node_props.push(column);
                    }
                }
            }
        }
        if layout.id.is_none() && layout.start.is_none() {
            return Err(Error::malformed("CSV header has neither an _id nor a _start column"));
        }
        if layout.start.is_some() && (layout.end.is_none() || layout.rel_type.is_none()) {
            return Err(Error::malformed("CSV header has _start without _end and _type"));
        }
        Ok(layout)
    }
}

struct PendingRel {
    line: u64,
    start: NodeId,
    end: NodeId,
    rel_type: String,
    properties: Properties,
}

fn field<'r>(record: &'r StringRecord, index: Option<usize>) -> &'r str {
    index.and_then(|i| record.get(i)).unwrap_or("")
}

fn parse_id(raw: &str, line: u64) -> Result<NodeId> {
    raw.trim()
        .parse::<u64>()
        .map(NodeId)
        .map_err(|e| Error::malformed(format!("line {line}: invalid id '{raw}': {e}")))
}

fn parse_scalar(raw: &str, scalar: Scalar) -> std::result::Result<Value, String> {
    match scalar {
        Scalar::Long => raw.trim().parse::<i64>().map(Value::Integer).map_err(|e| e.to_string()),
        Scalar::Double => raw.trim().parse::<f64>().map(Value::Float).map_err(|e| e.to_string()),
        Scalar::Boolean => match raw.trim() {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            other => Err(format!("'{other}' is not a boolean")),
        },
        Scalar::String => Ok(Value::String(raw.to_string())),
        Scalar::Map => serde_json::from_str(raw).map_err(|e| e.to_string()),
    }
}

fn parse_value(
    raw: &str,
    kind: Option<ColumnType>,
    array_delim: &str,
) -> std::result::Result<Value, String> {
    match kind {
        Some(ColumnType::Scalar(scalar)) => parse_scalar(raw, scalar),
        // JSON lists from the default layout, delimited ones from bulk files
        Some(ColumnType::Array(scalar)) => match serde_json::from_str::<Value>(raw) {
            Ok(list @ Value::List(_)) => Ok(list),
            _ => raw
                .split(array_delim)
                .map(|item| parse_scalar(item, scalar))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::List),
        },
        None => {
            let looks_json = raw.starts_with('[') || raw.starts_with('{');
            match serde_json::from_str::<Value>(raw) {
                Ok(value) if looks_json => Ok(value),
                _ => Ok(Value::String(raw.to_string())),
            }
        }
    }
}

/// Flags the fields of the record starting at `raw` that were written as a
/// quoted empty string. The csv reader returns `""` and a bare empty field
/// alike, only the raw bytes tell them apart.
fn quoted_empty_fields(raw: &[u8], delim: u8, fields: usize) -> Vec<bool> {
    let mut marks = Vec::with_capacity(fields);
    let mut i = 0;
    while marks.len() < fields {
        let start = i;
        if raw.get(i) == Some(&b'"') {
            i += 1;
            loop {
                match raw.get(i) {
                    None => break,
                    Some(b'"') if raw.get(i + 1) == Some(&b'"') => i += 2,
                    Some(b'"') => {
                        i += 1;
                        break;
                    }
                    Some(_) => i += 1,
                }
            }
        }
        while let Some(&b) = raw.get(i) {
            if b == delim || b == b'\n' || b == b'\r' {
                break;
            }
            i += 1;
        }
        marks.push(&raw[start..i] == b"\"\"");
        if raw.get(i) != Some(&delim) {
            break;
        }
        i += 1;
    }
    marks.resize(fields, false);
    marks
}

fn properties(
    record: &StringRecord,
    quoted_empty: &[bool],
    columns: &[Column],
    config: &ImportConfig,
    line: u64,
) -> Result<Properties> {
    let mut properties = Properties::new();
    for column in columns {
        let raw = field(record, Some(column.index));
        let empty_string = quoted_empty.get(column.index).copied().unwrap_or(false);
        if raw.is_empty() && !empty_string {
            continue;
        }
        let value = parse_value(raw, column.kind, &config.array_delim).map_err(|e| {
            Error::malformed(format!("line {line}: column '{}': {e}", column.name))
        })?;
        properties.insert(column.name.clone(), value);
    }
    Ok(properties)
}

/// Reads CSV in the default export layout (typed or untyped header). Node
/// ids are kept, relationships are created after every node row is loaded.
pub fn load<R: Read>(mut reader: R, config: &ImportConfig) -> Result<(MemoryGraph, ImportSummary)> {
    let delimiter = u8::try_from(config.delim).map_err(|_| {
        Error::malformed(format!("delimiter '{}' is not a single byte", config.delim))
    })?;
    // kept whole so quoted empty fields can be told from nulls
    let mut text = Vec::new();
    reader.read_to_end(&mut text)?;
    let mut csv = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_slice());
    let layout = Layout::parse(csv.headers()?)?;

    let mut graph = MemoryGraph::new();
    let mut summary = ImportSummary::default();
    let mut pending = Vec::new();
    for (row, record) in csv.records().enumerate() {
        let record = record?;
        let line = row as u64 + 2;
        let quoted_empty = match record.position() {
            Some(position) if config.differentiate_nulls => {
                let start = usize::try_from(position.byte()).unwrap_or(text.len()).min(text.len());
                quoted_empty_fields(&text[start..], delimiter, record.len())
            }
            _ => Vec::new(),
        };
        let id = field(&record, layout.id);
        let start = field(&record, layout.start);
        if !id.is_empty() {
            let labels = parse_label_field(field(&record, layout.labels))
                .map_err(|e| Error::malformed(format!("line {line}: {e}")))?;
            let props = properties(&record, &quoted_empty, &layout.node_props, config, line)?;
            let prop_count = props.len() as u64;
            match graph.insert_node(Node::new(parse_id(id, line)?, labels, props)) {
                Ok(_) => {
                    summary.nodes += 1;
                    summary.properties += prop_count;
                }
                Err(Error::DuplicateIdentity { id, .. }) if config.ignore_duplicate_nodes => {
                    tracing::debug!(id = %id, line, "skipping duplicate node row");
                    summary.skipped_duplicates += 1;
                }
                Err(e) => return Err(e),
            }
        } else if !start.is_empty() {
            let rel_type = field(&record, layout.rel_type);
            if rel_type.is_empty() {
                return Err(Error::malformed(format!("line {line}: relationship without _type")));
            }
            pending.push(PendingRel {
                line,
                start: parse_id(start, line)?,
                end: parse_id(field(&record, layout.end), line)?,
                rel_type: rel_type.to_string(),
                properties: properties(&record, &quoted_empty, &layout.rel_props, config, line)?,
            });
        } else {
            return Err(Error::malformed(format!(
                "line {line}: row has neither _id nor _start"
            )));
        }
    }

    for rel in pending {
        let prop_count = rel.properties.len() as u64;
        graph
            .create_relationship(rel.start, rel.end, &rel.rel_type, rel.properties)
            .map_err(|e| Error::malformed(format!("line {}: {e}", rel.line)))?;
        summary.relationships += 1;
        summary.properties += prop_count;
    }
    tracing::info!(
        nodes = summary.nodes,
        relationships = summary.relationships,
        skipped = summary.skipped_duplicates,
        "csv import finished"
    );
    Ok((graph, summary))
}
