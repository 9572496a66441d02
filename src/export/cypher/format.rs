use std::fmt::Write as _;

use super::uniqueness::{NodeKey, UNIQUE_ID_LABEL, UNIQUE_ID_NAME, UNIQUE_ID_PROP, UNIQUE_ID_REL};
use crate::export::CypherFormat;
use crate::models::{
    format_float, ConstraintDef, ConstraintKind, EntityKind, IndexDef, Node, Properties,
    Relationship, Value,
};
use crate::utils::ident::{label_string, quote_ident};

/// Cypher literal for a property value.
pub fn literal(value: &Value) -> String {
    let mut out = String::new();
    write_literal(&mut out, value);
    out
}

fn write_literal(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Integer(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::String(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(out, item);
            }
            out.push(']');
        }
        Value::Map(map) => write_map(out, map.iter()),
    }
}

fn write_map<'a>(out: &mut String, entries: impl Iterator<Item = (&'a String, &'a Value)>) {
    out.push('{');
    for (i, (key, value)) in entries.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&quote_ident(key));
        out.push(':');
        write_literal(out, value);
    }
    out.push('}');
}

/// `{key:value, ...}` of the non-null properties not listed in `skip`.
pub fn property_map(properties: &Properties, skip: &[String]) -> String {
    let mut out = String::new();
    write_map(
        &mut out,
        properties
            .iter()
            .filter(|(k, v)| !v.is_null() && !skip.contains(*k)),
    );
    out
}

fn has_properties(properties: &Properties, skip: &[String]) -> bool {
    properties
        .iter()
        .any(|(k, v)| !v.is_null() && !skip.contains(k))
}

/// `:Label{key:value}` used to look a node up again.
pub fn node_lookup(key: NodeKey<'_>, node: &Node) -> String {
    match key {
        NodeKey::Natural(natural) => {
            let mut out = format!(":{}{{", quote_ident(natural.label));
            for (i, property) in natural.properties.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&quote_ident(property));
                out.push(':');
                write_literal(&mut out, node.property(property).unwrap_or(&Value::Null));
            }
            out.push('}');
            out
        }
        NodeKey::Artificial(id) => format!(
            ":{}{{{}:{}}}",
            quote_ident(UNIQUE_ID_LABEL),
            quote_ident(UNIQUE_ID_PROP),
            id
        ),
    }
}

fn key_properties(key: NodeKey<'_>) -> Vec<String> {
    match key {
        NodeKey::Natural(natural) => natural.properties.to_vec(),
        NodeKey::Artificial(_) => Vec::new(),
    }
}

/// Labels of `node` not already spelled out in its lookup pattern.
fn extra_labels(key: NodeKey<'_>, node: &Node) -> Vec<String> {
    let matched = match key {
        NodeKey::Natural(natural) => Some(natural.label),
        NodeKey::Artificial(_) => None,
    };
    node.labels
        .iter()
        .filter(|l| Some(l.as_str()) != matched)
        .cloned()
        .collect()
}

pub fn node_statement(format: CypherFormat, key: NodeKey<'_>, node: &Node) -> String {
    if format == CypherFormat::Create {
        return create_node_statement(key, node);
    }
    let skip = key_properties(key);
    let mut out = format!("MERGE (n{})", node_lookup(key, node));
    let mut sets = Vec::new();
    if format != CypherFormat::UpdateStructure {
        if has_properties(&node.properties, &skip) {
            sets.push(format!("n += {}", property_map(&node.properties, &skip)));
        }
        let extra = extra_labels(key, node);
        if !extra.is_empty() {
            sets.push(format!("n{}", label_string(&extra)));
        }
    }
    if !sets.is_empty() {
        let clause = if format == CypherFormat::AddStructure {
            " ON CREATE SET "
        } else {
            " SET "
        };
        out.push_str(clause);
        out.push_str(&sets.join(", "));
    }
    out.push(';');
    out
}

fn create_node_statement(key: NodeKey<'_>, node: &Node) -> String {
    let mut labels = node.labels.clone();
    let mut properties = node.properties.clone();
    if let NodeKey::Artificial(id) = key {
        labels.push(UNIQUE_ID_LABEL.to_string());
        properties.insert(UNIQUE_ID_PROP.to_string(), Value::Integer(id.0 as i64));
    }
    format!(
        "CREATE ({} {});",
        label_string(&labels),
        property_map(&properties, &[])
    )
}

/// Statement recreating `rel` between two previously created endpoints.
pub fn relationship_statement(
    format: CypherFormat,
    start: String,
    end: String,
    rel: &Relationship,
    synthetic_id: bool,
) -> String {
    let rel_type = quote_ident(&rel.rel_type);
    let mut out = format!("MATCH (n1{start}), (n2{end}) ");
    let has_props = has_properties(&rel.properties, &[]);
    if format.merges_relationships() {
        if synthetic_id {
            let _ = write!(
                out,
                "MERGE (n1)-[r:{rel_type}{{{}:{}}}]->(n2)",
                quote_ident(UNIQUE_ID_REL),
                rel.id
            );
        } else {
            let _ = write!(out, "MERGE (n1)-[r:{rel_type}]->(n2)");
        }
        if has_props {
            let _ = write!(out, " SET r += {}", property_map(&rel.properties, &[]));
        }
    } else if has_props {
        let _ = write!(
            out,
            "CREATE (n1)-[r:{rel_type} {}]->(n2)",
            property_map(&rel.properties, &[])
        );
    } else {
        let _ = write!(out, "CREATE (n1)-[r:{rel_type}]->(n2)");
    }
    out.push(';');
    out
}

fn property_list(var: &str, properties: &[String]) -> String {
    properties
        .iter()
        .map(|p| format!("{var}.{}", quote_ident(p)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn name_clause(name: Option<&str>, if_not_exists: bool) -> String {
    let mut out = String::new();
    if let Some(name) = name {
        out.push(' ');
        out.push_str(&quote_ident(name));
    }
    if if_not_exists {
        out.push_str(" IF NOT EXISTS");
    }
    out
}

pub fn constraint_statement(constraint: &ConstraintDef, if_not_exists: bool) -> String {
    let name = name_clause(constraint.name.as_deref(), if_not_exists);
    let (pattern, var) = match constraint.entity {
        EntityKind::Node => (format!("(node:{})", quote_ident(&constraint.label_or_type)), "node"),
        EntityKind::Relationship => (
            format!("()-[rel:{}]-()", quote_ident(&constraint.label_or_type)),
            "rel",
        ),
    };
    let predicate = match constraint.kind {
        ConstraintKind::Unique => "IS UNIQUE",
        ConstraintKind::NodeKey => "IS NODE KEY",
        ConstraintKind::Existence => "IS NOT NULL",
    };
    format!(
        "CREATE CONSTRAINT{name} FOR {pattern} REQUIRE ({}) {predicate};",
        property_list(var, &constraint.properties)
    )
}

pub fn index_statement(index: &IndexDef, if_not_exists: bool) -> String {
    let name = name_clause(index.name.as_deref(), if_not_exists);
    let (pattern, var) = match index.entity {
        EntityKind::Node => (format!("(node:{})", quote_ident(&index.label_or_type)), "node"),
        EntityKind::Relationship => (
            format!("()-[rel:{}]-()", quote_ident(&index.label_or_type)),
            "rel",
        ),
    };
    format!(
        "CREATE INDEX{name} FOR {pattern} ON ({});",
        property_list(var, &index.properties)
    )
}

pub fn unique_id_constraint(if_not_exists: bool) -> String {
    let name = name_clause(Some(UNIQUE_ID_NAME), if_not_exists);
    format!(
        "CREATE CONSTRAINT{name} FOR (node:{}) REQUIRE (node.{}) IS UNIQUE;",
        quote_ident(UNIQUE_ID_LABEL),
        quote_ident(UNIQUE_ID_PROP)
    )
}

pub fn drop_unique_id_constraint() -> String {
    format!("DROP CONSTRAINT {UNIQUE_ID_NAME};")
}

/// Removes synthetic markers from at most `limit` nodes.
pub fn node_cleanup(limit: u64) -> String {
    let label = quote_ident(UNIQUE_ID_LABEL);
    let prop = quote_ident(UNIQUE_ID_PROP);
    format!("MATCH (n:{label}) WITH n LIMIT {limit} REMOVE n:{label}, n.{prop};")
}

pub fn relationship_cleanup(limit: u64) -> String {
    let prop = quote_ident(UNIQUE_ID_REL);
    format!("MATCH ()-[r]->() WHERE r.{prop} IS NOT NULL WITH r LIMIT {limit} REMOVE r.{prop};")
}
