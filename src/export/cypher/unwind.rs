use rayon::prelude::*;
use std::collections::HashMap;

use super::format::property_map;
use super::uniqueness::{NodeKey, UniquenessTracker, UNIQUE_ID_LABEL, UNIQUE_ID_PROP, UNIQUE_ID_REL};
use crate::error::{Error, Result};
use crate::export::{CypherFormat, OptimizationType};
use crate::graph::GraphStore;
use crate::models::{Node, NodeId, Properties, Relationship};
use crate::export::subgraph::SubGraph;
use crate::utils::ident::{label_string, quote_ident};

/// Identity part of a statement shared by every row of a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyShape {
    Natural { label: String, properties: Vec<String> },
    Artificial,
}

impl KeyShape {
    fn of(key: NodeKey<'_>) -> Self {
        match key {
            NodeKey::Natural(natural) => KeyShape::Natural {
                label: natural.label.to_string(),
                properties: natural.properties.to_vec(),
            },
            NodeKey::Artificial(_) => KeyShape::Artificial,
        }
    }

    /// `:Label{prop: row.<field>.prop}` pattern reading the key from a row.
    fn pattern(&self, field: &str) -> String {
        match self {
            KeyShape::Natural { label, properties } => {
                let assignments: Vec<String> = properties
                    .iter()
                    .map(|p| format!("{0}: row.{field}.{0}", quote_ident(p)))
                    .collect();
                format!(":{}{{{}}}", quote_ident(label), assignments.join(", "))
            }
            KeyShape::Artificial => format!(
                ":{}{{{}: row.{field}._id}}",
                quote_ident(UNIQUE_ID_LABEL),
                quote_ident(UNIQUE_ID_PROP)
            ),
        }
    }
}

/// `{prop:value}` of the key values, or `{_id:n}` for a synthetic key.
fn key_literal(key: NodeKey<'_>, node: &Node) -> String {
    match key {
        NodeKey::Natural(natural) => {
            let mut values = Properties::new();
            for p in natural.properties {
                if let Some(value) = node.property(p) {
                    values.insert(p.clone(), value.clone());
                }
            }
            property_map(&values, &[])
        }
        NodeKey::Artificial(id) => format!("{{_id:{id}}}"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NodeGroup {
    labels: Vec<String>,
    key: KeyShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RelGroup {
    rel_type: String,
    start: KeyShape,
    end: KeyShape,
    synthetic_id: bool,
}

/// One UNWIND statement of the optimized script.
#[derive(Debug, Clone, PartialEq)]
pub struct UnwindStatement {
    /// `:param` line preceding the statement in parameter mode
    pub param: Option<String>,
    pub statement: String,
    pub rows: usize,
    pub properties: u64,
}

fn groups_in_order<K: Eq + std::hash::Hash + Clone, T>(
    items: impl IntoIterator<Item = (K, T)>,
) -> Vec<(K, Vec<T>)> {
    let mut position: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for (key, item) in items {
        match position.get(&key) {
            Some(&i) => groups[i].1.push(item),
            None => {
                position.insert(key.clone(), groups.len());
                groups.push((key, vec![item]));
            }
        }
    }
    groups
}

fn non_null(properties: &Properties) -> u64 {
    properties.values().filter(|v| !v.is_null()).count() as u64
}

fn rows_clause(mode: OptimizationType, rows: &[String]) -> (Option<String>, String) {
    let list = format!("[{}]", rows.join(", "));
    match mode {
        OptimizationType::UnwindBatchParams => (
            Some(format!(":param batch => {list}")),
            "UNWIND $batch AS row".to_string(),
        ),
        _ => (None, format!("UNWIND {list} AS row")),
    }
}

pub struct UnwindPlanner<'a> {
    pub format: CypherFormat,
    pub mode: OptimizationType,
    pub rows_per_statement: usize,
    pub tracker: &'a UniquenessTracker,
}

impl<'a> UnwindPlanner<'a> {
    /// Node statements grouped by label set and key shape, rendered on the
    /// rayon pool and returned in input order.
    pub fn node_statements<S: GraphStore + ?Sized>(
        &self,
        subgraph: &SubGraph<'_, S>,
    ) -> Vec<UnwindStatement> {
        let grouped = groups_in_order(subgraph.nodes().iter().map(|node| {
            let key = self.tracker.key_for(node);
            let mut labels = node.labels.clone();
            labels.sort();
            (
                NodeGroup {
                    labels,
                    key: KeyShape::of(key),
                },
                *node,
            )
        }));
        let chunks: Vec<(&NodeGroup, &[&Node])> = grouped
            .iter()
            .flat_map(|(group, nodes)| {
                nodes
                    .chunks(self.rows_per_statement.max(1))
                    .map(move |chunk| (group, chunk))
            })
            .collect();
        chunks
            .par_iter()
            .map(|(group, nodes)| self.node_chunk(group, nodes))
            .collect()
    }

    fn node_chunk(&self, group: &NodeGroup, nodes: &[&Node]) -> UnwindStatement {
        let skip = match &group.key {
            KeyShape::Natural { properties, .. } => properties.clone(),
            KeyShape::Artificial => Vec::new(),
        };
        let rows: Vec<String> = nodes
            .iter()
            .map(|node| {
                format!(
                    "{{key:{}, properties:{}}}",
                    key_literal(self.tracker.key_for(node), node),
                    property_map(&node.properties, &skip)
                )
            })
            .collect();
        let (param, unwind) = rows_clause(self.mode, &rows);

        let extra: Vec<&String> = group
            .labels
            .iter()
            .filter(|l| !matches!(&group.key, KeyShape::Natural { label, .. } if label == *l))
            .collect();
        let pattern = group.key.pattern("key");
        let body = match self.format {
            CypherFormat::Create => {
                let mut s = format!("CREATE (n{pattern}) SET n += row.properties");
                if !extra.is_empty() {
                    s.push_str(&format!(" SET n{}", label_string(&extra)));
                }
                s
            }
            CypherFormat::UpdateAll | CypherFormat::AddStructure => {
                let set = if self.format == CypherFormat::AddStructure {
                    "ON CREATE SET"
                } else {
                    "SET"
                };
                let mut s = format!("MERGE (n{pattern}) {set} n += row.properties");
                if !extra.is_empty() {
                    s.push_str(&format!(", n{}", label_string(&extra)));
                }
                s
            }
            CypherFormat::UpdateStructure => format!("MERGE (n{pattern})"),
        };
        UnwindStatement {
            param,
            statement: format!("{unwind}\n{body};"),
            rows: nodes.len(),
            properties: nodes.iter().map(|n| non_null(&n.properties)).sum(),
        }
    }

    /// Relationship statements grouped by type, endpoint key shapes and
    /// synthetic id use. Endpoints missing from the store are an error.
    pub fn relationship_statements<S: GraphStore + ?Sized>(
        &self,
        subgraph: &SubGraph<'_, S>,
    ) -> Result<Vec<UnwindStatement>> {
        let mut keyed = Vec::with_capacity(subgraph.relationships().len());
        for rel in subgraph.relationships() {
            let start = endpoint(subgraph, rel, rel.start)?;
            let end = endpoint(subgraph, rel, rel.end)?;
            let group = RelGroup {
                rel_type: rel.rel_type.clone(),
                start: KeyShape::of(self.tracker.key_for(start)),
                end: KeyShape::of(self.tracker.key_for(end)),
                synthetic_id: self.tracker.has_synthetic_rel_id(rel),
            };
            keyed.push((group, (*rel, start, end)));
        }
        let grouped = groups_in_order(keyed);
        let chunks: Vec<(&RelGroup, &[(&Relationship, &Node, &Node)])> = grouped
            .iter()
            .flat_map(|(group, rels)| {
                rels.chunks(self.rows_per_statement.max(1))
                    .map(move |chunk| (group, chunk))
            })
            .collect();
        Ok(chunks
            .par_iter()
            .map(|(group, rels)| self.rel_chunk(group, rels))
            .collect())
    }

    fn rel_chunk(
        &self,
        group: &RelGroup,
        rels: &[(&Relationship, &Node, &Node)],
    ) -> UnwindStatement {
        let rows: Vec<String> = rels
            .iter()
            .map(|(rel, start, end)| {
                let id = if group.synthetic_id {
                    format!("_id:{}, ", rel.id)
                } else {
                    String::new()
                };
                format!(
                    "{{start:{}, end:{}, {id}properties:{}}}",
                    key_literal(self.tracker.key_for(start), start),
                    key_literal(self.tracker.key_for(end), end),
                    property_map(&rel.properties, &[])
                )
            })
            .collect();
        let (param, unwind) = rows_clause(self.mode, &rows);
        let rel_type = quote_ident(&group.rel_type);
        let verb = if self.format.merges_relationships() {
            "MERGE"
        } else {
            "CREATE"
        };
        let rel_pattern = if group.synthetic_id {
            format!("[r:{rel_type}{{{}: row._id}}]", quote_ident(UNIQUE_ID_REL))
        } else {
            format!("[r:{rel_type}]")
        };
        let statement = format!(
            "{unwind}\nMATCH (start{})\nMATCH (end{})\n{verb} (start)-{rel_pattern}->(end) SET r += row.properties;",
            group.start.pattern("start"),
            group.end.pattern("end"),
        );
        UnwindStatement {
            param,
            statement,
            rows: rels.len(),
            properties: rels.iter().map(|(r, _, _)| non_null(&r.properties)).sum(),
        }
    }
}

pub(super) fn endpoint<'s, S: GraphStore + ?Sized>(
    subgraph: &SubGraph<'s, S>,
    rel: &Relationship,
    id: NodeId,
) -> Result<&'s Node> {
    subgraph.node(id)?.ok_or_else(|| {
        Error::unavailable(format!(
            "relationship {} references missing node {}",
            rel.id, id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::cypher::uniqueness::UniqueConstraintIndex;
    use crate::graph::fixtures;

    fn tracker_for(graph: &crate::graph::MemoryGraph) -> UniquenessTracker {
        let sub = SubGraph::database(graph).unwrap();
        let mut tracker =
            UniquenessTracker::new(UniqueConstraintIndex::build(&sub.constraints().unwrap()));
        for node in sub.nodes() {
            if !tracker.is_naturally_unique(node) {
                tracker.assign_synthetic_id(node);
            }
        }
        tracker
    }

    #[test]
    fn test_rows_are_chunked_in_input_order() {
        let graph = fixtures::chain(45);
        let tracker = tracker_for(&graph);
        let planner = UnwindPlanner {
            format: CypherFormat::Create,
            mode: OptimizationType::UnwindBatch,
            rows_per_statement: 20,
            tracker: &tracker,
        };
        let sub = SubGraph::database(&graph).unwrap();
        let statements = planner.node_statements(&sub);
        assert_eq!(statements.iter().map(|s| s.rows).collect::<Vec<_>>(), vec![20, 20, 5]);
        assert!(statements[0].statement.starts_with("UNWIND [{key:{_id:0}, properties:{pos:0}}"));
        assert!(statements[2].statement.contains("{key:{_id:44}, properties:{pos:44}}"));
        assert!(statements[0].statement.ends_with(
            "CREATE (n:`UNIQUE IMPORT LABEL`{`UNIQUE IMPORT ID`: row.key._id}) \
             SET n += row.properties SET n:Item;"
        ));
    }

    #[test]
    fn test_param_mode_moves_rows_into_a_parameter() {
        let graph = fixtures::social();
        let tracker = tracker_for(&graph);
        let planner = UnwindPlanner {
            format: CypherFormat::UpdateAll,
            mode: OptimizationType::UnwindBatchParams,
            rows_per_statement: 20,
            tracker: &tracker,
        };
        let sub = SubGraph::database(&graph).unwrap();
        let statements = planner.node_statements(&sub);
        let people = statements
            .iter()
            .find(|s| s.statement.contains("MERGE (n:Person{name: row.key.name})"))
            .unwrap();
        assert!(people.statement.starts_with("UNWIND $batch AS row\n"));
        assert!(people
            .param
            .as_deref()
            .unwrap()
            .starts_with(":param batch => [{key:{name:\"Alice\"}"));

        let rels = planner.relationship_statements(&sub).unwrap();
        assert_eq!(rels.iter().map(|s| s.rows).sum::<usize>(), 7);
        let end_match = "MATCH (end:`UNIQUE IMPORT LABEL`{`UNIQUE IMPORT ID`: row.end._id})";
        assert!(rels.iter().any(|s| s.statement.contains(end_match)));
    }
}
