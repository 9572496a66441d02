use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::graph::GraphStore;
use crate::models::{ConstraintDef, EntityKind, IndexDef, Node, NodeId, RelId, Relationship, Value};

/// Which part of the store an export covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Database,
    /// Explicit entities, for example the result of a query run by the caller
    Ids { nodes: Vec<u64>, relationships: Vec<u64> },
    /// Nodes carrying any of `labels` (all when empty) and relationships of
    /// `rel_types` (all when empty) between them
    Filtered {
        labels: Vec<String>,
        rel_types: Vec<String>,
    },
}

/// Point-in-time set of nodes and relationships to export. Every
/// relationship's endpoints are part of the node set.
pub struct SubGraph<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    nodes: Vec<&'a Node>,
    relationships: Vec<&'a Relationship>,
    kind: &'static str,
}

impl<'a, S: GraphStore + ?Sized> SubGraph<'a, S> {
    pub fn select(store: &'a S, selection: &Selection) -> Result<Self> {
        match selection {
            Selection::Database => Self::database(store),
            Selection::Ids {
                nodes,
                relationships,
            } => Self::from_ids(
                store,
                nodes.iter().map(|id| NodeId(*id)),
                relationships.iter().map(|id| RelId(*id)),
            ),
            Selection::Filtered { labels, rel_types } => Self::filtered(store, labels, rel_types),
        }
    }

    pub fn database(store: &'a S) -> Result<Self> {
        Ok(Self {
            store,
            nodes: store.all_nodes()?.collect(),
            relationships: store.all_relationships()?.collect(),
            kind: "database",
        })
    }

    /// Selected entities plus the endpoints of the selected relationships.
    /// Unknown ids are rejected.
    pub fn from_ids(
        store: &'a S,
        node_ids: impl IntoIterator<Item = NodeId>,
        rel_ids: impl IntoIterator<Item = RelId>,
    ) -> Result<Self> {
        let mut nodes: BTreeMap<NodeId, &'a Node> = BTreeMap::new();
        let mut relationships: BTreeMap<RelId, &'a Relationship> = BTreeMap::new();
        for id in node_ids {
            let node = store
                .node(id)?
                .ok_or_else(|| Error::malformed(format!("unknown node id {id}")))?;
            nodes.insert(id, node);
        }
        for id in rel_ids {
            let rel = store
                .relationship(id)?
                .ok_or_else(|| Error::malformed(format!("unknown relationship id {id}")))?;
            for endpoint in [rel.start, rel.end] {
                if let Some(node) = store.node(endpoint)? {
                    nodes.insert(endpoint, node);
                }
            }
            relationships.insert(id, rel);
        }
        Ok(Self {
            store,
            nodes: nodes.into_values().collect(),
            relationships: relationships.into_values().collect(),
            kind: "data",
        })
    }

    pub fn filtered(store: &'a S, labels: &[String], rel_types: &[String]) -> Result<Self> {
        let nodes: Vec<&'a Node> = store
            .all_nodes()?
            .filter(|n| labels.is_empty() || labels.iter().any(|l| n.has_label(l)))
            .collect();
        let ids: BTreeSet<NodeId> = nodes.iter().map(|n| n.id).collect();
        let relationships = store
            .all_relationships()?
            .filter(|r| rel_types.is_empty() || rel_types.contains(&r.rel_type))
            .filter(|r| ids.contains(&r.start) && ids.contains(&r.end))
            .collect();
        Ok(Self {
            store,
            nodes,
            relationships,
            kind: "graph",
        })
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    pub fn nodes(&self) -> &[&'a Node] {
        &self.nodes
    }

    pub fn relationships(&self) -> &[&'a Relationship] {
        &self.relationships
    }

    pub fn node(&self, id: NodeId) -> Result<Option<&'a Node>> {
        self.store.node(id)
    }

    pub fn labels(&self) -> BTreeSet<&'a str> {
        self.nodes
            .iter()
            .flat_map(|n| n.labels.iter().map(String::as_str))
            .collect()
    }

    pub fn rel_types(&self) -> BTreeSet<&'a str> {
        self.relationships.iter().map(|r| r.rel_type.as_str()).collect()
    }

    /// Constraints on the labels and types present in this subgraph.
    pub fn constraints(&self) -> Result<Vec<ConstraintDef>> {
        let mut constraints = Vec::new();
        for label in self.labels() {
            constraints.extend(self.store.constraints(EntityKind::Node, Some(label))?);
        }
        for rel_type in self.rel_types() {
            constraints.extend(self.store.constraints(EntityKind::Relationship, Some(rel_type))?);
        }
        Ok(constraints)
    }

    pub fn indexes(&self) -> Result<Vec<IndexDef>> {
        let mut indexes = Vec::new();
        for label in self.labels() {
            indexes.extend(self.store.indexes(EntityKind::Node, Some(label))?);
        }
        for rel_type in self.rel_types() {
            indexes.extend(self.store.indexes(EntityKind::Relationship, Some(rel_type))?);
        }
        Ok(indexes)
    }

    /// Node property keys with the first non-null value seen for each.
    pub fn node_properties(&self) -> BTreeMap<&'a str, &'a Value> {
        first_values(self.nodes.iter().map(|n| &n.properties))
    }

    pub fn rel_properties(&self) -> BTreeMap<&'a str, &'a Value> {
        first_values(self.relationships.iter().map(|r| &r.properties))
    }

    pub fn describe(&self) -> String {
        format!(
            "{}: nodes({}), rels({})",
            self.kind,
            self.nodes.len(),
            self.relationships.len()
        )
    }
}

pub(crate) fn first_values<'a>(
    maps: impl Iterator<Item = &'a BTreeMap<String, Value>>,
) -> BTreeMap<&'a str, &'a Value> {
    let mut seen = BTreeMap::new();
    for properties in maps {
        for (key, value) in properties {
            if !value.is_null() {
                seen.entry(key.as_str()).or_insert(value);
            }
        }
    }
    seen
}
