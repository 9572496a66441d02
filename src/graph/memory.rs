use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::store::{GraphStore, NodeIter, RelIter};
use crate::error::{Error, Result};
use crate::models::{
    ConstraintDef, Direction, EntityKind, IndexDef, Node, NodeId, Properties, RelId, Relationship,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CountKey {
    start: Option<String>,
    rel_type: Option<String>,
    end: Option<String>,
}

impl CountKey {
    fn new(start: Option<&str>, rel_type: Option<&str>, end: Option<&str>) -> Self {
        Self {
            start: start.map(str::to_string),
            rel_type: rel_type.map(str::to_string),
            end: end.map(str::to_string),
        }
    }
}

/// In-memory property graph with a maintained counts store.
///
/// Iteration is in id order, which stands in for the native order of a
/// database. Labels are fixed at creation so the counts never drift.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    nodes: BTreeMap<NodeId, Node>,
    relationships: BTreeMap<RelId, Relationship>,
    outgoing: HashMap<NodeId, Vec<RelId>>,
    incoming: HashMap<NodeId, Vec<RelId>>,
    label_index: BTreeMap<String, Vec<NodeId>>,
    rel_counts: HashMap<CountKey, u64>,
    constraints: Vec<ConstraintDef>,
    indexes: Vec<IndexDef>,
    next_node_id: u64,
    next_rel_id: u64,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_len(&self) -> usize {
        self.relationships.len()
    }

    pub fn create_node(&mut self, labels: &[&str], properties: Properties) -> NodeId {
        let id = NodeId(self.next_node_id);
        let node = Node::new(id, labels.iter().map(|l| l.to_string()).collect(), properties);
        self.index_node(node);
        id
    }

    /// Inserts a node keeping its id, rejecting ids already present.
    pub fn insert_node(&mut self, node: Node) -> Result<NodeId> {
        if self.nodes.contains_key(&node.id) {
            return Err(Error::DuplicateIdentity {
                space: "node".to_string(),
                id: node.id.to_string(),
            });
        }
        let id = node.id;
        self.index_node(node);
        Ok(id)
    }

    fn index_node(&mut self, mut node: Node) {
        node.labels.dedup();
        for label in node.sorted_labels() {
            self.label_index.entry(label).or_default().push(node.id);
        }
        self.next_node_id = self.next_node_id.max(node.id.0 + 1);
        self.nodes.insert(node.id, node);
    }

    pub fn create_relationship(
        &mut self,
        start: NodeId,
        end: NodeId,
        rel_type: &str,
        properties: Properties,
    ) -> Result<RelId> {
        let rel = Relationship {
            id: RelId(self.next_rel_id),
            rel_type: rel_type.to_string(),
            start,
            end,
            properties,
        };
        self.insert_relationship(rel)
    }

    pub fn insert_relationship(&mut self, rel: Relationship) -> Result<RelId> {
        if self.relationships.contains_key(&rel.id) {
            return Err(Error::DuplicateIdentity {
                space: "relationship".to_string(),
                id: rel.id.to_string(),
            });
        }
        let start_labels = self.endpoint_labels(rel.start)?;
        let end_labels = self.endpoint_labels(rel.end)?;

        let t = Some(rel.rel_type.as_str());
        let mut keys = vec![CountKey::new(None, t, None), CountKey::new(None, None, None)];
        for label in &start_labels {
            keys.push(CountKey::new(Some(label), t, None));
            keys.push(CountKey::new(Some(label), None, None));
        }
        for label in &end_labels {
            keys.push(CountKey::new(None, t, Some(label)));
            keys.push(CountKey::new(None, None, Some(label)));
        }
        for key in keys {
            *self.rel_counts.entry(key).or_insert(0) += 1;
        }

        let id = rel.id;
        self.outgoing.entry(rel.start).or_default().push(id);
        self.incoming.entry(rel.end).or_default().push(id);
        self.next_rel_id = self.next_rel_id.max(id.0 + 1);
        self.relationships.insert(id, rel);
        Ok(id)
    }

    fn endpoint_labels(&self, id: NodeId) -> Result<Vec<String>> {
        self.nodes
            .get(&id)
            .map(Node::sorted_labels)
            .ok_or_else(|| Error::malformed(format!("relationship endpoint {id} does not exist")))
    }

    pub fn add_constraint(&mut self, constraint: ConstraintDef) {
        self.constraints.push(constraint);
    }

    pub fn add_index(&mut self, index: IndexDef) {
        self.indexes.push(index);
    }

    pub fn all_constraints(&self) -> &[ConstraintDef] {
        &self.constraints
    }

    pub fn all_indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    fn rel_ids(&self, node: NodeId, direction: Direction) -> Vec<RelId> {
        let out = self.outgoing.get(&node).map(Vec::as_slice).unwrap_or(&[]);
        let inc = self.incoming.get(&node).map(Vec::as_slice).unwrap_or(&[]);
        match direction {
            Direction::Outgoing => out.to_vec(),
            Direction::Incoming => inc.to_vec(),
            Direction::Both => {
                // self loops are listed on both sides
                let mut ids = out.to_vec();
                ids.extend(
                    inc.iter()
                        .filter(|id| self.relationships.get(id).is_some_and(|r| r.start != node)),
                );
                ids
            }
        }
    }
}

impl GraphStore for MemoryGraph {
    fn labels_in_use(&self) -> Result<Vec<String>> {
        Ok(self
            .label_index
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(label, _)| label.clone())
            .collect())
    }

    fn relationship_types_in_use(&self) -> Result<Vec<String>> {
        let types: BTreeSet<&str> = self
            .relationships
            .values()
            .map(|r| r.rel_type.as_str())
            .collect();
        Ok(types.into_iter().map(str::to_string).collect())
    }

    fn property_keys_in_use(&self) -> Result<Vec<String>> {
        let keys: BTreeSet<&str> = self
            .nodes
            .values()
            .flat_map(|n| n.properties.keys())
            .chain(self.relationships.values().flat_map(|r| r.properties.keys()))
            .map(String::as_str)
            .collect();
        Ok(keys.into_iter().map(str::to_string).collect())
    }

    fn count_nodes(&self, label: Option<&str>) -> Result<u64> {
        Ok(match label {
            Some(label) => self.label_index.get(label).map_or(0, |ids| ids.len() as u64),
            None => self.nodes.len() as u64,
        })
    }

    fn count_relationships(
        &self,
        start_label: Option<&str>,
        rel_type: Option<&str>,
        end_label: Option<&str>,
    ) -> Result<u64> {
        if start_label.is_some() && end_label.is_some() {
            return Err(Error::malformed(
                "the counts store tracks start and end labels independently",
            ));
        }
        let key = CountKey::new(start_label, rel_type, end_label);
        Ok(self.rel_counts.get(&key).copied().unwrap_or(0))
    }

    fn nodes_by_label(&self, label: &str) -> Result<NodeIter<'_>> {
        let ids = self.label_index.get(label).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Box::new(ids.iter().filter_map(|id| self.nodes.get(id))))
    }

    fn all_nodes(&self) -> Result<NodeIter<'_>> {
        Ok(Box::new(self.nodes.values()))
    }

    fn all_relationships(&self) -> Result<RelIter<'_>> {
        Ok(Box::new(self.relationships.values()))
    }

    fn node(&self, id: NodeId) -> Result<Option<&Node>> {
        Ok(self.nodes.get(&id))
    }

    fn relationship(&self, id: RelId) -> Result<Option<&Relationship>> {
        Ok(self.relationships.get(&id))
    }

    fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
        rel_type: Option<&str>,
    ) -> Result<RelIter<'_>> {
        let rel_type = rel_type.map(str::to_string);
        let ids = self.rel_ids(node, direction);
        Ok(Box::new(ids.into_iter().filter_map(move |id| {
            self.relationships
                .get(&id)
                .filter(|r| rel_type.as_deref().is_none_or(|t| r.rel_type == t))
        })))
    }

    fn constraints(
        &self,
        entity: EntityKind,
        label_or_type: Option<&str>,
    ) -> Result<Vec<ConstraintDef>> {
        Ok(self
            .constraints
            .iter()
            .filter(|c| c.entity == entity)
            .filter(|c| label_or_type.is_none_or(|l| c.label_or_type == l))
            .cloned()
            .collect())
    }

    fn indexes(&self, entity: EntityKind, label_or_type: Option<&str>) -> Result<Vec<IndexDef>> {
        Ok(self
            .indexes
            .iter()
            .filter(|i| i.entity == entity)
            .filter(|i| label_or_type.is_none_or(|l| i.label_or_type == l))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::props;

    #[test]
    fn test_counts_store_tracks_each_side() {
        let mut g = MemoryGraph::new();
        let a = g.create_node(&["Person", "Employee"], props([("name", "a")]));
        let b = g.create_node(&["City"], Properties::new());
        g.create_relationship(a, b, "LIVES_IN", Properties::new()).unwrap();

        assert_eq!(g.count_relationships(Some("Person"), Some("LIVES_IN"), None).unwrap(), 1);
        assert_eq!(g.count_relationships(Some("Employee"), Some("LIVES_IN"), None).unwrap(), 1);
        assert_eq!(g.count_relationships(None, Some("LIVES_IN"), Some("City")).unwrap(), 1);
        assert_eq!(g.count_relationships(None, Some("LIVES_IN"), Some("Person")).unwrap(), 0);
        assert_eq!(g.count_relationships(None, None, None).unwrap(), 1);
        assert!(g
            .count_relationships(Some("Person"), Some("LIVES_IN"), Some("City"))
            .is_err());
    }

    #[test]
    fn test_insert_node_rejects_duplicate_ids() {
        let mut g = MemoryGraph::new();
        let node = Node::new(NodeId(7), vec!["A".into()], Properties::new());
        g.insert_node(node.clone()).unwrap();
        let err = g.insert_node(node).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentity { .. }));
        assert_eq!(g.create_node(&["A"], Properties::new()), NodeId(8));
    }

    #[test]
    fn test_relationship_to_missing_node_is_rejected() {
        let mut g = MemoryGraph::new();
        let a = g.create_node(&["A"], Properties::new());
        assert!(g
            .create_relationship(a, NodeId(99), "R", Properties::new())
            .is_err());
    }

    #[test]
    fn test_self_loop_listed_once_for_both() {
        let mut g = MemoryGraph::new();
        let a = g.create_node(&["A"], Properties::new());
        g.create_relationship(a, a, "SELF", Properties::new()).unwrap();
        assert_eq!(g.degree(a, Direction::Both, None).unwrap(), 1);
        assert_eq!(g.degree(a, Direction::Outgoing, Some("SELF")).unwrap(), 1);
        assert_eq!(g.degree(a, Direction::Incoming, Some("OTHER")).unwrap(), 0);
    }
}
