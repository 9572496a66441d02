use std::collections::BTreeSet;

use crate::error::Result;
use crate::models::{
    ConstraintDef, Direction, EntityKind, IndexDef, Node, NodeId, RelId, Relationship,
};

pub type NodeIter<'a> = Box<dyn Iterator<Item = &'a Node> + 'a>;
pub type RelIter<'a> = Box<dyn Iterator<Item = &'a Relationship> + 'a>;

/// Read-only view of a graph database, the only way the metadata and export
/// engines reach the data. Every call is fallible: an implementation that
/// cannot answer reports `Error::StoreUnavailable` instead of a default.
pub trait GraphStore {
    fn labels_in_use(&self) -> Result<Vec<String>>;

    fn relationship_types_in_use(&self) -> Result<Vec<String>>;

    fn property_keys_in_use(&self) -> Result<Vec<String>>;

    /// Node count for a label, or all nodes when `label` is `None`.
    fn count_nodes(&self, label: Option<&str>) -> Result<u64>;

    /// Relationship count from the counts store. At most one of the two
    /// endpoint labels may be given; the store tracks them independently.
    fn count_relationships(
        &self,
        start_label: Option<&str>,
        rel_type: Option<&str>,
        end_label: Option<&str>,
    ) -> Result<u64>;

    fn nodes_by_label(&self, label: &str) -> Result<NodeIter<'_>>;

    fn all_nodes(&self) -> Result<NodeIter<'_>>;

    fn all_relationships(&self) -> Result<RelIter<'_>>;

    fn node(&self, id: NodeId) -> Result<Option<&Node>>;

    fn relationship(&self, id: RelId) -> Result<Option<&Relationship>>;

    fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
        rel_type: Option<&str>,
    ) -> Result<RelIter<'_>>;

    fn degree(&self, node: NodeId, direction: Direction, rel_type: Option<&str>) -> Result<u64> {
        Ok(self.relationships(node, direction, rel_type)?.count() as u64)
    }

    /// Distinct relationship types attached to a node, sorted.
    fn relationship_types_of(&self, node: NodeId) -> Result<Vec<String>> {
        let types: BTreeSet<String> = self
            .relationships(node, Direction::Both, None)?
            .map(|r| r.rel_type.clone())
            .collect();
        Ok(types.into_iter().collect())
    }

    /// Constraints on one entity kind, optionally restricted to a label or type.
    fn constraints(
        &self,
        entity: EntityKind,
        label_or_type: Option<&str>,
    ) -> Result<Vec<ConstraintDef>>;

    fn indexes(&self, entity: EntityKind, label_or_type: Option<&str>) -> Result<Vec<IndexDef>>;
}
