use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::ExportCounters;
use crate::models::{ConstraintDef, EntityKind, Node, NodeId, RelId, Relationship};

pub const UNIQUE_ID_LABEL: &str = "UNIQUE IMPORT LABEL";
pub const UNIQUE_ID_PROP: &str = "UNIQUE IMPORT ID";
pub const UNIQUE_ID_REL: &str = "UNIQUE IMPORT ID REL";
pub const UNIQUE_ID_NAME: &str = "UNIQUE_IMPORT_NAME";

/// Label to the smallest property set covered by a uniqueness constraint on
/// it. Ties between equally small sets go to the lexicographically first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniqueConstraintIndex {
    by_label: BTreeMap<String, Vec<String>>,
}

impl UniqueConstraintIndex {
    pub fn build<'c>(constraints: impl IntoIterator<Item = &'c ConstraintDef>) -> Self {
        let mut by_label: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for constraint in constraints {
            if constraint.entity != EntityKind::Node
                || !constraint.kind.implies_uniqueness()
                || constraint.properties.is_empty()
            {
                continue;
            }
            let mut properties = constraint.properties.clone();
            properties.sort();
            let better = match by_label.get(&constraint.label_or_type) {
                None => true,
                Some(current) => (properties.len(), &properties) < (current.len(), current),
            };
            if better {
                by_label.insert(constraint.label_or_type.clone(), properties);
            }
        }
        Self { by_label }
    }

    pub fn properties(&self, label: &str) -> Option<&[String]> {
        self.by_label.get(label).map(Vec::as_slice)
    }

    /// First label (in sorted order) whose constrained properties are all
    /// present and non-null on `node`.
    pub fn natural_key<'n>(&'n self, node: &'n Node) -> Option<NaturalKey<'n>> {
        node.sorted_labels().into_iter().find_map(|label| {
            let (label, properties) = self.by_label.get_key_value(&label)?;
            properties
                .iter()
                .all(|p| node.property(p).is_some())
                .then_some(NaturalKey {
                    label,
                    properties,
                })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

/// A label plus the properties that identify a node under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalKey<'a> {
    pub label: &'a str,
    pub properties: &'a [String],
}

/// How a statement finds a node again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKey<'a> {
    Natural(NaturalKey<'a>),
    /// Synthetic label and id property carrying the node id
    Artificial(NodeId),
}

/// Decides per entity whether it is identifiable on its own or needs a
/// synthetic id, and counts the synthetic ids handed out.
#[derive(Debug, Clone, Default)]
pub struct UniquenessTracker {
    index: UniqueConstraintIndex,
    artificial_nodes: BTreeSet<NodeId>,
    duplicate_rels: BTreeSet<RelId>,
    artificial_rels: BTreeSet<RelId>,
    counters: ExportCounters,
}

impl UniquenessTracker {
    pub fn new(index: UniqueConstraintIndex) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn index(&self) -> &UniqueConstraintIndex {
        &self.index
    }

    pub fn is_naturally_unique(&self, node: &Node) -> bool {
        self.index.natural_key(node).is_some()
    }

    /// Marks `node` as needing a synthetic id. Repeated calls are no-ops.
    pub fn assign_synthetic_id(&mut self, node: &Node) {
        if self.artificial_nodes.insert(node.id) {
            self.counters.artificial_unique_nodes += 1;
        }
    }

    pub fn assign_synthetic_rel_id(&mut self, rel: &Relationship) {
        if self.artificial_rels.insert(rel.id) {
            self.counters.artificial_unique_rels += 1;
        }
    }

    /// Remembers relationships sharing (start, end, type) with another one.
    /// Runs once over the whole relationship set of an export.
    pub fn scan_relationships<'r>(&mut self, rels: impl IntoIterator<Item = &'r Relationship>) {
        let mut groups: HashMap<(NodeId, NodeId, &str), Vec<RelId>> = HashMap::new();
        for rel in rels {
            groups
                .entry((rel.start, rel.end, rel.rel_type.as_str()))
                .or_default()
                .push(rel.id);
        }
        for ids in groups.into_values().filter(|ids| ids.len() > 1) {
            self.duplicate_rels.extend(ids);
        }
    }

    pub fn is_rel_naturally_unique(&self, rel: &Relationship) -> bool {
        !self.duplicate_rels.contains(&rel.id)
    }

    pub fn has_synthetic_rel_id(&self, rel: &Relationship) -> bool {
        self.artificial_rels.contains(&rel.id)
    }

    /// Key used to match `node` in generated statements.
    pub fn key_for<'n>(&'n self, node: &'n Node) -> NodeKey<'n> {
        match self.index.natural_key(node) {
            Some(key) if !self.artificial_nodes.contains(&node.id) => NodeKey::Natural(key),
            _ => NodeKey::Artificial(node.id),
        }
    }

    pub fn counters(&self) -> ExportCounters {
        self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{fixtures, GraphStore};
    use crate::models::{props, ConstraintKind, Properties, Value};

    fn node(id: u64, labels: &[&str], properties: Properties) -> Node {
        Node::new(NodeId(id), labels.iter().map(|l| l.to_string()).collect(), properties)
    }

    #[test]
    fn test_index_prefers_smallest_key() {
        let index = UniqueConstraintIndex::build(&[
            ConstraintDef::node(ConstraintKind::NodeKey, "Person", &["last", "first"]),
            ConstraintDef::unique("Person", &["email"]),
            ConstraintDef::unique("Book", &["isbn"]),
            ConstraintDef::unique("Book", &["ean"]),
            ConstraintDef::node(ConstraintKind::Existence, "Dog", &["name"]),
        ]);
        assert_eq!(index.properties("Person"), Some(&["email".to_string()][..]));
        assert_eq!(index.properties("Book"), Some(&["ean".to_string()][..]));
        assert_eq!(index.properties("Dog"), None);
    }

    #[test]
    fn test_natural_key_needs_all_properties() {
        let index = UniqueConstraintIndex::build(&[ConstraintDef::node(
            ConstraintKind::NodeKey,
            "Person",
            &["first", "last"],
        )]);
        let full = node(1, &["Person"], props([("first", "Ada"), ("last", "Lovelace")]));
        let partial = node(2, &["Person"], props([("first", "Ada")]));
        let mut nulls = props([("first", "Ada")]);
        nulls.insert("last".into(), Value::Null);
        let null_valued = node(3, &["Person"], nulls);
        assert!(index.natural_key(&full).is_some());
        assert!(index.natural_key(&partial).is_none());
        assert!(index.natural_key(&null_valued).is_none());
    }

    #[test]
    fn test_first_sorted_label_with_a_usable_key() {
        let index = UniqueConstraintIndex::build(&[
            ConstraintDef::unique("Person", &["name"]),
            ConstraintDef::unique("Employee", &["badge"]),
        ]);
        let both = node(1, &["Person", "Employee"], props([("name", "C"), ("badge", "7")]));
        assert_eq!(index.natural_key(&both).unwrap().label, "Employee");
        let only_name = node(2, &["Person", "Employee"], props([("name", "C")]));
        assert_eq!(index.natural_key(&only_name).unwrap().label, "Person");
    }

    #[test]
    fn test_synthetic_ids_are_idempotent() {
        let mut tracker = UniquenessTracker::new(UniqueConstraintIndex::default());
        let dog = node(4, &["Dog"], props([("name", "Rex")]));
        assert!(!tracker.is_naturally_unique(&dog));
        tracker.assign_synthetic_id(&dog);
        tracker.assign_synthetic_id(&dog);
        assert_eq!(tracker.counters().artificial_unique_nodes, 1);
        assert_eq!(tracker.key_for(&dog), NodeKey::Artificial(NodeId(4)));
    }

    #[test]
    fn test_duplicate_relationship_scan() {
        let graph = fixtures::social();
        let mut tracker = UniquenessTracker::new(UniqueConstraintIndex::default());
        tracker.scan_relationships(graph.all_relationships().unwrap());
        let duplicates = graph
            .all_relationships()
            .unwrap()
            .filter(|r| !tracker.is_rel_naturally_unique(r))
            .count();
        // alice knows bob twice
        assert_eq!(duplicates, 2);
    }
}
