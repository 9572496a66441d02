use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::schema::EntityKind;
use super::value::{MetaType, Value};

/// Disambiguates a label from a relationship type carrying the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetadataKey {
    pub kind: EntityKind,
    pub name: String,
}

impl MetadataKey {
    pub fn node(label: &str) -> Self {
        Self {
            kind: EntityKind::Node,
            name: label.to_string(),
        }
    }

    pub fn relationship(rel_type: &str) -> Self {
        Self {
            kind: EntityKind::Relationship,
            name: rel_type.to_string(),
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// One metadata record for a property or relationship type observed under a
/// label or relationship type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaItem {
    /// Label or relationship type owning the entry
    pub label: String,
    /// Property key, or relationship type for degree entries
    pub key: String,
    /// Kind of entity the owning name refers to
    pub element_type: EntityKind,
    #[serde(rename = "type")]
    pub type_name: MetaType,
    pub array: bool,
    pub unique: bool,
    pub index: bool,
    pub existence: bool,
    pub sample: Vec<Value>,
    pub count: u64,
    pub left_count: u64,
    pub right_count: u64,
    /// Average out-degree, integer division
    pub left: u64,
    /// Average in-degree, integer division
    pub right: u64,
    /// Labels seen at the far end of traversed relationships
    pub other: BTreeSet<String>,
}

impl MetaItem {
    fn empty(label: &str, key: &str, element_type: EntityKind, type_name: MetaType) -> Self {
        Self {
            label: label.to_string(),
            key: key.to_string(),
            element_type,
            type_name,
            array: false,
            unique: false,
            index: false,
            existence: false,
            sample: Vec::new(),
            count: 0,
            left_count: 0,
            right_count: 0,
            left: 0,
            right: 0,
            other: BTreeSet::new(),
        }
    }

    /// Property shape taken from the first observed value.
    pub fn property(label: &str, key: &str, element_type: EntityKind, value: &Value) -> Self {
        let mut item = Self::empty(label, key, element_type, value.element_type());
        item.array = value.is_list();
        item.sample.push(value.clone());
        item
    }

    /// Degree entry for a relationship type under a label (or a label under a type).
    pub fn relationship(label: &str, rel_type: &str, element_type: EntityKind) -> Self {
        Self::empty(label, rel_type, element_type, MetaType::Relationship)
    }

    pub fn is_relationship(&self) -> bool {
        self.type_name == MetaType::Relationship
    }

    /// Folds one sampled node's degrees into the running averages.
    pub fn rel(&mut self, out: u64, incoming: u64) {
        self.count += 1;
        self.left_count += out;
        self.right_count += incoming;
        self.recompute();
    }

    pub fn add_other<'a>(&mut self, labels: impl IntoIterator<Item = &'a String>) {
        self.other.extend(labels.into_iter().cloned());
    }

    pub fn with_schema(mut self, unique: bool, index: bool, existence: bool) -> Self {
        self.unique = unique;
        self.index = index;
        self.existence = existence;
        self
    }

    /// Folds a later observation of the same key into this record: flags are
    /// unioned, degree totals accumulate, the first observed type is kept.
    pub fn merge(&mut self, later: &MetaItem) {
        self.unique |= later.unique;
        self.index |= later.index;
        self.existence |= later.existence;
        self.array |= later.array && self.type_name == later.type_name;
        if self.sample.is_empty() {
            self.sample = later.sample.clone();
        }
        self.count += later.count;
        self.left_count += later.left_count;
        self.right_count += later.right_count;
        self.other.extend(later.other.iter().cloned());
        self.recompute();
    }

    fn recompute(&mut self) {
        if self.count > 0 {
            self.left = self.left_count / self.count;
            self.right = self.right_count / self.count;
        }
    }
}

/// Identifier of an entity that exists only in a computed result and was
/// never materialized in the store. Always negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VirtualId(i64);

impl VirtualId {
    pub fn nth(n: usize) -> Self {
        VirtualId(-(n as i64) - 1)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

/// A label of the meta-graph with its node count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualNode {
    pub id: VirtualId,
    pub label: String,
    pub count: u64,
}

/// A `(start label)-[type]->(end label)` pattern of the meta-graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualEdge {
    pub id: VirtualId,
    pub start: VirtualId,
    pub end: VirtualId,
    pub start_label: String,
    pub end_label: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Relationships of the type leaving nodes of the start label
    pub out: u64,
    /// Relationships of the type arriving at nodes of the end label
    #[serde(rename = "in")]
    pub incoming: u64,
    /// Global count of the type
    pub count: u64,
}
