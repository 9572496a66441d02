use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of entity a label-or-type name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Node,
    Relationship,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Node => "node",
            EntityKind::Relationship => "relationship",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Property values are unique across the label
    Unique,
    /// Unique and required
    NodeKey,
    /// Property must be present
    Existence,
}

impl ConstraintKind {
    pub fn implies_uniqueness(self) -> bool {
        matches!(self, ConstraintKind::Unique | ConstraintKind::NodeKey)
    }

    pub fn implies_existence(self) -> bool {
        matches!(self, ConstraintKind::Existence | ConstraintKind::NodeKey)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintDef {
    #[serde(default)]
    pub name: Option<String>,
    pub kind: ConstraintKind,
    pub entity: EntityKind,
    pub label_or_type: String,
    pub properties: Vec<String>,
}

impl ConstraintDef {
    pub fn unique(label: &str, properties: &[&str]) -> Self {
        Self::node(ConstraintKind::Unique, label, properties)
    }

    pub fn node(kind: ConstraintKind, label: &str, properties: &[&str]) -> Self {
        Self {
            name: None,
            kind,
            entity: EntityKind::Node,
            label_or_type: label.to_string(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn relationship_existence(rel_type: &str, property: &str) -> Self {
        Self {
            name: None,
            kind: ConstraintKind::Existence,
            entity: EntityKind::Relationship,
            label_or_type: rel_type.to_string(),
            properties: vec![property.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    #[serde(default)]
    pub name: Option<String>,
    pub entity: EntityKind,
    pub label_or_type: String,
    pub properties: Vec<String>,
}

impl IndexDef {
    pub fn node(label: &str, properties: &[&str]) -> Self {
        Self {
            name: None,
            entity: EntityKind::Node,
            label_or_type: label.to_string(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn relationship(rel_type: &str, properties: &[&str]) -> Self {
        Self {
            name: None,
            entity: EntityKind::Relationship,
            label_or_type: rel_type.to_string(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
        }
    }
}
