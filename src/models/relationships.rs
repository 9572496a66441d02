use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::nodes::NodeId;
use super::value::Properties;

/// Store-assigned relationship identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelId(pub u64);

impl fmt::Display for RelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub start: NodeId,
    pub end: NodeId,
    #[serde(default)]
    pub properties: Properties,
}

impl Relationship {
    /// The endpoint opposite to `node`, `None` if `node` is not an endpoint.
    pub fn other_node(&self, node: NodeId) -> Option<NodeId> {
        if self.start == node {
            Some(self.end)
        } else if self.end == node {
            Some(self.start)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Relationships starting at the node
    Outgoing,
    /// Relationships ending at the node
    Incoming,
    /// Either direction
    Both,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
            Direction::Both => Direction::Both,
        }
    }

    pub fn matches(self, rel: &Relationship, node: NodeId) -> bool {
        match self {
            Direction::Outgoing => rel.start == node,
            Direction::Incoming => rel.end == node,
            Direction::Both => rel.start == node || rel.end == node,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "out" | "outgoing" => Ok(Direction::Outgoing),
            "in" | "incoming" => Ok(Direction::Incoming),
            "both" => Ok(Direction::Both),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}
