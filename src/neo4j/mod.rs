pub mod connection;
pub mod schema;

pub use connection::Neo4jConnection;
pub use schema::SchemaManager;

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub node_count: i64,
    pub relationship_count: i64,
    pub label_counts: BTreeMap<String, i64>,
}

impl DatabaseStats {
    pub fn new() -> Self {
        Self {
            node_count: 0,
            relationship_count: 0,
            label_counts: BTreeMap::new(),
        }
    }
}

impl Default for DatabaseStats {
    fn default() -> Self {
        Self::new()
    }
}
