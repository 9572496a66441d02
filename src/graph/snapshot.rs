use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::memory::MemoryGraph;
use super::store::GraphStore;
use crate::error::Result;
use crate::models::{ConstraintDef, EntityKind, IndexDef, Node, Relationship};

/// Point-in-time JSON document of a whole graph, schema included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDef>,
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
}

impl Snapshot {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn from_store<S: GraphStore + ?Sized>(store: &S) -> Result<Self> {
        let mut constraints = store.constraints(EntityKind::Node, None)?;
        constraints.extend(store.constraints(EntityKind::Relationship, None)?);
        let mut indexes = store.indexes(EntityKind::Node, None)?;
        indexes.extend(store.indexes(EntityKind::Relationship, None)?);
        Ok(Self {
            nodes: store.all_nodes()?.cloned().collect(),
            relationships: store.all_relationships()?.cloned().collect(),
            constraints,
            indexes,
        })
    }

    /// Builds the in-memory store; duplicate ids and dangling endpoints are errors.
    pub fn into_graph(self) -> Result<MemoryGraph> {
        let mut graph = MemoryGraph::new();
        for node in self.nodes {
            graph.insert_node(node)?;
        }
        for rel in self.relationships {
            graph.insert_relationship(rel)?;
        }
        for constraint in self.constraints {
            graph.add_constraint(constraint);
        }
        for index in self.indexes {
            graph.add_index(index);
        }
        Ok(graph)
    }
}
