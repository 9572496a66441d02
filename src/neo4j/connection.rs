use anyhow::{Context, Result};
use neo4rs::{query, ConfigBuilder, Graph, Query};
use std::sync::Arc;

use super::{DatabaseStats, SchemaManager};
use crate::error::Error;
use crate::graph::MemoryGraph;
use crate::models::{Node, NodeId, Properties, RelId, Relationship};

/// Rows fetched per round trip while pulling a snapshot.
const PAGE_SIZE: i64 = 10_000;

#[derive(Clone)]
pub struct Neo4jConnection {
    graph: Arc<Graph>,
}

fn unavailable(context: &str, e: impl std::fmt::Display) -> Error {
    Error::unavailable(format!("{context}: {e}"))
}

/// A count query yields exactly one row. A missing row or an undecodable
/// column is a failed count, never zero.
fn expect_count<E: std::fmt::Display>(
    cypher: &str,
    value: Option<std::result::Result<i64, E>>,
) -> std::result::Result<i64, Error> {
    match value {
        Some(Ok(count)) => Ok(count),
        Some(Err(e)) => Err(unavailable(&format!("count column of '{cypher}'"), e)),
        None => Err(Error::unavailable(format!("count query '{cypher}' returned no row"))),
    }
}

impl Neo4jConnection {
    pub async fn new(config: &crate::config::Config) -> Result<Self> {
        let mut config_builder = ConfigBuilder::default()
            .uri(&config.neo4j_uri)
            .user(&config.neo4j_user)
            .password(&config.neo4j_password);

        if let Some(ref db_name) = config.neo4j_database {
            config_builder = config_builder.db(db_name.as_str());
        }

        let neo4j_config = config_builder
            .build()
            .context("Failed to build Neo4j configuration")?;

        let graph = Graph::connect(neo4j_config)
            .await
            .map_err(|e| unavailable("Failed to connect to Neo4j database", e))?;

        Ok(Self {
            graph: Arc::new(graph),
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub async fn test_connection(&self) -> Result<()> {
        let query = Query::new("RETURN 1 as test".to_string());
        self.graph
            .run(query)
            .await
            .map_err(|e| unavailable("Failed to execute test query", e))?;
        Ok(())
    }

    async fn count(&self, cypher: &str) -> Result<i64> {
        let mut result = self
            .graph
            .execute(query(cypher))
            .await
            .map_err(|e| unavailable("count query failed", e))?;
        let row = result
            .next()
            .await
            .map_err(|e| unavailable("count query failed", e))?;
        Ok(expect_count(cypher, row.map(|r| r.get::<i64>("count")))?)
    }

    /// Totals from the count store: nodes, relationships and per label.
    pub async fn get_database_stats(&self) -> Result<DatabaseStats> {
        let mut stats = DatabaseStats::new();
        stats.node_count = self.count("MATCH (n) RETURN count(n) as count").await?;
        stats.relationship_count = self.count("MATCH ()-[r]->() RETURN count(r) as count").await?;

        let mut result = self
            .graph
            .execute(query("CALL db.labels() YIELD label RETURN label"))
            .await
            .map_err(|e| unavailable("label listing failed", e))?;
        let mut labels = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| unavailable("label listing failed", e))?
        {
            labels.push(row.get::<String>("label").map_err(|e| unavailable("label listing", e))?);
        }
        for label in labels {
            let cypher = format!(
                "MATCH (n:{}) RETURN count(n) as count",
                crate::utils::ident::quote_ident(&label)
            );
            let count = self.count(&cypher).await?;
            stats.label_counts.insert(label, count);
        }

        Ok(stats)
    }

    /// Copies the whole database, schema included, into memory. Pages are
    /// read by id so the copy is consistent only if no one writes meanwhile.
    pub async fn snapshot(&self) -> Result<MemoryGraph> {
        let mut graph = MemoryGraph::new();
        let mut last = -1i64;
        loop {
            let page = query(
                "MATCH (n) WHERE id(n) > $last \
                 RETURN id(n) AS id, labels(n) AS labels, properties(n) AS props \
                 ORDER BY id(n) LIMIT $limit",
            )
            .param("last", last)
            .param("limit", PAGE_SIZE);
            let mut result = self
                .graph
                .execute(page)
                .await
                .map_err(|e| unavailable("node scan failed", e))?;
            let mut fetched = 0;
            while let Some(row) = result
                .next()
                .await
                .map_err(|e| unavailable("node scan failed", e))?
            {
                let id: i64 = row.get("id").map_err(|e| unavailable("node id", e))?;
                let labels: Vec<String> = row
                    .get("labels")
                    .map_err(|e| unavailable("node labels", e))?;
                let props: Properties = row
                    .get("props")
                    .map_err(|e| unavailable("node properties", e))?;
                graph.insert_node(Node::new(NodeId(id as u64), labels, props))?;
                last = id;
                fetched += 1;
            }
            if fetched < PAGE_SIZE {
                break;
            }
        }

        let mut last = -1i64;
        loop {
            let page = query(
                "MATCH (a)-[r]->(b) WHERE id(r) > $last \
                 RETURN id(r) AS id, type(r) AS type, id(a) AS start, id(b) AS end, \
                 properties(r) AS props ORDER BY id(r) LIMIT $limit",
            )
            .param("last", last)
            .param("limit", PAGE_SIZE);
            let mut result = self
                .graph
                .execute(page)
                .await
                .map_err(|e| unavailable("relationship scan failed", e))?;
            let mut fetched = 0;
            while let Some(row) = result
                .next()
                .await
                .map_err(|e| unavailable("relationship scan failed", e))?
            {
                let id: i64 = row.get("id").map_err(|e| unavailable("relationship id", e))?;
                let start: i64 = row
                    .get("start")
                    .map_err(|e| unavailable("relationship start", e))?;
                let end: i64 = row.get("end").map_err(|e| unavailable("relationship end", e))?;
                graph.insert_relationship(Relationship {
                    id: RelId(id as u64),
                    rel_type: row.get("type").map_err(|e| unavailable("relationship type", e))?,
                    start: NodeId(start as u64),
                    end: NodeId(end as u64),
                    properties: row
                        .get("props")
                        .map_err(|e| unavailable("relationship properties", e))?,
                })?;
                last = id;
                fetched += 1;
            }
            if fetched < PAGE_SIZE {
                break;
            }
        }

        let schema = SchemaManager::new(self.clone());
        for constraint in schema.constraints().await? {
            graph.add_constraint(constraint);
        }
        for index in schema.indexes().await? {
            graph.add_index(index);
        }
        tracing::info!(
            nodes = graph.node_len(),
            relationships = graph.relationship_len(),
            "database snapshot taken"
        );
        Ok(graph)
    }
}
