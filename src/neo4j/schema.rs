use super::Neo4jConnection;
use anyhow::Result;
use neo4rs::query;

use crate::error::Error;
use crate::models::{ConstraintDef, ConstraintKind, EntityKind, IndexDef};

/// Reads constraint and index definitions of a live database.
pub struct SchemaManager {
    connection: Neo4jConnection,
}

fn entity_kind(raw: &str) -> Option<EntityKind> {
    match raw {
        "NODE" => Some(EntityKind::Node),
        "RELATIONSHIP" => Some(EntityKind::Relationship),
        _ => None,
    }
}

/// Maps the `type` column of `SHOW CONSTRAINTS`. Property type constraints
/// have no counterpart and are skipped.
fn constraint_kind(raw: &str) -> Option<ConstraintKind> {
    match raw {
        "UNIQUENESS" | "NODE_PROPERTY_UNIQUENESS" | "RELATIONSHIP_UNIQUENESS"
        | "RELATIONSHIP_PROPERTY_UNIQUENESS" => Some(ConstraintKind::Unique),
        "NODE_KEY" | "RELATIONSHIP_KEY" => Some(ConstraintKind::NodeKey),
        "NODE_PROPERTY_EXISTENCE" | "RELATIONSHIP_PROPERTY_EXISTENCE" => {
            Some(ConstraintKind::Existence)
        }
        _ => None,
    }
}

/// `labelsOrTypes` holds a single entry for property constraints and indexes.
fn single_target(labels: Vec<String>) -> Option<String> {
    match <[String; 1]>::try_from(labels) {
        Ok([label]) => Some(label),
        Err(_) => None,
    }
}

impl SchemaManager {
    pub fn new(connection: Neo4jConnection) -> Self {
        Self { connection }
    }

    pub async fn constraints(&self) -> Result<Vec<ConstraintDef>> {
        let mut result = self
            .connection
            .graph()
            .execute(query(
                "SHOW CONSTRAINTS YIELD name, type, entityType, labelsOrTypes, properties",
            ))
            .await
            .map_err(|e| Error::unavailable(format!("SHOW CONSTRAINTS failed: {e}")))?;
        let mut constraints = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Error::unavailable(format!("SHOW CONSTRAINTS failed: {e}")))?
        {
            let kind = row.get::<String>("type").ok();
            let entity = row.get::<String>("entityType").ok();
            let target = row.get::<Vec<String>>("labelsOrTypes").ok().and_then(single_target);
            let (Some(kind), Some(entity), Some(target)) = (
                kind.as_deref().and_then(constraint_kind),
                entity.as_deref().and_then(entity_kind),
                target,
            ) else {
                tracing::debug!(row = ?row.get::<String>("name").ok(), "skipping constraint");
                continue;
            };
            constraints.push(ConstraintDef {
                name: row.get::<String>("name").ok(),
                kind,
                entity,
                label_or_type: target,
                properties: row.get::<Vec<String>>("properties").unwrap_or_default(),
            });
        }
        Ok(constraints)
    }

    /// Property indexes not owned by a constraint. Token lookup indexes are
    /// left out.
    pub async fn indexes(&self) -> Result<Vec<IndexDef>> {
        let mut result = self
            .connection
            .graph()
            .execute(query(
                "SHOW INDEXES YIELD name, type, entityType, labelsOrTypes, properties, owningConstraint \
                 WHERE type <> 'LOOKUP' AND owningConstraint IS NULL \
                 RETURN name, entityType, labelsOrTypes, properties",
            ))
            .await
            .map_err(|e| Error::unavailable(format!("SHOW INDEXES failed: {e}")))?;
        let mut indexes = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Error::unavailable(format!("SHOW INDEXES failed: {e}")))?
        {
            let entity = row.get::<String>("entityType").ok();
            let target = row.get::<Vec<String>>("labelsOrTypes").ok().and_then(single_target);
            let (Some(entity), Some(target)) = (entity.as_deref().and_then(entity_kind), target)
            else {
                continue;
            };
            indexes.push(IndexDef {
                name: row.get::<String>("name").ok(),
                entity,
                label_or_type: target,
                properties: row.get::<Vec<String>>("properties").unwrap_or_default(),
            });
        }
        Ok(indexes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_kinds() {
        assert_eq!(constraint_kind("UNIQUENESS"), Some(ConstraintKind::Unique));
        assert_eq!(constraint_kind("NODE_KEY"), Some(ConstraintKind::NodeKey));
        assert_eq!(
            constraint_kind("RELATIONSHIP_PROPERTY_EXISTENCE"),
            Some(ConstraintKind::Existence)
        );
        assert_eq!(constraint_kind("NODE_PROPERTY_TYPE"), None);
        assert_eq!(entity_kind("RELATIONSHIP"), Some(EntityKind::Relationship));
    }

    #[test]
    fn test_single_target() {
        assert_eq!(single_target(vec!["Person".into()]), Some("Person".to_string()));
        assert_eq!(single_target(vec!["A".into(), "B".into()]), None);
        assert_eq!(single_target(Vec::new()), None);
    }
}
