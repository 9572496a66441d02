use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::graph::GraphStore;
use crate::utils::ident::quote_ident;
use crate::utils::CancellationToken;

/// Node count per label. Only labels with at least one node appear.
pub type LabelStats = BTreeMap<String, u64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelTypeStats {
    /// Global count per relationship type
    pub counts: BTreeMap<String, u64>,
    /// Directional counts keyed by `(:Label)-[:TYPE]->()`, `()-[:TYPE]->(:Label)`
    /// and the untyped-endpoint total `()-[:TYPE]->()`
    pub patterns: BTreeMap<String, u64>,
}

impl RelTypeStats {
    pub fn outgoing(&self, label: &str, rel_type: &str) -> u64 {
        self.patterns
            .get(&out_pattern(label, rel_type))
            .copied()
            .unwrap_or(0)
    }

    pub fn incoming(&self, label: &str, rel_type: &str) -> u64 {
        self.patterns
            .get(&in_pattern(label, rel_type))
            .copied()
            .unwrap_or(0)
    }
}

pub fn out_pattern(label: &str, rel_type: &str) -> String {
    format!("(:{})-[:{}]->()", quote_ident(label), quote_ident(rel_type))
}

pub fn in_pattern(label: &str, rel_type: &str) -> String {
    format!("()-[:{}]->(:{})", quote_ident(rel_type), quote_ident(label))
}

pub fn type_pattern(rel_type: &str) -> String {
    format!("()-[:{}]->()", quote_ident(rel_type))
}

/// Result of one aggregation pass, the `meta stats` report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub label_count: usize,
    pub rel_type_count: usize,
    pub property_key_count: usize,
    pub node_count: u64,
    pub rel_count: u64,
    pub labels: LabelStats,
    pub rel_types: BTreeMap<String, u64>,
    pub rel_types_count: BTreeMap<String, u64>,
}

impl GraphStats {
    pub fn rel_type_stats(&self) -> RelTypeStats {
        RelTypeStats {
            counts: self.rel_types_count.clone(),
            patterns: self.rel_types.clone(),
        }
    }
}

/// Reads label and relationship-type counts from a store's counts subsystem.
pub struct StatsAggregator<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    cancel: &'a CancellationToken,
}

impl<'a, S: GraphStore + ?Sized> StatsAggregator<'a, S> {
    pub fn new(store: &'a S, cancel: &'a CancellationToken) -> Self {
        Self { store, cancel }
    }

    /// Counts per label, per type, and per (label, type) direction. Filters
    /// restrict the enumerated names; zero counts are dropped. Any count the
    /// store cannot provide aborts the pass.
    pub fn aggregate(
        &self,
        label_filter: Option<&[String]>,
        rel_type_filter: Option<&[String]>,
    ) -> Result<GraphStats> {
        let labels = match label_filter {
            Some(filter) => filter.to_vec(),
            None => self.store.labels_in_use()?,
        };
        let rel_types = match rel_type_filter {
            Some(filter) => filter.to_vec(),
            None => self.store.relationship_types_in_use()?,
        };

        let mut label_stats = LabelStats::new();
        let mut patterns = BTreeMap::new();
        for label in &labels {
            self.cancel.check()?;
            let count = self.store.count_nodes(Some(label))?;
            if count == 0 {
                continue;
            }
            label_stats.insert(label.clone(), count);
            for rel_type in &rel_types {
                let out = self
                    .store
                    .count_relationships(Some(label), Some(rel_type), None)?;
                if out > 0 {
                    patterns.insert(out_pattern(label, rel_type), out);
                }
                let incoming = self
                    .store
                    .count_relationships(None, Some(rel_type), Some(label))?;
                if incoming > 0 {
                    patterns.insert(in_pattern(label, rel_type), incoming);
                }
            }
        }

        let mut counts = BTreeMap::new();
        for rel_type in &rel_types {
            self.cancel.check()?;
            let count = self.store.count_relationships(None, Some(rel_type), None)?;
            if count > 0 {
                counts.insert(rel_type.clone(), count);
                patterns.insert(type_pattern(rel_type), count);
            }
        }

        tracing::debug!(
            labels = label_stats.len(),
            rel_types = counts.len(),
            "aggregated graph statistics"
        );

        Ok(GraphStats {
            label_count: label_stats.len(),
            rel_type_count: counts.len(),
            property_key_count: self.store.property_keys_in_use()?.len(),
            node_count: self.store.count_nodes(None)?,
            rel_count: self.store.count_relationships(None, None, None)?,
            labels: label_stats,
            rel_types: patterns,
            rel_types_count: counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::graph::{fixtures, MemoryGraph, NodeIter, RelIter};
    use crate::models::*;

    #[test]
    fn test_person_city_scenario() {
        let graph = fixtures::person_city();
        let cancel = CancellationToken::new();
        let stats = StatsAggregator::new(&graph, &cancel).aggregate(None, None).unwrap();

        assert_eq!(stats.labels, LabelStats::from([("City".into(), 5), ("Person".into(), 100)]));
        assert_eq!(stats.rel_types_count, BTreeMap::from([("LIVES_IN".into(), 100)]));
        assert_eq!(stats.rel_types["(:Person)-[:LIVES_IN]->()"], 100);
        assert_eq!(stats.rel_types["()-[:LIVES_IN]->(:City)"], 100);
        assert!(!stats.rel_types.contains_key("()-[:LIVES_IN]->(:Person)"));
        assert_eq!(stats.node_count, 105);
        assert_eq!(stats.rel_count, 100);
    }

    #[test]
    fn test_label_counts_sum_to_node_count_with_single_labels() {
        let graph = fixtures::person_city();
        let cancel = CancellationToken::new();
        let stats = StatsAggregator::new(&graph, &cancel).aggregate(None, None).unwrap();
        assert_eq!(stats.labels.values().sum::<u64>(), stats.node_count);
    }

    #[test]
    fn test_filters_restrict_enumeration() {
        let graph = fixtures::social();
        let cancel = CancellationToken::new();
        let labels = vec!["Dog".to_string(), "Missing".to_string()];
        let types = vec!["OWNS".to_string()];
        let stats = StatsAggregator::new(&graph, &cancel)
            .aggregate(Some(&labels), Some(&types))
            .unwrap();
        assert_eq!(stats.labels.len(), 1);
        assert_eq!(stats.rel_types_count.keys().collect::<Vec<_>>(), vec!["OWNS"]);
        assert_eq!(stats.rel_type_stats().incoming("Dog", "OWNS"), 2);
    }

    /// Store whose counts subsystem is offline.
    struct CountsOffline(MemoryGraph);

    impl GraphStore for CountsOffline {
        fn labels_in_use(&self) -> Result<Vec<String>> {
            self.0.labels_in_use()
        }
        fn relationship_types_in_use(&self) -> Result<Vec<String>> {
            self.0.relationship_types_in_use()
        }
        fn property_keys_in_use(&self) -> Result<Vec<String>> {
            self.0.property_keys_in_use()
        }
        fn count_nodes(&self, label: Option<&str>) -> Result<u64> {
            self.0.count_nodes(label)
        }
        fn count_relationships(
            &self,
            _: Option<&str>,
            _: Option<&str>,
            _: Option<&str>,
        ) -> Result<u64> {
            Err(Error::unavailable("counts store offline"))
        }
        fn nodes_by_label(&self, label: &str) -> Result<NodeIter<'_>> {
            self.0.nodes_by_label(label)
        }
        fn all_nodes(&self) -> Result<NodeIter<'_>> {
            self.0.all_nodes()
        }
        fn all_relationships(&self) -> Result<RelIter<'_>> {
            self.0.all_relationships()
        }
        fn node(&self, id: NodeId) -> Result<Option<&Node>> {
            self.0.node(id)
        }
        fn relationship(&self, id: RelId) -> Result<Option<&Relationship>> {
            self.0.relationship(id)
        }
        fn relationships(
            &self,
            node: NodeId,
            direction: Direction,
            rel_type: Option<&str>,
        ) -> Result<RelIter<'_>> {
            self.0.relationships(node, direction, rel_type)
        }
        fn constraints(
            &self,
            entity: EntityKind,
            name: Option<&str>,
        ) -> Result<Vec<ConstraintDef>> {
            self.0.constraints(entity, name)
        }
        fn indexes(&self, entity: EntityKind, name: Option<&str>) -> Result<Vec<IndexDef>> {
            self.0.indexes(entity, name)
        }
    }

    #[test]
    fn test_missing_counts_are_fatal() {
        let store = CountsOffline(fixtures::social());
        let cancel = CancellationToken::new();
        let err = StatsAggregator::new(&store, &cancel).aggregate(None, None).unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[test]
    fn test_cancelled_aggregation_terminates() {
        let graph = fixtures::social();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = StatsAggregator::new(&graph, &cancel).aggregate(None, None).unwrap_err();
        assert!(err.is_terminated());
    }
}
