//! Schema profiling: label and type statistics, sampled property metadata
//! and the meta-graph of label patterns.

pub mod collector;
pub mod existence;
pub mod graph;
pub mod render;
pub mod sample;
pub mod stats;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

pub use collector::{MetaData, MetaDataBuilder, MetaItemCollector};
pub use graph::{MetaGraph, MetaGraphBuilder, MetaGraphConfig, ScanPolicy};
pub use render::MetaRow;
pub use sample::{SampleSelector, SampleStride};
pub use stats::{GraphStats, LabelStats, RelTypeStats, StatsAggregator};

pub const DEFAULT_SAMPLE: i64 = 1000;
pub const DEFAULT_MAX_RELS: i64 = 100;

/// Sampling and filtering options shared by the metadata operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaConfig {
    /// Target sample per label, -1 visits every node
    pub sample: i64,
    /// Relationships traversed per node and type, -1 for no cap
    pub max_rels: i64,
    pub include_labels: BTreeSet<String>,
    pub exclude_labels: BTreeSet<String>,
    pub include_rels: BTreeSet<String>,
    pub exclude_rels: BTreeSet<String>,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            sample: DEFAULT_SAMPLE,
            max_rels: DEFAULT_MAX_RELS,
            include_labels: BTreeSet::new(),
            exclude_labels: BTreeSet::new(),
            include_rels: BTreeSet::new(),
            exclude_rels: BTreeSet::new(),
        }
    }
}

impl MetaConfig {
    pub fn label_allowed(&self, label: &str) -> bool {
        (self.include_labels.is_empty() || self.include_labels.contains(label))
            && !self.exclude_labels.contains(label)
    }

    pub fn rel_allowed(&self, rel_type: &str) -> bool {
        (self.include_rels.is_empty() || self.include_rels.contains(rel_type))
            && !self.exclude_rels.contains(rel_type)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rels < -1 {
            return Err(Error::malformed(format!(
                "maxRels must be -1 or non-negative, got {}",
                self.max_rels
            )));
        }
        if let Some(label) = self.include_labels.intersection(&self.exclude_labels).next() {
            return Err(Error::malformed(format!(
                "label '{label}' is both included and excluded"
            )));
        }
        if let Some(rel) = self.include_rels.intersection(&self.exclude_rels).next() {
            return Err(Error::malformed(format!(
                "relationship type '{rel}' is both included and excluded"
            )));
        }
        Ok(())
    }
}

/// Per-node relationship traversal cap: `None` when unlimited, at least one
/// relationship otherwise.
pub(crate) fn rel_cap(max_rels: i64) -> Option<usize> {
    if max_rels < 0 {
        None
    } else {
        Some(max_rels.max(1) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters() {
        let config = MetaConfig {
            include_labels: ["Person".to_string()].into(),
            exclude_rels: ["KNOWS".to_string()].into(),
            ..MetaConfig::default()
        };
        assert!(config.label_allowed("Person"));
        assert!(!config.label_allowed("Dog"));
        assert!(config.rel_allowed("OWNS"));
        assert!(!config.rel_allowed("KNOWS"));
    }

    #[test]
    fn test_validate_rejects_overlap_and_bad_caps() {
        let overlap = MetaConfig {
            include_labels: ["A".to_string()].into(),
            exclude_labels: ["A".to_string()].into(),
            ..MetaConfig::default()
        };
        assert!(overlap.validate().is_err());
        let bad_cap = MetaConfig {
            max_rels: -5,
            ..MetaConfig::default()
        };
        assert!(bad_cap.validate().is_err());
        assert!(MetaConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rel_cap() {
        assert_eq!(rel_cap(-1), None);
        assert_eq!(rel_cap(0), Some(1));
        assert_eq!(rel_cap(100), Some(100));
    }

    #[test]
    fn test_config_from_camel_case_json() {
        let raw = r#"{"sample": -1, "maxRels": 5, "excludeLabels": ["Tmp"]}"#;
        let config: MetaConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.sample, -1);
        assert_eq!(config.max_rels, 5);
        assert!(!config.label_allowed("Tmp"));
    }
}
