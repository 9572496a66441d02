use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::existence::relationship_exists;
use super::stats::StatsAggregator;
use super::{DEFAULT_MAX_RELS, DEFAULT_SAMPLE};
use crate::error::{Error, Result};
use crate::graph::GraphStore;
use crate::models::{Direction, VirtualEdge, VirtualId, VirtualNode};
use crate::utils::CancellationToken;

/// Which side of an ambiguous candidate the existence check scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanPolicy {
    /// Scan from the side with the lower relationships-per-node ratio; ties
    /// scan from the start label.
    #[default]
    LowerDegreeRatio,
    /// Always scan the start label's nodes.
    FromSide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetaGraphConfig {
    pub labels: Option<Vec<String>>,
    pub rel_types: Option<Vec<String>>,
    pub prune: bool,
    pub sample: i64,
    pub max_rels: i64,
    pub policy: ScanPolicy,
}

impl Default for MetaGraphConfig {
    fn default() -> Self {
        Self {
            labels: None,
            rel_types: None,
            prune: false,
            sample: DEFAULT_SAMPLE,
            max_rels: DEFAULT_MAX_RELS,
            policy: ScanPolicy::default(),
        }
    }
}

impl MetaGraphConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_rels < -1 {
            return Err(Error::malformed(format!(
                "maxRels must be -1 or non-negative, got {}",
                self.max_rels
            )));
        }
        Ok(())
    }
}

/// Labels as virtual nodes and label-to-label type patterns as virtual edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetaGraph {
    pub nodes: Vec<VirtualNode>,
    pub edges: Vec<VirtualEdge>,
}

impl MetaGraph {
    pub fn edge(&self, start: &str, rel_type: &str, end: &str) -> Option<&VirtualEdge> {
        self.edges
            .iter()
            .find(|e| e.start_label == start && e.rel_type == rel_type && e.end_label == end)
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    start: String,
    end: String,
    rel_type: String,
    out: u64,
    incoming: u64,
    count: u64,
}

pub struct MetaGraphBuilder<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    cancel: &'a CancellationToken,
}

impl<'a, S: GraphStore + ?Sized> MetaGraphBuilder<'a, S> {
    pub fn new(store: &'a S, cancel: &'a CancellationToken) -> Self {
        Self { store, cancel }
    }

    pub fn build(&self, config: &MetaGraphConfig) -> Result<MetaGraph> {
        config.validate()?;
        let stats = StatsAggregator::new(self.store, self.cancel)
            .aggregate(config.labels.as_deref(), config.rel_types.as_deref())?;
        let rel_stats = stats.rel_type_stats();

        let ids: BTreeMap<&str, VirtualId> = stats
            .labels
            .keys()
            .enumerate()
            .map(|(n, label)| (label.as_str(), VirtualId::nth(n)))
            .collect();
        let nodes: Vec<VirtualNode> = stats
            .labels
            .iter()
            .map(|(label, count)| VirtualNode {
                id: ids[label.as_str()],
                label: label.clone(),
                count: *count,
            })
            .collect();

        let mut candidates = Vec::new();
        for (rel_type, count) in &rel_stats.counts {
            for start in stats.labels.keys() {
                let out = rel_stats.outgoing(start, rel_type);
                if out == 0 {
                    continue;
                }
                for end in stats.labels.keys() {
                    let incoming = rel_stats.incoming(end, rel_type);
                    if incoming > 0 {
                        candidates.push(Candidate {
                            start: start.clone(),
                            end: end.clone(),
                            rel_type: rel_type.clone(),
                            out,
                            incoming,
                            count: *count,
                        });
                    }
                }
            }
        }

        if config.prune {
            candidates = self.prune(candidates, &stats.labels, config)?;
        }

        let edges = candidates
            .into_iter()
            .enumerate()
            .map(|(n, c)| VirtualEdge {
                id: VirtualId::nth(nodes.len() + n),
                start: ids[c.start.as_str()],
                end: ids[c.end.as_str()],
                start_label: c.start,
                end_label: c.end,
                rel_type: c.rel_type,
                out: c.out,
                incoming: c.incoming,
                count: c.count,
            })
            .collect();

        Ok(MetaGraph { nodes, edges })
    }

    /// Checks candidates whose (start, type) or (type, end) projection is
    /// shared with another candidate; unambiguous ones are kept untouched.
    fn prune(
        &self,
        candidates: Vec<Candidate>,
        label_counts: &BTreeMap<String, u64>,
        config: &MetaGraphConfig,
    ) -> Result<Vec<Candidate>> {
        let mut from_groups: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        let mut to_groups: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        for c in &candidates {
            *from_groups
                .entry((c.start.as_str(), c.rel_type.as_str()))
                .or_default() += 1;
            *to_groups
                .entry((c.rel_type.as_str(), c.end.as_str()))
                .or_default() += 1;
        }
        let ambiguous: Vec<bool> = candidates
            .iter()
            .map(|c| {
                from_groups[&(c.start.as_str(), c.rel_type.as_str())] > 1
                    || to_groups[&(c.rel_type.as_str(), c.end.as_str())] > 1
            })
            .collect();

        let mut kept = Vec::with_capacity(candidates.len());
        for (candidate, ambiguous) in candidates.into_iter().zip(ambiguous) {
            if !ambiguous || self.confirmed(&candidate, label_counts, config)? {
                kept.push(candidate);
            } else {
                tracing::debug!(
                    start = %candidate.start,
                    rel_type = %candidate.rel_type,
                    end = %candidate.end,
                    "pruned unconfirmed pattern"
                );
            }
        }
        Ok(kept)
    }

    fn confirmed(
        &self,
        c: &Candidate,
        label_counts: &BTreeMap<String, u64>,
        config: &MetaGraphConfig,
    ) -> Result<bool> {
        let from_side = match config.policy {
            ScanPolicy::FromSide => true,
            ScanPolicy::LowerDegreeRatio => {
                let ratio = |n: u64, label: &str| {
                    n as f64 / label_counts.get(label).copied().unwrap_or(1).max(1) as f64
                };
                ratio(c.out, &c.start) <= ratio(c.incoming, &c.end)
            }
        };
        let (scan, target, direction) = if from_side {
            (&c.start, &c.end, Direction::Outgoing)
        } else {
            (&c.end, &c.start, Direction::Incoming)
        };
        relationship_exists(
            self.store,
            scan,
            target,
            &c.rel_type,
            direction,
            config.sample,
            config.max_rels,
            self.cancel,
        )
    }
}
