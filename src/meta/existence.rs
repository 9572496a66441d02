use super::rel_cap;
use crate::error::Result;
use crate::graph::GraphStore;
use crate::models::Direction;
use crate::utils::CancellationToken;

/// Looks for one concrete `(from)-[rel_type]-(to)` relationship, walking
/// `from_label` nodes with stride `max(sample, 1)` and at most `max_rels`
/// relationships per node.
///
/// Unlike [`SampleSelector`](super::SampleSelector), a non-positive `sample`
/// here checks every node. `false` only means the sampled scan found nothing.
#[allow(clippy::too_many_arguments)]
pub fn relationship_exists<S: GraphStore + ?Sized>(
    store: &S,
    from_label: &str,
    to_label: &str,
    rel_type: &str,
    direction: Direction,
    sample: i64,
    max_rels: i64,
    cancel: &CancellationToken,
) -> Result<bool> {
    let stride = sample.max(1) as usize;
    let cap = rel_cap(max_rels).unwrap_or(usize::MAX);
    for node in store.nodes_by_label(from_label)?.step_by(stride) {
        cancel.check()?;
        for rel in store
            .relationships(node.id, direction, Some(rel_type))?
            .take(cap)
        {
            let Some(other_id) = rel.other_node(node.id) else {
                continue;
            };
            if let Some(other) = store.node(other_id)? {
                if other.has_label(to_label) {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures;

    #[test]
    fn test_finds_existing_pattern_in_both_directions() {
        let graph = fixtures::social();
        let cancel = CancellationToken::new();
        assert!(relationship_exists(
            &graph,
            "Person",
            "City",
            "LIVES_IN",
            Direction::Outgoing,
            -1,
            -1,
            &cancel,
        )
        .unwrap());
        assert!(relationship_exists(
            &graph,
            "City",
            "Person",
            "LIVES_IN",
            Direction::Incoming,
            -1,
            -1,
            &cancel,
        )
        .unwrap());
        assert!(!relationship_exists(
            &graph,
            "Dog",
            "Person",
            "OWNS",
            Direction::Outgoing,
            -1,
            -1,
            &cancel,
        )
        .unwrap());
    }

    #[test]
    fn test_stride_can_miss_rare_patterns() {
        let graph = fixtures::chain(10);
        let cancel = CancellationToken::new();
        // the last item has no NEXT, every other one does
        assert!(relationship_exists(
            &graph,
            "Item",
            "Item",
            "NEXT",
            Direction::Outgoing,
            0,
            1,
            &cancel,
        )
        .unwrap());
        let mut lonely = crate::graph::MemoryGraph::new();
        let a = lonely.create_node(&["A"], Default::default());
        lonely.create_node(&["A"], Default::default());
        let b = lonely.create_node(&["B"], Default::default());
        lonely
            .create_relationship(a, b, "T", Default::default())
            .unwrap();
        // stride 2 visits the first A, which is the connected one
        assert!(relationship_exists(
            &lonely,
            "A",
            "B",
            "T",
            Direction::Outgoing,
            2,
            -1,
            &cancel,
        )
        .unwrap());
        let mut hidden = crate::graph::MemoryGraph::new();
        hidden.create_node(&["A"], Default::default());
        let c = hidden.create_node(&["A"], Default::default());
        let d = hidden.create_node(&["B"], Default::default());
        hidden
            .create_relationship(c, d, "T", Default::default())
            .unwrap();
        assert!(!relationship_exists(
            &hidden,
            "A",
            "B",
            "T",
            Direction::Outgoing,
            2,
            -1,
            &cancel,
        )
        .unwrap());
    }
}
