use super::{all_pairs, ensure_splittable, ordered_keys, SplitStrategy};
use crate::assignments::NodeAssignments;
use crate::distance::Metric;
use crate::entry::EntryLike;
use crate::errors::{MTreeError, MTreeResult};
use crate::node::NodeLike;
use crate::partition::{HyperplanePartition, PartitionPolicy};

/// Promotes the two mutually farthest routing objects and partitions once.
///
/// This is the generalized-hyperplane heuristic: O(n²) distance
/// computations and a single partition, instead of one partition per pair.
/// Among equally distant pairs the one with the smallest ordered keys wins,
/// whatever the entry order of the node.
#[derive(Debug, Clone)]
pub struct MaxSpreadSplit<P = HyperplanePartition> {
    policy: P,
}

impl MaxSpreadSplit {
    pub fn new() -> Self {
        Self::with_policy(HyperplanePartition)
    }
}

impl Default for MaxSpreadSplit {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> MaxSpreadSplit<P> {
    pub fn with_policy(policy: P) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }
}

impl<N, M, P> SplitStrategy<N, M> for MaxSpreadSplit<P>
where
    N: NodeLike,
    M: Metric<N::Key, Distance = N::Distance>,
    P: PartitionPolicy<N, M>,
{
    fn split(&self, node: &N, metric: &M) -> MTreeResult<NodeAssignments<N>> {
        ensure_splittable(node)?;

        let mut farthest: Option<(N::Key, N::Key, N::Distance)> = None;
        for (i, j) in all_pairs(node.entry_count()) {
            let first = node.entry_at(i).routing_object_id();
            let second = node.entry_at(j).routing_object_id();
            let distance = metric.distance(&first, &second)?;
            let wider = match &farthest {
                None => true,
                Some((best_first, best_second, best)) => {
                    distance > *best
                        || (distance == *best
                            && ordered_keys(first, second)
                                < ordered_keys(*best_first, *best_second))
                }
            };
            if wider {
                farthest = Some((first, second, distance));
            }
        }

        let (first, second, spread) = farthest.ok_or(MTreeError::Underflow {
            entries: node.entry_count(),
        })?;
        let assignments = self.policy.partition(node, first, second, metric)?;

        log::debug!(
            "Max spread split of {} entries promoted {:?} and {:?} (spread {:?})",
            node.entry_count(),
            first,
            second,
            spread
        );
        Ok(assignments)
    }

    fn name(&self) -> &'static str {
        "max_spread"
    }
}
