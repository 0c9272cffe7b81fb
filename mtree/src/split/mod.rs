//! Node split strategies.
//!
//! A strategy decides which pairs of entries are tried as routing objects
//! and which [`PartitionPolicy`] distributes the remaining entries. All
//! strategies return the same [`Assignments`](crate::assignments::Assignments)
//! contract, so the tree can hold any of them as a trait object.
//!
//! | Strategy | Candidate pairs | Default policy |
//! |---|---|---|
//! | [`MRadSplit`] | every pair | [`BalancedPartition`] |
//! | [`MaxSpreadSplit`] | the farthest pair | [`HyperplanePartition`] |
//! | [`SampledMRadSplit`] | a seeded random sample of pairs | [`BalancedPartition`] |

mod m_rad;
mod max_spread;
mod sampled;

pub use m_rad::MRadSplit;
pub use max_spread::MaxSpreadSplit;
pub use sampled::SampledMRadSplit;

use crate::assignments::NodeAssignments;
use crate::constants::{DEFAULT_SPLIT_SAMPLES, DEFAULT_SPLIT_SEED};
use crate::distance::Metric;
use crate::entry::EntryLike;
use crate::errors::{MTreeError, MTreeResult};
use crate::node::NodeLike;
use crate::partition::{BalancedPartition, HyperplanePartition, PartitionPolicy};
use serde::{Deserialize, Serialize};

/// Splits an overflowing node into two partitions.
pub trait SplitStrategy<N, M>: Send + Sync
where
    N: NodeLike,
    M: Metric<N::Key, Distance = N::Distance>,
{
    /// Chooses two routing objects and partitions the node between them.
    ///
    /// The call only reads `node`; the caller builds the new nodes from the
    /// returned assignments.
    ///
    /// # Errors
    ///
    /// Returns [`MTreeError::Underflow`] if the node has fewer than 2
    /// entries, and propagates partition and metric errors unchanged.
    fn split(&self, node: &N, metric: &M) -> MTreeResult<NodeAssignments<N>>;

    fn name(&self) -> &'static str;
}

/// Split strategy selection, as stored in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplitStrategyKind {
    /// Exhaustive pairwise minimization of the summed covering radius
    MRad,
    /// Farthest pair with hyperplane assignment
    MaxSpread,
    /// Summed radius minimization over a sample of pairs
    Sampled { samples: usize, seed: u64 },
}

impl Default for SplitStrategyKind {
    fn default() -> Self {
        SplitStrategyKind::MRad
    }
}

impl SplitStrategyKind {
    /// Sampled strategy with default sample count and seed.
    pub fn sampled() -> Self {
        SplitStrategyKind::Sampled {
            samples: DEFAULT_SPLIT_SAMPLES,
            seed: DEFAULT_SPLIT_SEED,
        }
    }

    /// Builds the strategy. `min_fill` configures the balanced policy of the
    /// strategies that use one.
    ///
    /// # Errors
    ///
    /// Returns [`MTreeError::InvalidConfig`] for an invalid `min_fill` or a
    /// zero sample count.
    pub fn build<N, M>(&self, min_fill: f64) -> MTreeResult<Box<dyn SplitStrategy<N, M>>>
    where
        N: NodeLike,
        M: Metric<N::Key, Distance = N::Distance>,
    {
        let balanced = BalancedPartition::new(min_fill)?;
        Ok(match *self {
            SplitStrategyKind::MRad => Box::new(MRadSplit::with_policy(balanced)),
            SplitStrategyKind::MaxSpread => Box::new(MaxSpreadSplit::with_policy(HyperplanePartition)),
            SplitStrategyKind::Sampled { samples, seed } => {
                Box::new(SampledMRadSplit::with_policy(samples, seed, balanced)?)
            }
        })
    }
}

fn ensure_splittable<N: NodeLike>(node: &N) -> MTreeResult<()> {
    let entries = node.entry_count();
    if entries < 2 {
        log::error!("Split requested on a node with {} entries", entries);
        return Err(MTreeError::Underflow { entries });
    }
    Ok(())
}

/// Partitions the node for every `(i, j)` index pair and keeps the
/// assignment with the smallest summed covering radius.
///
/// Equal sums keep the pair whose ordered routing keys come first, so the
/// result does not depend on where the entries sit in the node. For a node
/// stored in key order this is the first pair in `(i, j)` order.
///
/// The first pair is always accepted, so a non-empty pair list yields a
/// result even when every sum equals the infinite sentinel.
fn min_summed_radius<N, M, P, I>(
    node: &N,
    metric: &M,
    policy: &P,
    pairs: I,
) -> MTreeResult<NodeAssignments<N>>
where
    N: NodeLike,
    M: Metric<N::Key, Distance = N::Distance>,
    P: PartitionPolicy<N, M>,
    I: IntoIterator<Item = (usize, usize)>,
{
    let mut best_sum = metric.infinite_distance();
    let mut best: Option<(NodeAssignments<N>, (N::Key, N::Key))> = None;

    for (i, j) in pairs {
        let first = node.entry_at(i).routing_object_id();
        let second = node.entry_at(j).routing_object_id();
        let current = policy.partition(node, first, second, metric)?;

        let sum = current.summed_radius();
        let keys = ordered_keys(first, second);
        log::trace!("Routing pair ({:?}, {:?}) has summed radius {:?}", first, second, sum);
        let better = match &best {
            None => true,
            Some((_, best_keys)) => sum < best_sum || (sum == best_sum && keys < *best_keys),
        };
        if better {
            best_sum = sum;
            best = Some((current, keys));
        }
    }

    best.map(|(assignments, _)| assignments)
        .ok_or(MTreeError::Underflow {
            entries: node.entry_count(),
        })
}

/// An unordered routing pair as `(smaller, larger)` key.
fn ordered_keys<K: Ord>(first: K, second: K) -> (K, K) {
    if second < first {
        (second, first)
    } else {
        (first, second)
    }
}

/// All `(i, j)` index pairs with `i < j`, in lexicographic order.
fn all_pairs(entry_count: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..entry_count).flat_map(move |i| (i + 1..entry_count).map(move |j| (i, j)))
}
