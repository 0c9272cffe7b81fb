use super::{all_pairs, ensure_splittable, min_summed_radius, SplitStrategy};
use crate::assignments::NodeAssignments;
use crate::constants::{DEFAULT_SPLIT_SAMPLES, DEFAULT_SPLIT_SEED};
use crate::distance::Metric;
use crate::errors::{MTreeError, MTreeResult};
use crate::node::NodeLike;
use crate::partition::{BalancedPartition, PartitionPolicy};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// m_RAD over a random sample of candidate pairs.
///
/// Each call draws `samples` distinct pairs from a generator seeded with
/// `seed`, so the same node always yields the same split. Sampled pairs are
/// compared with the m_RAD objective and tie-break. Nodes
/// with no more pairs than `samples` are searched exhaustively.
#[derive(Debug, Clone)]
pub struct SampledMRadSplit<P = BalancedPartition> {
    samples: usize,
    seed: u64,
    policy: P,
}

impl SampledMRadSplit {
    /// Sampled m_RAD with default sample count, seed and balanced policy.
    pub fn new() -> Self {
        Self {
            samples: DEFAULT_SPLIT_SAMPLES,
            seed: DEFAULT_SPLIT_SEED,
            policy: BalancedPartition::default(),
        }
    }
}

impl Default for SampledMRadSplit {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> SampledMRadSplit<P> {
    /// # Errors
    ///
    /// Returns [`MTreeError::InvalidConfig`] if `samples` is zero.
    pub fn with_policy(samples: usize, seed: u64, policy: P) -> MTreeResult<Self> {
        if samples == 0 {
            log::error!("Sampled split needs at least one sample");
            return Err(MTreeError::InvalidConfig(
                "split sample count must be at least 1".into(),
            ));
        }
        Ok(Self {
            samples,
            seed,
            policy,
        })
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Candidate `(i, j)` pairs for a node of `entry_count` entries, in
    /// lexicographic order.
    fn candidate_pairs(&self, entry_count: usize) -> Vec<(usize, usize)> {
        let total = entry_count * entry_count.saturating_sub(1) / 2;
        if total <= self.samples {
            return all_pairs(entry_count).collect();
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut picked = rand::seq::index::sample(&mut rng, total, self.samples).into_vec();
        picked.sort_unstable();
        picked
            .into_iter()
            .map(|rank| pair_at(rank, entry_count))
            .collect()
    }
}

/// The `rank`-th pair of `all_pairs(entry_count)`.
fn pair_at(mut rank: usize, entry_count: usize) -> (usize, usize) {
    let mut i = 0;
    while rank >= entry_count - 1 - i {
        rank -= entry_count - 1 - i;
        i += 1;
    }
    (i, i + 1 + rank)
}

impl<N, M, P> SplitStrategy<N, M> for SampledMRadSplit<P>
where
    N: NodeLike,
    M: Metric<N::Key, Distance = N::Distance>,
    P: PartitionPolicy<N, M>,
{
    fn split(&self, node: &N, metric: &M) -> MTreeResult<NodeAssignments<N>> {
        ensure_splittable(node)?;
        let pairs = self.candidate_pairs(node.entry_count());
        let evaluated = pairs.len();
        let assignments = min_summed_radius(node, metric, &self.policy, pairs)?;

        log::debug!(
            "Sampled m_RAD split of {} entries ({} pairs) promoted {:?} and {:?} (summed radius {:?})",
            node.entry_count(),
            evaluated,
            assignments.first_routing_object_id(),
            assignments.second_routing_object_id(),
            assignments.summed_radius()
        );
        Ok(assignments)
    }

    fn name(&self) -> &'static str {
        "sampled_m_rad"
    }
}
