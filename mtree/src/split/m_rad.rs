use super::{all_pairs, ensure_splittable, min_summed_radius, SplitStrategy};
use crate::assignments::NodeAssignments;
use crate::distance::Metric;
use crate::errors::MTreeResult;
use crate::node::NodeLike;
use crate::partition::{BalancedPartition, PartitionPolicy};

/// The m_RAD split of Ciaccia, Patella and Zezula (VLDB'97).
///
/// Every pair of entries is tried as routing objects. The pair whose
/// partition has the smallest sum of covering radii is promoted. Ties keep
/// the pair with the smallest ordered routing keys, so permuting the
/// entries of a node does not change the split.
///
/// Costs O(n²) partitions of O(n) distance computations each, which is
/// affordable for the bounded fanout of a node.
///
/// # Examples
///
/// ```rust
/// use mtree::distance::FnMetric;
/// use mtree::entry::MTreeEntry;
/// use mtree::node::{MTreeNode, NodeKind};
/// use mtree::split::{MRadSplit, SplitStrategy};
///
/// let values = [0.0f64, 1.0, 10.0, 11.0];
/// let metric = FnMetric::new(move |a: &usize, b: &usize| (values[*a] - values[*b]).abs());
/// let node = MTreeNode::with_entries(
///     NodeKind::Leaf,
///     (0..4).map(|id| MTreeEntry::leaf(id, None)).collect(),
/// );
///
/// let assignments = MRadSplit::new().split(&node, &metric).unwrap();
/// assert_eq!(assignments.first_routing_object_id(), 0);
/// assert_eq!(assignments.second_routing_object_id(), 2);
/// assert_eq!(assignments.summed_radius(), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct MRadSplit<P = BalancedPartition> {
    policy: P,
}

impl MRadSplit {
    /// m_RAD with the default balanced partition.
    pub fn new() -> Self {
        Self::with_policy(BalancedPartition::default())
    }
}

impl Default for MRadSplit {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> MRadSplit<P> {
    pub fn with_policy(policy: P) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }
}

impl<N, M, P> SplitStrategy<N, M> for MRadSplit<P>
where
    N: NodeLike,
    M: Metric<N::Key, Distance = N::Distance>,
    P: PartitionPolicy<N, M>,
{
    fn split(&self, node: &N, metric: &M) -> MTreeResult<NodeAssignments<N>> {
        ensure_splittable(node)?;
        let assignments =
            min_summed_radius(node, metric, &self.policy, all_pairs(node.entry_count()))?;

        log::debug!(
            "m_RAD split of {} entries promoted {:?} and {:?} (summed radius {:?})",
            node.entry_count(),
            assignments.first_routing_object_id(),
            assignments.second_routing_object_id(),
            assignments.summed_radius()
        );
        Ok(assignments)
    }

    fn name(&self) -> &'static str {
        "m_rad"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{FnMetric, ObjectStore};
    use crate::entry::EntryLike;
    use crate::errors::MTreeError;
    use crate::node::MTreeNode;
    use crate::partition::HyperplanePartition;
    use crate::test_support::{
        leaf_node, leaf_node_with, line_metric, random_points, vector_metric,
    };
    use std::collections::BTreeSet;

    #[test]
    fn test_four_points_on_a_line() {
        let node = leaf_node(4);
        let metric = line_metric(vec![0.0, 1.0, 10.0, 11.0]);

        let assignments = MRadSplit::new().split(&node, &metric).unwrap();

        assert_eq!(assignments.first_routing_object_id(), 0);
        assert_eq!(assignments.second_routing_object_id(), 2);
        assert_eq!(assignments.first().member_ids(), vec![0, 1]);
        assert_eq!(assignments.second().member_ids(), vec![2, 3]);
        assert_eq!(assignments.first_covering_radius(), 1.0);
        assert_eq!(assignments.second_covering_radius(), 1.0);
        assert_eq!(assignments.summed_radius(), 2.0);
    }

    #[test]
    fn test_cross_pairing_is_worse() {
        let node = leaf_node(4);
        let metric = line_metric(vec![0.0, 1.0, 10.0, 11.0]);
        let policy = BalancedPartition::default();

        let cross = policy.partition(&node, 0, 1, &metric).unwrap();
        assert_eq!(cross.first().member_ids(), vec![0, 2]);
        assert_eq!(cross.second().member_ids(), vec![1, 3]);
        assert_eq!(cross.summed_radius(), 20.0);

        let best = MRadSplit::with_policy(policy).split(&node, &metric).unwrap();
        assert!(best.summed_radius() < cross.summed_radius());
    }

    #[test]
    fn test_two_entries() {
        let node = leaf_node(2);
        let metric = line_metric(vec![3.0, 8.0]);

        let assignments = MRadSplit::new().split(&node, &metric).unwrap();

        assert_eq!(assignments.first().member_ids(), vec![0]);
        assert_eq!(assignments.second().member_ids(), vec![1]);
        assert_eq!(assignments.first_covering_radius(), 0.0);
        assert_eq!(assignments.second_covering_radius(), 0.0);
    }

    #[test]
    fn test_single_entry_underflows() {
        let node = leaf_node(1);
        let metric = line_metric(vec![0.0]);
        let err = MRadSplit::new().split(&node, &metric).unwrap_err();
        assert_eq!(err, MTreeError::Underflow { entries: 1 });
    }

    #[test]
    fn test_empty_node_underflows() {
        let node = leaf_node(0);
        let metric = line_metric(vec![]);
        let err = MRadSplit::new().split(&node, &metric).unwrap_err();
        assert_eq!(err, MTreeError::Underflow { entries: 0 });
    }

    #[test]
    fn test_optimal_over_all_pairs() {
        for seed in 0..5 {
            let points = random_points(12, 3, seed);
            let metric = vector_metric(points);
            let node = leaf_node(12);
            let policy = BalancedPartition::default();

            let best = MRadSplit::with_policy(policy).split(&node, &metric).unwrap();

            for i in 0..12u32 {
                for j in (i + 1)..12u32 {
                    let other = policy.partition(&node, i, j, &metric).unwrap();
                    assert!(best.summed_radius() <= other.summed_radius());
                }
            }
        }
    }

    #[test]
    fn test_partitions_are_exhaustive_and_disjoint() {
        let metric = vector_metric(random_points(17, 4, 11));
        let node = leaf_node(17);

        let assignments = MRadSplit::new().split(&node, &metric).unwrap();

        let first: BTreeSet<u32> = assignments.first().member_ids().into_iter().collect();
        let second: BTreeSet<u32> = assignments.second().member_ids().into_iter().collect();
        assert_eq!(first.len() + second.len(), 17);
        assert!(first.is_disjoint(&second));
        let union: BTreeSet<u32> = first.union(&second).copied().collect();
        assert_eq!(union, (0..17).collect());
        assert!(first.contains(&assignments.first_routing_object_id()));
        assert!(second.contains(&assignments.second_routing_object_id()));
    }

    #[test]
    fn test_radii_match_oracle() {
        let metric = vector_metric(random_points(15, 2, 5));
        let node = leaf_node(15);

        let assignments = MRadSplit::new().split(&node, &metric).unwrap();

        for partition in [assignments.first(), assignments.second()] {
            let routing = partition.routing_object_id();
            let oracle = partition
                .entries()
                .iter()
                .map(|e| metric.distance(&routing, &e.routing_object_id()).unwrap())
                .fold(0.0f64, f64::max);
            assert_eq!(partition.covering_radius(), oracle);
        }
    }

    #[test]
    fn test_deterministic() {
        let metric = vector_metric(random_points(16, 3, 9));
        let node = leaf_node(16);
        let strategy = MRadSplit::new();

        let first = strategy.split(&node, &metric).unwrap();
        let second = strategy.split(&node, &metric).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_respects_minimum_occupancy() {
        let metric = vector_metric(random_points(16, 2, 21));
        let node = leaf_node(16);
        let policy = BalancedPartition::new(0.4).unwrap();

        let assignments = MRadSplit::with_policy(policy).split(&node, &metric).unwrap();
        let floor = policy.min_occupancy(16);
        assert!(assignments.first().len() >= floor);
        assert!(assignments.second().len() >= floor);
    }

    #[test]
    fn test_with_hyperplane_policy() {
        let node = leaf_node(5);
        let metric = line_metric(vec![0.0, 1.0, 2.0, 3.0, 100.0]);

        let assignments = MRadSplit::with_policy(HyperplanePartition)
            .split(&node, &metric)
            .unwrap();
        assert_eq!(assignments.summed_radius(), 2.0);
        assert_eq!(assignments.second().member_ids(), vec![4]);
    }

    #[test]
    fn test_integer_distances() {
        let values = [0u32, 4, 5, 40, 41, 45];
        let metric = FnMetric::new(move |a: &u32, b: &u32| {
            values[*a as usize].abs_diff(values[*b as usize])
        });
        let node: MTreeNode<u32, u32> = MTreeNode::with_entries(
            crate::node::NodeKind::Leaf,
            (0..6).map(|id| crate::entry::MTreeEntry::leaf(id, None)).collect(),
        );

        let assignments = MRadSplit::new().split(&node, &metric).unwrap();
        assert_eq!(assignments.first().member_ids(), vec![0, 1, 2]);
        assert_eq!(assignments.second().member_ids(), vec![3, 4, 5]);
        assert_eq!(assignments.first_routing_object_id(), 1);
        assert_eq!(assignments.second_routing_object_id(), 4);
        assert_eq!(assignments.summed_radius(), 8);
    }

    #[test]
    fn test_infinite_distances_still_split() {
        let metric = FnMetric::new(|a: &u32, b: &u32| if a == b { 0.0 } else { f64::INFINITY });
        let node = leaf_node(3);

        let assignments = MRadSplit::new().split(&node, &metric).unwrap();
        assert_eq!(assignments.first_routing_object_id(), 0);
        assert_eq!(assignments.second_routing_object_id(), 1);
        assert_eq!(assignments.entry_count(), 3);
    }

    #[test]
    fn test_not_found_propagates() {
        let store = ObjectStore::new(|a: &f64, b: &f64| (a - b).abs());
        store.insert(0u32, 0.0);
        store.insert(2u32, 2.0);
        let node = leaf_node(3);

        let err = MRadSplit::new().split(&node, &store).unwrap_err();
        assert_eq!(err, MTreeError::NotFound("1".to_string()));
    }

    #[test]
    fn test_tied_pairs_ignore_entry_order() {
        let metric = line_metric(vec![0.0, 1.0, 2.0]);

        for ids in [[0, 1, 2], [2, 1, 0], [1, 2, 0]] {
            let assignments = MRadSplit::new()
                .split(&leaf_node_with(&ids), &metric)
                .unwrap();
            let sides: BTreeSet<BTreeSet<u32>> = [assignments.first(), assignments.second()]
                .into_iter()
                .map(|p| p.member_ids().into_iter().collect())
                .collect();
            assert_eq!(
                sides,
                BTreeSet::from([BTreeSet::from([0]), BTreeSet::from([1, 2])]),
                "{:?}",
                ids
            );
            assert_eq!(assignments.summed_radius(), 1.0);
        }
    }
}
