use mtree::{
    BalancedPartition, EntryLike, MRadSplit, MTreeEntry, MTreeError, MTreeNode, MaxSpreadSplit,
    Metric, NodeId, NodeKind, PartitionPolicy, SplitStrategy, SplitStrategyKind,
};
use mtree_int_test::test_util::{all_strategies, leaf_node, shuffled, PointMetric};
use std::collections::BTreeSet;

#[ctor::ctor]
fn init() {
    colog::init();
}

type PointStrategy = Box<dyn SplitStrategy<MTreeNode<u32, f64>, PointMetric>>;

fn strategy(kind: SplitStrategyKind) -> PointStrategy {
    kind.build(0.4).unwrap()
}

fn member_set(ids: Vec<u32>) -> BTreeSet<u32> {
    ids.into_iter().collect()
}

#[test]
fn test_partitions_cover_node_exactly_once() {
    for kind in all_strategies() {
        for seed in 0..10 {
            let metric = PointMetric::random(17, 3, seed);
            let node = leaf_node(&metric.ids());

            let assignments = strategy(kind).split(&node, &metric).unwrap();

            let first = member_set(assignments.first().member_ids());
            let second = member_set(assignments.second().member_ids());
            assert!(first.is_disjoint(&second), "{:?} seed {}", kind, seed);
            assert_eq!(first.len() + second.len(), 17);
            assert_eq!(first.union(&second).count(), 17);
            assert!(!assignments.first().is_empty());
            assert!(!assignments.second().is_empty());
            assert!(first.contains(&assignments.first_routing_object_id()));
            assert!(second.contains(&assignments.second_routing_object_id()));
            assert_ne!(
                assignments.first_routing_object_id(),
                assignments.second_routing_object_id()
            );
        }
    }
}

#[test]
fn test_covering_radius_matches_recomputation() {
    for kind in all_strategies() {
        let metric = PointMetric::clustered(24, 3, 5);
        let node = leaf_node(&metric.ids());

        let assignments = strategy(kind).split(&node, &metric).unwrap();

        for partition in [assignments.first(), assignments.second()] {
            let routing = partition.routing_object_id();
            let expected = partition
                .entries()
                .iter()
                .map(|entry| metric.distance(&entry.routing_object_id(), &routing).unwrap())
                .fold(0.0f64, f64::max);
            assert_eq!(partition.covering_radius(), expected, "{:?}", kind);
        }
        assert_eq!(
            assignments.summed_radius(),
            assignments.first_covering_radius() + assignments.second_covering_radius()
        );
    }
}

#[test]
fn test_directory_radius_includes_child_radius() {
    let metric = PointMetric::new(vec![
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![10.0, 0.0],
        vec![11.0, 0.0],
    ]);
    let radii = [0.5, 2.0, 0.25, 3.0];
    let node = MTreeNode::with_entries(
        NodeKind::Directory,
        (0..4u32)
            .map(|id| MTreeEntry::directory(id, radii[id as usize], None, NodeId(id as usize)))
            .collect(),
    );

    let assignments = MRadSplit::new().split(&node, &metric).unwrap();

    for partition in [assignments.first(), assignments.second()] {
        let routing = partition.routing_object_id();
        let expected = partition
            .entries()
            .iter()
            .map(|e| metric.distance(&e.routing_object_id, &routing).unwrap() + e.covering_radius)
            .fold(0.0f64, f64::max);
        assert_eq!(partition.covering_radius(), expected);
        for entry in partition.entries() {
            assert_eq!(entry.child, Some(NodeId(entry.routing_object_id as usize)));
        }
    }
    assert_eq!(assignments.entry_count(), 4);
}

#[test]
fn test_m_rad_is_optimal_over_all_pairs() {
    let policy = BalancedPartition::default();
    for seed in 20..26 {
        let metric = PointMetric::random(11, 4, seed);
        let ids = metric.ids();
        let node = leaf_node(&ids);

        let best = MRadSplit::with_policy(policy).split(&node, &metric).unwrap();

        for (i, &first) in ids.iter().enumerate() {
            for &second in &ids[i + 1..] {
                let other = policy.partition(&node, first, second, &metric).unwrap();
                assert!(best.summed_radius() <= other.summed_radius());
            }
        }
    }
}

#[test]
fn test_strategies_are_deterministic() {
    for kind in all_strategies() {
        let metric = PointMetric::random(30, 2, 3);
        let node = leaf_node(&metric.ids());

        let first = strategy(kind).split(&node, &metric).unwrap();
        let second = strategy(kind).split(&node, &metric).unwrap();
        assert_eq!(first, second, "{:?}", kind);
    }
}

#[test]
fn test_exhaustive_strategies_ignore_entry_order() {
    for kind in [SplitStrategyKind::MRad, SplitStrategyKind::MaxSpread] {
        for seed in 0..5 {
            let metric = PointMetric::random(14, 8, 100 + seed);
            let ids = metric.ids();

            let ordered = strategy(kind).split(&leaf_node(&ids), &metric).unwrap();
            let permuted = strategy(kind)
                .split(&leaf_node(&shuffled(ids, seed)), &metric)
                .unwrap();

            let ordered_sides = BTreeSet::from([
                member_set(ordered.first().member_ids()),
                member_set(ordered.second().member_ids()),
            ]);
            let permuted_sides = BTreeSet::from([
                member_set(permuted.first().member_ids()),
                member_set(permuted.second().member_ids()),
            ]);
            assert_eq!(ordered_sides, permuted_sides, "{:?} seed {}", kind, seed);
            assert_eq!(ordered.summed_radius(), permuted.summed_radius());
        }
    }
}

#[test]
fn test_tied_grid_splits_ignore_entry_order() {
    let metric = PointMetric::new(
        (0..16)
            .map(|i| vec![(i % 4) as f64, (i / 4) as f64])
            .collect(),
    );
    let ids = metric.ids();

    for kind in [SplitStrategyKind::MRad, SplitStrategyKind::MaxSpread] {
        let expected = strategy(kind).split(&leaf_node(&ids), &metric).unwrap();
        let expected_sides = BTreeSet::from([
            member_set(expected.first().member_ids()),
            member_set(expected.second().member_ids()),
        ]);

        for seed in 0..8 {
            let permuted = strategy(kind)
                .split(&leaf_node(&shuffled(ids.clone(), seed)), &metric)
                .unwrap();
            let permuted_sides = BTreeSet::from([
                member_set(permuted.first().member_ids()),
                member_set(permuted.second().member_ids()),
            ]);
            assert_eq!(expected_sides, permuted_sides, "{:?} seed {}", kind, seed);
            assert_eq!(expected.summed_radius(), permuted.summed_radius());
        }
    }
}

#[test]
fn test_sampled_never_beats_exhaustive() {
    for seed in 0..5 {
        let metric = PointMetric::random(40, 3, seed);
        let node = leaf_node(&metric.ids());

        let exhaustive = MRadSplit::new().split(&node, &metric).unwrap();
        for kind in [
            SplitStrategyKind::sampled(),
            SplitStrategyKind::Sampled { samples: 1, seed },
        ] {
            let sampled = strategy(kind).split(&node, &metric).unwrap();
            assert!(exhaustive.summed_radius() <= sampled.summed_radius());
        }
    }
}

#[test]
fn test_max_spread_promotes_farthest_pair() {
    let metric = PointMetric::random(25, 2, 9);
    let ids = metric.ids();
    let node = leaf_node(&ids);

    let assignments = MaxSpreadSplit::new().split(&node, &metric).unwrap();
    let spread = metric
        .distance(
            &assignments.first_routing_object_id(),
            &assignments.second_routing_object_id(),
        )
        .unwrap();

    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            assert!(metric.distance(a, b).unwrap() <= spread);
        }
    }
}

#[test]
fn test_two_entry_node() {
    let metric = PointMetric::random(2, 3, 1);
    for kind in all_strategies() {
        let assignments = strategy(kind).split(&leaf_node(&[0, 1]), &metric).unwrap();
        assert_eq!(assignments.first().member_ids(), vec![0]);
        assert_eq!(assignments.second().member_ids(), vec![1]);
        assert_eq!(assignments.summed_radius(), 0.0);
    }
}

#[test]
fn test_underflow_and_missing_objects() {
    let metric = PointMetric::random(3, 2, 1);
    for kind in all_strategies() {
        let err = strategy(kind).split(&leaf_node(&[2]), &metric).unwrap_err();
        assert_eq!(err, MTreeError::Underflow { entries: 1 });
        assert!(err.is_invariant_violation());

        let err = strategy(kind)
            .split(&leaf_node(&[0, 1, 7]), &metric)
            .unwrap_err();
        assert_eq!(err, MTreeError::NotFound("7".to_string()));
    }
}
