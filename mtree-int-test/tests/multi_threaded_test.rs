use mtree::{MTree, MTreeConfig, SplitStrategyKind};
use mtree_int_test::test_util::{brute_force_knn, PointMetric};
use std::sync::{Arc, Barrier};
use std::thread;

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_concurrent_readers() {
    let metric = PointMetric::random(500, 3, 12);
    let ids = metric.ids();
    let tree = Arc::new(MTree::new(metric.clone(), MTreeConfig::new().with_node_capacity(6)).unwrap());
    for &id in &ids {
        tree.insert(id).unwrap();
    }

    let num_threads = 6;
    let barrier = Arc::new(Barrier::new(num_threads));
    let mut handles = vec![];

    for thread_id in 0..num_threads {
        let tree = Arc::clone(&tree);
        let barrier = Arc::clone(&barrier);
        let metric = metric.clone();
        let ids = ids.clone();

        handles.push(thread::spawn(move || {
            barrier.wait();
            for round in 0..20u32 {
                let query = (thread_id as u32 * 37 + round * 11) % 500;
                let found = tree.knn_search(&query, 8).unwrap();
                assert_eq!(found, brute_force_knn(&metric, &ids, query, 8));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(tree.check_integrity().unwrap().is_valid);
}

#[test]
fn test_readers_alongside_writers() {
    let metric = PointMetric::random(800, 2, 13);
    let config = MTreeConfig::new()
        .with_node_capacity(5)
        .with_split_strategy(SplitStrategyKind::sampled());
    let tree = Arc::new(MTree::new(metric.clone(), config).unwrap());

    let writers = 4;
    let per_writer = 200;
    let barrier = Arc::new(Barrier::new(writers + 2));
    let mut handles = vec![];

    for writer in 0..writers {
        let tree = Arc::clone(&tree);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..per_writer {
                tree.insert((i * writers + writer) as u32).unwrap();
            }
        }));
    }

    for _ in 0..2 {
        let tree = Arc::clone(&tree);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let mut last_size = 0;
            for _ in 0..50 {
                let size = tree.size();
                assert!(size >= last_size);
                last_size = size;

                let found = tree.knn_search(&0, 5).unwrap();
                assert!(found.len() <= 5);
                assert!(found.windows(2).all(|w| w[0].1 <= w[1].1));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(tree.size(), writers * per_writer);
    let report = tree.check_integrity().unwrap();
    assert!(report.is_valid, "{:?}", report.errors);
    let ids = metric.ids();
    assert_eq!(
        tree.knn_search(&400, 10).unwrap(),
        brute_force_knn(&metric, &ids, 400, 10)
    );
}
