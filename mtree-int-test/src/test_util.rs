use mtree::distance::functions::euclidean;
use mtree::{MTreeEntry, MTreeError, MTreeNode, MTreeResult, Metric, NodeKind, SplitStrategyKind};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::sync::Arc;

/// Euclidean metric over points addressed by their index.
#[derive(Debug, Clone)]
pub struct PointMetric {
    points: Arc<Vec<Vec<f64>>>,
}

impl PointMetric {
    pub fn new(points: Vec<Vec<f64>>) -> Self {
        Self {
            points: Arc::new(points),
        }
    }

    /// `count` reproducible points in the unit hypercube.
    pub fn random(count: usize, dims: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let points = (0..count)
            .map(|_| (0..dims).map(|_| rng.gen::<f64>()).collect())
            .collect();
        Self::new(points)
    }

    /// Points grouped around `clusters` centres, with many near-equal
    /// distances inside each group.
    pub fn clustered(count: usize, clusters: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let centres: Vec<(f64, f64)> = (0..clusters)
            .map(|_| (rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
            .collect();
        let points = (0..count)
            .map(|i| {
                let (x, y) = centres[i % clusters];
                vec![x + rng.gen_range(-1.0..1.0), y + rng.gen_range(-1.0..1.0)]
            })
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn ids(&self) -> Vec<u32> {
        (0..self.points.len() as u32).collect()
    }

    fn point(&self, id: u32) -> MTreeResult<&[f64]> {
        self.points
            .get(id as usize)
            .map(Vec::as_slice)
            .ok_or_else(|| MTreeError::NotFound(id.to_string()))
    }
}

impl Metric<u32> for PointMetric {
    type Distance = f64;

    fn distance(&self, a: &u32, b: &u32) -> MTreeResult<f64> {
        Ok(euclidean(self.point(*a)?, self.point(*b)?))
    }
}

/// Leaf node holding `ids` in the given order.
pub fn leaf_node(ids: &[u32]) -> MTreeNode<u32, f64> {
    MTreeNode::with_entries(
        NodeKind::Leaf,
        ids.iter().map(|&id| MTreeEntry::leaf(id, None)).collect(),
    )
}

pub fn shuffled(mut ids: Vec<u32>, seed: u64) -> Vec<u32> {
    ids.shuffle(&mut StdRng::seed_from_u64(seed));
    ids
}

/// One configuration of every split strategy.
pub fn all_strategies() -> Vec<SplitStrategyKind> {
    vec![
        SplitStrategyKind::MRad,
        SplitStrategyKind::MaxSpread,
        SplitStrategyKind::sampled(),
        SplitStrategyKind::Sampled { samples: 3, seed: 11 },
    ]
}

pub fn sort_by_distance(found: &mut [(u32, f64)]) {
    found.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

pub fn brute_force_range(metric: &PointMetric, ids: &[u32], query: u32, radius: f64) -> Vec<(u32, f64)> {
    let mut found: Vec<_> = ids
        .iter()
        .map(|&id| (id, metric.distance(&query, &id).unwrap()))
        .filter(|(_, distance)| *distance <= radius)
        .collect();
    sort_by_distance(&mut found);
    found
}

pub fn brute_force_knn(metric: &PointMetric, ids: &[u32], query: u32, k: usize) -> Vec<(u32, f64)> {
    let mut found: Vec<_> = ids
        .iter()
        .map(|&id| (id, metric.distance(&query, &id).unwrap()))
        .collect();
    sort_by_distance(&mut found);
    found.truncate(k);
    found
}
