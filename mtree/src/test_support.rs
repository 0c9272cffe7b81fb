//! Fixtures shared by the unit tests.

use crate::distance::functions::euclidean;
use crate::distance::Metric;
use crate::entry::MTreeEntry;
use crate::errors::MTreeResult;
use crate::node::{MTreeNode, NodeKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Identifiers `0..values.len()` placed on a line.
pub struct LineMetric {
    values: Vec<f64>,
}

impl Metric<u32> for LineMetric {
    type Distance = f64;

    fn distance(&self, a: &u32, b: &u32) -> MTreeResult<f64> {
        Ok((self.values[*a as usize] - self.values[*b as usize]).abs())
    }
}

pub fn line_metric(values: Vec<f64>) -> LineMetric {
    LineMetric { values }
}

/// Euclidean distance over identifiers `0..points.len()`.
pub struct VectorMetric {
    points: Vec<Vec<f64>>,
}

impl Metric<u32> for VectorMetric {
    type Distance = f64;

    fn distance(&self, a: &u32, b: &u32) -> MTreeResult<f64> {
        Ok(euclidean(
            &self.points[*a as usize],
            &self.points[*b as usize],
        ))
    }
}

pub fn vector_metric(points: Vec<Vec<f64>>) -> VectorMetric {
    VectorMetric { points }
}

/// Reproducible points in the unit hypercube.
pub fn random_points(count: usize, dims: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dims).map(|_| rng.gen::<f64>()).collect())
        .collect()
}

/// Leaf node holding identifiers `0..count` in order.
pub fn leaf_node(count: u32) -> MTreeNode<u32, f64> {
    leaf_node_with(&(0..count).collect::<Vec<_>>())
}

pub fn leaf_node_with(ids: &[u32]) -> MTreeNode<u32, f64> {
    MTreeNode::with_entries(
        NodeKind::Leaf,
        ids.iter().map(|&id| MTreeEntry::leaf(id, None)).collect(),
    )
}
