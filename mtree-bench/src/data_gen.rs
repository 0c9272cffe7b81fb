//! Data generators for benchmarks

use mtree::distance::functions::euclidean;
use mtree::{MTreeEntry, MTreeError, MTreeNode, MTreeResult, Metric, NodeKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Euclidean metric over generated vectors addressed by index.
#[derive(Debug, Clone)]
pub struct VectorMetric {
    vectors: Arc<Vec<Vec<f64>>>,
}

impl VectorMetric {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl Metric<u32> for VectorMetric {
    type Distance = f64;

    fn distance(&self, a: &u32, b: &u32) -> MTreeResult<f64> {
        let lookup = |id: u32| {
            self.vectors
                .get(id as usize)
                .ok_or_else(|| MTreeError::NotFound(id.to_string()))
        };
        Ok(euclidean(lookup(*a)?, lookup(*b)?))
    }
}

/// Generate `count` uniform vectors of `dims` dimensions
pub fn generate_vectors(count: usize, dims: usize, seed: u64) -> VectorMetric {
    let mut rng = StdRng::seed_from_u64(seed);
    let vectors = (0..count)
        .map(|_| (0..dims).map(|_| rng.gen_range(0.0..1000.0)).collect())
        .collect();
    VectorMetric {
        vectors: Arc::new(vectors),
    }
}

/// Generate a full leaf node over identifiers `0..count`
pub fn generate_leaf(count: u32) -> MTreeNode<u32, f64> {
    MTreeNode::with_entries(
        NodeKind::Leaf,
        (0..count).map(|id| MTreeEntry::leaf(id, None)).collect(),
    )
}
