//! # M-Tree - Metric Space Indexing with Pluggable Node Splits
//!
//! This crate provides an in-memory M-Tree over arbitrary metric spaces and
//! the node split subsystem behind it. The tree never sees coordinates: all
//! it knows about stored objects comes from a [`Metric`] over identifiers.
//!
//! ## Features
//!
//! - **Split Strategies**: exhaustive m_RAD, farthest-pair (max spread) and
//!   seeded sampled m_RAD, all behind the [`SplitStrategy`] trait
//! - **Partition Policies**: balanced assignment with a minimum occupancy
//!   per side, or plain generalized-hyperplane assignment
//! - **Deterministic**: equal inputs give equal splits, ties are broken by
//!   index order
//! - **Thread Safe**: concurrent searches share a read lock
//! - **Split Statistics**: running mean, variance and extremes of the summed
//!   covering radius of every split
//!
//! ## Splitting a Node
//!
//! ```rust
//! use mtree::{FnMetric, MRadSplit, MTreeEntry, MTreeNode, NodeKind, SplitStrategy};
//!
//! let values = [0.0f64, 1.0, 10.0, 11.0];
//! let metric = FnMetric::new(move |a: &usize, b: &usize| (values[*a] - values[*b]).abs());
//! let node = MTreeNode::with_entries(
//!     NodeKind::Leaf,
//!     (0..4).map(|id| MTreeEntry::leaf(id, None)).collect(),
//! );
//!
//! let assignments = MRadSplit::new().split(&node, &metric).unwrap();
//! assert_eq!(assignments.first().member_ids(), vec![0, 1]);
//! assert_eq!(assignments.second().member_ids(), vec![2, 3]);
//! ```
//!
//! ## Tree API
//!
//! ```rust
//! use mtree::{FnMetric, MTree, MTreeConfig, SplitStrategyKind};
//!
//! let metric = FnMetric::new(|a: &u32, b: &u32| a.abs_diff(*b));
//! let config = MTreeConfig::new()
//!     .with_node_capacity(4)
//!     .with_split_strategy(SplitStrategyKind::sampled());
//! let tree = MTree::new(metric, config).unwrap();
//! for id in 0..100 {
//!     tree.insert(id * 3).unwrap();
//! }
//!
//! assert_eq!(tree.knn_search(&31, 1).unwrap(), vec![(30, 1)]);
//! assert!(tree.check_integrity().unwrap().is_valid);
//! ```

// Split subsystem
pub mod assignments;
pub mod distance;
pub mod entry;
pub mod node;
pub mod partition;
pub mod split;

// Tree and ambient modules
pub mod config;
pub mod constants;
pub mod errors;
pub mod stats;
pub mod tree;

#[cfg(test)]
mod test_support;

pub use assignments::{Assignments, NodeAssignments, Partition};
pub use config::MTreeConfig;
pub use distance::{DistanceValue, FnMetric, Metric, ObjectKey, ObjectStore};
pub use entry::{EntryLike, MTreeEntry};
pub use errors::{MTreeError, MTreeResult};
pub use node::{MTreeNode, NodeId, NodeKind, NodeLike};
pub use partition::{BalancedPartition, HyperplanePartition, PartitionPolicy};
pub use split::{MRadSplit, MaxSpreadSplit, SampledMRadSplit, SplitStrategy, SplitStrategyKind};
pub use stats::{IntegrityReport, MTreeStats, MeanVarianceMinMax};
pub use tree::{BoxedSplitStrategy, MTree};
