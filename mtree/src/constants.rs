//! Default tuning values for the M-Tree.

/// Maximum number of entries per node before it splits
pub const DEFAULT_NODE_CAPACITY: usize = 16;

/// Smallest supported node capacity
pub const MIN_NODE_CAPACITY: usize = 2;

/// Minimum fraction of a split node's entries kept on each side (40%)
pub const DEFAULT_MIN_FILL: f64 = 0.4;

/// Candidate pairs evaluated by the sampled split strategy
pub const DEFAULT_SPLIT_SAMPLES: usize = 20;

/// Seed of the sampled split strategy's random generator
pub const DEFAULT_SPLIT_SEED: u64 = 0x4D54_5245; // "MTRE"
