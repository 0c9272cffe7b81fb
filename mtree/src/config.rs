//! Tree configuration.

use crate::constants::{DEFAULT_MIN_FILL, DEFAULT_NODE_CAPACITY, MIN_NODE_CAPACITY};
use crate::distance::Metric;
use crate::errors::{MTreeError, MTreeResult};
use crate::node::NodeLike;
use crate::split::{SplitStrategy, SplitStrategyKind};
use serde::{Deserialize, Serialize};

/// Configuration of an [`MTree`](crate::tree::MTree).
///
/// ```rust
/// use mtree::config::MTreeConfig;
/// use mtree::split::SplitStrategyKind;
///
/// let config = MTreeConfig::new()
///     .with_node_capacity(8)
///     .with_split_strategy(SplitStrategyKind::MaxSpread);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MTreeConfig {
    /// Entries a node holds before it splits
    pub node_capacity: usize,
    /// Per-side minimum fill of the balanced partition, in `(0, 0.5]`
    pub min_fill: f64,
    pub split_strategy: SplitStrategyKind,
}

impl MTreeConfig {
    pub fn new() -> Self {
        Self {
            node_capacity: DEFAULT_NODE_CAPACITY,
            min_fill: DEFAULT_MIN_FILL,
            split_strategy: SplitStrategyKind::default(),
        }
    }

    pub fn with_node_capacity(mut self, node_capacity: usize) -> Self {
        self.node_capacity = node_capacity;
        self
    }

    pub fn with_min_fill(mut self, min_fill: f64) -> Self {
        self.min_fill = min_fill;
        self
    }

    pub fn with_split_strategy(mut self, split_strategy: SplitStrategyKind) -> Self {
        self.split_strategy = split_strategy;
        self
    }

    /// Checks every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`MTreeError::InvalidConfig`] naming the first bad parameter.
    pub fn validate(&self) -> MTreeResult<()> {
        if self.node_capacity < MIN_NODE_CAPACITY {
            return Err(invalid(format!(
                "node capacity {} is below {}",
                self.node_capacity, MIN_NODE_CAPACITY
            )));
        }
        if !(self.min_fill > 0.0 && self.min_fill <= 0.5) {
            return Err(invalid(format!(
                "min fill {} is outside (0, 0.5]",
                self.min_fill
            )));
        }
        if let SplitStrategyKind::Sampled { samples: 0, .. } = self.split_strategy {
            return Err(invalid("split sample count must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Validates the configuration and builds its split strategy.
    pub fn build_strategy<N, M>(&self) -> MTreeResult<Box<dyn SplitStrategy<N, M>>>
    where
        N: NodeLike,
        M: Metric<N::Key, Distance = N::Distance>,
    {
        self.validate()?;
        self.split_strategy.build(self.min_fill)
    }
}

impl Default for MTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(message: String) -> MTreeError {
    log::error!("Invalid M-Tree configuration: {}", message);
    MTreeError::InvalidConfig(message)
}
