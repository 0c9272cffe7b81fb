//! Running statistics and tree health reports.

use crate::errors::{MTreeError, MTreeResult};
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Incremental mean, variance, minimum and maximum of a stream of values.
///
/// Updates are numerically stable (Welford for single values, a two-pass
/// update for batches). Counts are `f64` so weighted values accumulate their
/// weight instead of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanVarianceMinMax {
    n: f64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl MeanVarianceMinMax {
    pub fn new() -> Self {
        Self {
            n: 0.0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn put(&mut self, value: f64) {
        self.n += 1.0;
        let delta = value - self.mean;
        self.mean += delta / self.n;
        self.m2 += delta * (value - self.mean);
        self.track_extremes(value);
    }

    /// Adds `value` with the given weight. Non-positive weights are ignored.
    pub fn put_weighted(&mut self, value: f64, weight: f64) {
        if weight <= 0.0 {
            return;
        }
        let total = self.n + weight;
        let delta = value - self.mean;
        self.mean += delta * weight / total;
        self.m2 += weight * delta * (value - self.mean);
        self.n = total;
        self.track_extremes(value);
    }

    /// Adds a batch of unit-weight values.
    pub fn put_all(&mut self, values: &[f64]) -> &mut Self {
        match values {
            [] => return self,
            [value] => {
                self.put(*value);
                return self;
            }
            _ => {}
        }

        let count = values.len() as f64;
        let mut sum = 0.0;
        for &value in values {
            sum += value;
            self.track_extremes(value);
        }
        let batch_mean = sum / count;
        let batch_m2: f64 = values.iter().map(|v| (v - batch_mean).powi(2)).sum();

        let total = self.n + count;
        let delta = batch_mean - self.mean;
        self.m2 += batch_m2 + delta * delta * self.n * count / total;
        self.mean = (self.n * self.mean + sum) / total;
        self.n = total;
        self
    }

    /// Adds a batch of weighted values with a two-pass update. Pairs with a
    /// non-positive weight are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`MTreeError::InvalidOperation`] when the slices differ in
    /// length; nothing is added in that case.
    pub fn put_all_weighted(&mut self, values: &[f64], weights: &[f64]) -> MTreeResult<&mut Self> {
        if values.len() != weights.len() {
            log::error!(
                "{} values were given with {} weights",
                values.len(),
                weights.len()
            );
            return Err(MTreeError::InvalidOperation(format!(
                "expected one weight per value, got {} values and {} weights",
                values.len(),
                weights.len()
            )));
        }

        let mut weight_sum = 0.0;
        let mut sum = 0.0;
        for (&value, &weight) in values.iter().zip(weights) {
            if weight > 0.0 {
                weight_sum += weight;
                sum += weight * value;
                self.track_extremes(value);
            }
        }
        if weight_sum <= 0.0 {
            return Ok(self);
        }

        let batch_mean = sum / weight_sum;
        let batch_m2: f64 = values
            .iter()
            .zip(weights)
            .filter(|(_, weight)| **weight > 0.0)
            .map(|(value, weight)| weight * (value - batch_mean).powi(2))
            .sum();

        let total = self.n + weight_sum;
        let delta = batch_mean - self.mean;
        self.m2 += batch_m2 + delta * delta * self.n * weight_sum / total;
        self.mean = (self.n * self.mean + sum) / total;
        self.n = total;
        Ok(self)
    }

    /// Folds another accumulator into this one.
    pub fn merge(&mut self, other: &MeanVarianceMinMax) {
        if other.n <= 0.0 {
            return;
        }
        let total = self.n + other.n;
        let delta = other.mean - self.mean;
        self.m2 += other.m2 + delta * delta * self.n * other.n / total;
        self.mean += delta * other.n / total;
        self.n = total;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn count(&self) -> f64 {
        self.n
    }

    /// Zero when nothing has been added.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance; `NaN` when empty.
    pub fn naive_variance(&self) -> f64 {
        self.m2 / self.n
    }

    /// Bessel-corrected variance; `NaN` for fewer than two values.
    pub fn sample_variance(&self) -> f64 {
        if self.n <= 1.0 {
            return f64::NAN;
        }
        self.m2 / (self.n - 1.0)
    }

    pub fn std_dev(&self) -> f64 {
        self.sample_variance().sqrt()
    }

    /// `+inf` when empty.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// `-inf` when empty.
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn diff(&self) -> f64 {
        self.max - self.min
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn track_extremes(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }
}

impl Default for MeanVarianceMinMax {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MeanVarianceMinMax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeanVarianceMinMax(mean={},var={},min={},max={})",
            self.mean(),
            self.sample_variance(),
            self.min,
            self.max
        )
    }
}

/// Snapshot of an [`MTree`](crate::tree::MTree).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MTreeStats {
    pub total_entries: u64,
    pub node_count: u64,
    pub leaf_count: u64,
    pub tree_height: u32,
    /// Splits performed since creation or the last clear
    pub split_count: u64,
    /// Summed covering radius of each split, as `f64`
    pub split_radius: MeanVarianceMinMax,
}

/// Result of [`MTree::check_integrity`](crate::tree::MTree::check_integrity).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrityReport {
    /// Nodes reached from the root
    pub nodes_checked: u64,
    /// Objects reached in leaves
    pub entries_checked: u64,
    /// Nodes above capacity
    pub overfull_nodes: Vec<NodeId>,
    /// Nodes whose parent link does not point back at the referencing node
    pub broken_links: Vec<NodeId>,
    pub is_valid: bool,
    /// Detailed error messages
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    pub(crate) fn fail(&mut self, message: String) {
        log::error!("Integrity check: {}", message);
        self.is_valid = false;
        self.errors.push(message);
    }
}
