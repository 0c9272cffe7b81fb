//! Error types for the M-Tree and its split subsystem.

use thiserror::Error;

/// Errors that can occur while splitting nodes or operating the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MTreeError {
    /// A split was requested on a node that cannot be divided in two.
    #[error("Cannot split a node with {entries} entries (at least 2 required)")]
    Underflow { entries: usize },

    /// The candidate routing objects are equal or not members of the node.
    #[error("Invalid routing pair: {0}")]
    InvalidRoutingPair(String),

    /// An object identifier could not be resolved by the distance capability.
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl MTreeError {
    /// Returns true for errors that signal a broken caller contract rather
    /// than bad input data.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            MTreeError::Underflow { .. } | MTreeError::InvalidRoutingPair(_)
        )
    }
}

/// Result type for M-Tree operations
pub type MTreeResult<T> = Result<T, MTreeError>;
