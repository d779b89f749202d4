//! Error types for diffing and applying block trees.

use thiserror::Error;

/// Errors that can occur while walking or editing block trees.
#[derive(Debug, Error)]
pub enum DiffError {
    /// Two blocks in one tree share an id.
    #[error("block id {0:?} appears more than once")]
    IdentityCollision(String),

    /// The tree is nested deeper than allowed.
    #[error("block tree exceeds maximum depth {max_depth}")]
    DepthExceeded { max_depth: usize },

    /// A move would place a block inside its own subtree.
    #[error("cannot move block {block:?} under {parent:?}")]
    InvalidMove { block: String, parent: String },
}

/// Result type for diff operations.
pub type Result<T> = std::result::Result<T, DiffError>;
