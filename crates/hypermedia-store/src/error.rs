//! Error types for the store module.

use hypermedia_core::{ContentId, CoreError, ValidationError};
use hypermedia_dag::DagError;
use hypermedia_diff::DiffError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Submitted bytes failed to decode or matched the wrong content id.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A submitted blob is malformed or badly signed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The stored change history does not resolve.
    #[error("dag error: {0}")]
    Dag(#[from] DagError),

    /// Stored operations could not be applied.
    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    /// A blob references something the store has not seen.
    #[error("blob {blob} depends on unknown blob {dependency}")]
    MissingDependency {
        blob: ContentId,
        dependency: ContentId,
    },

    /// A blob of the wrong kind was submitted in this position.
    #[error("expected {expected} blob, got {found}")]
    UnexpectedBlob {
        expected: &'static str,
        found: &'static str,
    },

    /// Requested data is not in the store.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
