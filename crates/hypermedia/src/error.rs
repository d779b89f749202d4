//! Error types for publishing.

use hypermedia_core::{ContentId, CoreError, ValidationError};
use hypermedia_dag::DagError;
use hypermedia_diff::DiffError;
use hypermedia_store::StoreError;
use thiserror::Error;

/// Errors that can occur while publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Identifier, key or encoding error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A built blob failed its own checks.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The document history does not resolve.
    #[error("dag error: {0}")]
    Dag(#[from] DagError),

    /// The block tree could not be diffed.
    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    /// The store rejected or failed a request.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// No history exists for the document.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// The document's current ref is a tombstone.
    #[error("document deleted: {0}")]
    DocumentDeleted(String),

    /// The genesis was stored but the first change was not.
    ///
    /// Retry [`Publisher::submit_content`](crate::Publisher::submit_content)
    /// or run the whole workflow again; genesis submission is idempotent.
    #[error("document {genesis} has a genesis but no content: {source}")]
    GenesisOnly {
        genesis: ContentId,
        #[source]
        source: Box<PublishError>,
    },
}

/// Result type for publishing.
pub type Result<T> = std::result::Result<T, PublishError>;
