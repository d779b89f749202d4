//! Error types for change-DAG resolution.

use hypermedia_core::ContentId;
use thiserror::Error;

/// Errors that can occur while resolving a change list.
#[derive(Debug, Error)]
pub enum DagError {
    /// The change list is empty.
    #[error("change history is empty")]
    EmptyHistory,

    /// No change without dependencies was found.
    #[error("no genesis change in history")]
    GenesisNotFound,

    /// Every change is depended upon by another.
    #[error("change history has no heads")]
    NoHeads,

    /// More than one change has no dependencies.
    #[error("multiple genesis changes: {0:?}")]
    MultipleGenesis(Vec<ContentId>),

    /// The same change id appears twice.
    #[error("duplicate change {0}")]
    DuplicateChange(ContentId),

    /// A change depends on one that is not in the list.
    #[error("change {change} depends on unknown change {dependency}")]
    MissingDependency {
        change: ContentId,
        dependency: ContentId,
    },

    /// Changes whose depth could not be resolved.
    #[error("dependency cycle among {} changes", unresolved.len())]
    Cycle { unresolved: Vec<ContentId> },
}

/// Result type for DAG operations.
pub type Result<T> = std::result::Result<T, DagError>;
