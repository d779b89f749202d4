//! # Hypermedia DAG
//!
//! Resolves a document's change list into its genesis, heads and per-change
//! depths. Pure computation; the change list comes from the store.

pub mod error;
pub mod resolver;

pub use error::{DagError, Result};
pub use resolver::{
    resolve, resolve_history, resolve_with, ChangeRecord, DocumentState, History, ResolveOptions,
};
