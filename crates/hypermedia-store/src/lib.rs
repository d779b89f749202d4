//! # Hypermedia Store
//!
//! The boundary between the engine and whatever holds published blobs.
//!
//! ## Key Types
//!
//! - [`BlobStore`] - The async trait the publisher talks to
//! - [`Submission`] - A change plus the ref that points at it
//! - [`DocumentSnapshot`] - A materialized document
//! - [`MemoryStore`] - In-memory reference store for tests and offline use
//!
//! ## Design Notes
//!
//! - **Verify on receipt**: every blob is decoded from its bytes, checked
//!   against its content id and canonical form, and signature-verified
//! - **Dependencies first**: changes and refs naming unknown blobs are rejected
//! - **Genesis priming**: a new document's genesis is sent as both change and ref

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{BlobStore, DocumentSnapshot, Submission};
