//! # Hypermedia
//!
//! Client-side engine for versioned, signed block documents in a
//! content-addressed hypermedia network.
//!
//! ## Overview
//!
//! - **Blobs**: immutable, signed, canonical DAG-CBOR units of history
//! - **Changes**: blobs carrying document operations, forming a DAG per document
//! - **Refs**: blobs that point a document at its current heads
//! - **Publisher**: resolves history, diffs block trees, signs and submits
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hypermedia::{Publisher, PublisherConfig};
//! use hypermedia::core::{derive_keypair, Block, BlockNode, DocumentMetadata};
//! use hypermedia::store::MemoryStore;
//!
//! async fn example() -> hypermedia::Result<()> {
//!     let keypair = derive_keypair("abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about", "")?;
//!     let publisher = Publisher::new(keypair, MemoryStore::new(), PublisherConfig::default());
//!
//!     let body = vec![BlockNode::new(Block::paragraph("intro123", "Hello"))];
//!     let published = publisher
//!         .create_document(["notes"], DocumentMetadata::named("Notes"), body)
//!         .await?;
//!     println!("{} at {}", published.id, published.version);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `hypermedia::core` - identifiers, keys, blobs, blocks, operations
//! - `hypermedia::dag` - change-DAG resolution
//! - `hypermedia::diff` - block-tree diffing and application
//! - `hypermedia::store` - the store boundary and the in-memory store

pub mod config;
pub mod error;
pub mod publisher;

// Re-export component crates
pub use hypermedia_core as core;
pub use hypermedia_dag as dag;
pub use hypermedia_diff as diff;
pub use hypermedia_store as store;

/// For implementing [`store::BlobStore`] outside this workspace.
pub use async_trait::async_trait;

pub use config::PublisherConfig;
pub use error::{PublishError, Result};
pub use publisher::{
    Clock, CommentReply, DocumentDraft, PrimedDocument, PublishedChange, Publisher,
};

// Re-export commonly used core types
pub use hypermedia_core::{
    Blob, BlobRef, Block, BlockNode, ContentId, DocumentMetadata, DocumentOperation, Keypair,
    Principal, ResourceId, Version,
};
