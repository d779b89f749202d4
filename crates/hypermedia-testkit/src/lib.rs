//! # Hypermedia Testkit
//!
//! Testing utilities for the hypermedia engine.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: pinned key, genesis and identifier outputs for cross-platform verification
//! - **Generators**: Proptest strategies for ids, blocks, block trees and operations
//! - **Fixtures**: a keypair, a shared memory store and a deterministic clock
//!
//! ## Golden Vectors
//!
//! ```rust
//! use hypermedia_testkit::vectors::verify_all_vectors;
//!
//! for report in verify_all_vectors() {
//!     println!("{}: {} ({})", report.name, report.matches, report.actual);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use hypermedia_testkit::generators::resource_id;
//!
//! proptest! {
//!     #[test]
//!     fn id_text_roundtrips(id in resource_id()) {
//!         prop_assert_eq!(id.to_string().parse::<ResourceId>().unwrap(), id);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use hypermedia_testkit::fixtures::{sample_body, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let published = fixture
//!     .publisher()
//!     .create_document(["notes"], Default::default(), sample_body())
//!     .await?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, paragraphs, sample_body, TestFixture, TEST_MNEMONIC};
pub use generators::{block_tree, unique_block_tree, unique_ids};
pub use vectors::{all_vectors, id_vectors, verify_all_vectors, GoldenVector, IdVector, VectorReport};
