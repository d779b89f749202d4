//! # Hypermedia Core
//!
//! Pure primitives for the hypermedia engine: resource identifiers, account
//! keys, canonical blobs, blocks and document operations.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`ResourceId`] - Parsed `hm://uid/path?v=version#block` address
//! - [`Keypair`] / [`Principal`] - Ed25519 signing keys and tagged public keys
//! - [`Blob`] - Genesis, change, ref, comment, profile and capability blobs
//! - [`ContentId`] - CIDv1 over the SHA-256 of a blob's canonical bytes
//! - [`DocumentOperation`] - Declarative edits to a block tree
//!
//! ## Canonicalization
//!
//! All blobs are encoded as canonical DAG-CBOR. See [`canonical`] module.

pub mod blob;
pub mod block;
pub mod block_id;
pub mod builder;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod mnemonic;
pub mod operation;
pub mod resource_id;
pub mod types;
pub mod validation;

pub use blob::{
    decode_blob, Blob, BlobHeader, BlobRef, Capability, Comment, DocumentChange, GenesisChange,
    Profile, Ref, Role,
};
pub use block::{Annotation, AttrValue, Attributes, Block, BlockNode};
pub use block_id::{BlockIdGenerator, RandomIdGenerator, SeededIdGenerator};
pub use builder::{
    CapabilityBuilder, ChangeBuilder, CommentBuilder, GenesisBuilder, ProfileBuilder, RefBuilder,
};
pub use canonical::{decode_value, encode, encode_canonical, is_canonical, EncodedBlob};
pub use crypto::{sign_with_seed, Ed25519PublicKey, Ed25519Signature, Keypair, Principal, Sha256Hash};
pub use error::{CoreError, ValidationError};
pub use mnemonic::{derive_keypair, generate_mnemonic, validate_mnemonic, WordCount};
pub use operation::{AttributeEntry, DocumentMetadata, DocumentOperation, ROOT_PARENT};
pub use resource_id::{BlockRange, BlockRef, ResourceId, Scheme};
pub use types::{Codec, ContentId, HeadOrder, Timestamp, Version};
pub use validation::{validate_blob, validate_blob_structure};

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or(0)
}
