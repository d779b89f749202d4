//! BlobStore trait: the boundary to whatever holds published blobs.
//!
//! The engine only builds and validates blobs. Persisting them, replicating
//! them and serving documents back is the store's job.

use async_trait::async_trait;
use hypermedia_core::{BlobRef, ContentId, ResourceId, Version};
use hypermedia_dag::ChangeRecord;
use hypermedia_diff::DocumentContent;

use crate::error::Result;

/// A change and the ref that points a document at it.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub change: BlobRef,
    pub reference: BlobRef,
}

impl Submission {
    pub fn new(change: BlobRef, reference: BlobRef) -> Self {
        Self { change, reference }
    }

    /// Prime a new document: the genesis is sent as both change and ref.
    pub fn genesis(genesis: BlobRef) -> Self {
        Self {
            change: genesis.clone(),
            reference: genesis,
        }
    }

    /// True for a genesis priming submission.
    pub fn is_genesis(&self) -> bool {
        self.change.content_id() == self.reference.content_id()
    }
}

/// A materialized document as served by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub genesis: ContentId,
    /// Id of the ref the snapshot was read through, if any.
    pub reference: Option<ContentId>,
    pub version: Version,
    pub content: DocumentContent,
    /// The current ref is a tombstone. `content` is empty.
    pub deleted: bool,
}

/// Async interface to the blob store.
///
/// # Design Notes
///
/// - **Dependencies first**: a change or ref whose dependencies are unknown
///   is rejected; nothing from the submission is kept.
/// - **Idempotent**: submitting the same blobs twice is not an error.
/// - **Latest ref wins**: a document's current ref is the one with the
///   highest `(generation, ts)`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a change and its ref, or prime a genesis.
    async fn update_document(&self, submission: &Submission) -> Result<()>;

    /// Every change reachable from the document's current ref, or from the
    /// version pinned in `id`. Empty for unknown or deleted documents.
    async fn list_changes(&self, id: &ResourceId) -> Result<Vec<ChangeRecord>>;

    /// The materialized document, or `None` if no ref exists for it.
    async fn get_document(&self, id: &ResourceId) -> Result<Option<DocumentSnapshot>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Standalone blobs
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a comment, profile or capability.
    async fn put_blob(&self, blob: &BlobRef) -> Result<ContentId>;

    /// Look up any stored blob.
    async fn get_blob(&self, id: &ContentId) -> Result<Option<BlobRef>>;
}
