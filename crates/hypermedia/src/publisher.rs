//! The Publisher: builds, signs and submits document history.
//!
//! Every workflow follows the same shape: read from the store, compute
//! (resolve, diff, build, sign) without touching the store, then submit.

use std::fmt;
use std::sync::Arc;

use hypermedia_core::{
    now_millis, validate_blob, Blob, BlobRef, BlockNode, CapabilityBuilder, ChangeBuilder,
    Comment, CommentBuilder, ContentId, DocumentMetadata, DocumentOperation, GenesisBuilder,
    Keypair, Principal, ProfileBuilder, RefBuilder, ResourceId, Timestamp, Version, ROOT_PARENT,
};
use hypermedia_dag::{resolve_history, DocumentState, History};
use hypermedia_diff::{flatten_to_operations_with, replace_tree_with};
use hypermedia_store::{BlobStore, DocumentSnapshot, Submission};
use tracing::{debug, info, warn};

use crate::config::PublisherConfig;
use crate::error::{PublishError, Result};

/// Source of blob timestamps, in milliseconds.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// A new document, built and signed but not yet submitted.
#[derive(Debug, Clone)]
pub struct DocumentDraft {
    id: ResourceId,
    genesis: BlobRef,
    metadata: DocumentMetadata,
    body: Vec<BlockNode>,
}

impl DocumentDraft {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn genesis_id(&self) -> ContentId {
        self.genesis.content_id()
    }
}

/// A document whose genesis the store has accepted. Its content is still
/// to be submitted.
#[derive(Debug, Clone)]
pub struct PrimedDocument {
    id: ResourceId,
    genesis: ContentId,
    metadata: DocumentMetadata,
    body: Vec<BlockNode>,
}

impl PrimedDocument {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn genesis_id(&self) -> ContentId {
        self.genesis
    }
}

/// A change the store accepted, with the ref pointing at it.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedChange {
    pub id: ResourceId,
    pub genesis: ContentId,
    pub change: ContentId,
    pub reference: ContentId,
    /// The version the ref now points at.
    pub version: Version,
}

/// Where a new comment sits in a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentReply {
    pub thread_root: ContentId,
    pub parent: ContentId,
}

impl CommentReply {
    /// Reply to `parent`, stored under `parent_id`.
    pub fn to(parent_id: ContentId, parent: &Comment) -> Self {
        Self {
            thread_root: parent.thread_root.unwrap_or(parent_id),
            parent: parent_id,
        }
    }
}

/// Publishes documents, comments, profiles and capabilities as one account.
pub struct Publisher<S: BlobStore> {
    /// The signing identity.
    keypair: Keypair,
    /// Where blobs go.
    store: Arc<S>,
    config: PublisherConfig,
    clock: Clock,
}

impl<S: BlobStore> fmt::Debug for Publisher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("account", &self.keypair.principal())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: BlobStore> Publisher<S> {
    /// Create a publisher signing as `keypair`.
    pub fn new(keypair: Keypair, store: S, config: PublisherConfig) -> Self {
        Self::with_shared_store(keypair, Arc::new(store), config)
    }

    /// Create a publisher over a store shared with others.
    pub fn with_shared_store(keypair: Keypair, store: Arc<S>, config: PublisherConfig) -> Self {
        Self {
            keypair,
            store,
            config,
            clock: Arc::new(now_millis),
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The publishing account.
    pub fn account(&self) -> Principal {
        self.keypair.principal()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// The materialized document, if the store has a ref for it.
    pub async fn document(&self, id: &ResourceId) -> Result<Option<DocumentSnapshot>> {
        Ok(self.store.get_document(id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Create
    // ─────────────────────────────────────────────────────────────────────────

    /// Build and sign the genesis of a new document at `path` in this
    /// account's space.
    pub fn prepare_document<I, P>(
        &self,
        path: I,
        metadata: DocumentMetadata,
        body: Vec<BlockNode>,
    ) -> Result<DocumentDraft>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let id = ResourceId::new(self.keypair.account_id())?.with_path(path)?;
        let genesis = self.finish(GenesisBuilder::new().sign(&self.keypair)?)?;
        debug!(document = %id, genesis = %genesis.content_id(), "prepared document");
        Ok(DocumentDraft {
            id,
            genesis,
            metadata,
            body,
        })
    }

    /// Step one: prime the store with the genesis.
    pub async fn submit_genesis(&self, draft: &DocumentDraft) -> Result<PrimedDocument> {
        self.store
            .update_document(&Submission::genesis(draft.genesis.clone()))
            .await?;
        info!(document = %draft.id, genesis = %draft.genesis_id(), "submitted genesis");
        Ok(PrimedDocument {
            id: draft.id.clone(),
            genesis: draft.genesis_id(),
            metadata: draft.metadata.clone(),
            body: draft.body.clone(),
        })
    }

    /// Step two: the first change, carrying metadata and body, and its ref.
    pub async fn submit_content(&self, primed: &PrimedDocument) -> Result<PublishedChange> {
        let mut ops: Vec<DocumentOperation> = primed.metadata.to_operation().into_iter().collect();
        ops.extend(flatten_to_operations_with(
            &primed.body,
            ROOT_PARENT,
            &self.config.diff_options(),
        )?);
        let state = DocumentState {
            genesis: primed.genesis,
            heads: vec![primed.genesis],
            head_depth: 0,
            depths: [(primed.genesis, 0)].into_iter().collect(),
        };
        self.publish(&primed.id, &state, ops).await
    }

    /// Both steps. If the second fails the error is
    /// [`PublishError::GenesisOnly`]; retrying is safe.
    pub async fn create_document<I, P>(
        &self,
        path: I,
        metadata: DocumentMetadata,
        body: Vec<BlockNode>,
    ) -> Result<PublishedChange>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let draft = self.prepare_document(path, metadata, body)?;
        let primed = self.submit_genesis(&draft).await?;
        self.submit_content(&primed).await.map_err(|e| {
            warn!(document = %primed.id, genesis = %primed.genesis, error = %e, "document left without content");
            PublishError::GenesisOnly {
                genesis: primed.genesis,
                source: Box::new(e),
            }
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Update
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish `ops` on top of the document's current heads.
    pub async fn update_document(
        &self,
        id: &ResourceId,
        ops: Vec<DocumentOperation>,
    ) -> Result<PublishedChange> {
        let doc = id.document();
        let state = self.current_state(&doc).await?;
        self.publish(&doc, &state, ops).await
    }

    /// Replace the document body with `body`, publishing only the difference.
    pub async fn replace_body(&self, id: &ResourceId, body: &[BlockNode]) -> Result<PublishedChange> {
        let doc = id.document();
        let snapshot = self.live_snapshot(&doc).await?;
        let ops = replace_tree_with(&snapshot.content.body, body, &self.config.diff_options())?;
        debug!(document = %doc, ops = ops.len(), "diffed document body");
        self.update_document(&doc, ops).await
    }

    /// Publish changed metadata fields. Unset fields are left alone.
    pub async fn set_metadata(
        &self,
        id: &ResourceId,
        metadata: &DocumentMetadata,
    ) -> Result<PublishedChange> {
        self.update_document(id, metadata.to_operation().into_iter().collect())
            .await
    }

    /// Point the document at a tombstone ref. Returns the ref's id.
    pub async fn delete_document(&self, id: &ResourceId) -> Result<ContentId> {
        let doc = id.document();
        let state = self.current_state(&doc).await?;
        let head = state
            .heads
            .first()
            .copied()
            .ok_or_else(|| PublishError::DocumentNotFound(doc.to_string()))?;
        let change = self
            .store
            .get_blob(&head)
            .await?
            .ok_or_else(|| PublishError::DocumentNotFound(doc.to_string()))?;

        let ts = (self.clock)();
        let tombstone = RefBuilder::tombstone(state.genesis)
            .generation(ts)
            .path(doc.path_string())
            .space(owner(&doc)?)
            .timestamp(ts)
            .sign(&self.keypair)?;
        let tombstone = self.finish(tombstone)?;
        let tombstone_id = tombstone.content_id();

        self.store
            .update_document(&Submission::new(change, tombstone))
            .await?;
        info!(document = %doc, reference = %tombstone_id, "deleted document");
        Ok(tombstone_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Standalone blobs
    // ─────────────────────────────────────────────────────────────────────────

    /// Comment on `target`. A pinned version is used as-is, otherwise the
    /// comment targets the current heads.
    pub async fn create_comment(
        &self,
        target: &ResourceId,
        body: Vec<BlockNode>,
        reply: Option<CommentReply>,
    ) -> Result<ContentId> {
        let version = match target.version() {
            Some(version) => version.parse::<Version>()?.heads().to_vec(),
            None => self.current_state(&target.document()).await?.heads,
        };
        let mut builder = CommentBuilder::new(owner(target)?, target.path_string(), version)
            .body(body)
            .timestamp((self.clock)());
        if let Some(reply) = reply {
            builder = builder.reply(reply.thread_root, reply.parent);
        }
        let comment = self.finish(builder.sign(&self.keypair)?)?;
        let id = self.store.put_blob(&comment).await?;
        info!(target = %target, comment = %id, "published comment");
        Ok(id)
    }

    /// Publish this account's profile.
    pub async fn publish_profile(&self, profile: ProfileBuilder) -> Result<ContentId> {
        let blob = profile.timestamp((self.clock)()).sign(&self.keypair)?;
        let id = self.store.put_blob(&self.finish(blob)?).await?;
        info!(account = %self.account(), profile = %id, "published profile");
        Ok(id)
    }

    /// Grant another key a role in this account's space.
    pub async fn grant_capability(&self, capability: CapabilityBuilder) -> Result<ContentId> {
        let blob = capability.timestamp((self.clock)()).sign(&self.keypair)?;
        let id = self.store.put_blob(&self.finish(blob)?).await?;
        info!(account = %self.account(), capability = %id, "granted capability");
        Ok(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolved history of an existing, live document.
    async fn current_state(&self, doc: &ResourceId) -> Result<DocumentState> {
        let records = self.store.list_changes(doc).await?;
        match resolve_history(&records, self.config.resolve_options())? {
            History::Existing(state) => Ok(state),
            History::New => match self.store.get_document(doc).await? {
                Some(snapshot) if snapshot.deleted => {
                    Err(PublishError::DocumentDeleted(doc.to_string()))
                }
                _ => Err(PublishError::DocumentNotFound(doc.to_string())),
            },
        }
    }

    async fn live_snapshot(&self, doc: &ResourceId) -> Result<DocumentSnapshot> {
        match self.store.get_document(doc).await? {
            Some(snapshot) if snapshot.deleted => {
                Err(PublishError::DocumentDeleted(doc.to_string()))
            }
            Some(snapshot) => Ok(snapshot),
            None => Err(PublishError::DocumentNotFound(doc.to_string())),
        }
    }

    /// Build, sign and submit a change on top of `state` plus its ref.
    async fn publish(
        &self,
        doc: &ResourceId,
        state: &DocumentState,
        ops: Vec<DocumentOperation>,
    ) -> Result<PublishedChange> {
        let ts = (self.clock)();
        let change = ChangeBuilder::new(state.genesis, state.heads.clone(), state.next_depth())
            .ops(ops)
            .timestamp(ts)
            .sign(&self.keypair)?;
        let change = self.finish(change)?;
        let change_id = change.content_id();

        let reference = RefBuilder::new(state.genesis)
            .heads(vec![change_id])
            .generation(ts)
            .path(doc.path_string())
            .space(owner(doc)?)
            .timestamp(ts)
            .sign(&self.keypair)?;
        let reference = self.finish(reference)?;
        let reference_id = reference.content_id();

        self.store
            .update_document(&Submission::new(change, reference))
            .await?;
        info!(
            document = %doc,
            change = %change_id,
            depth = state.next_depth(),
            "published change"
        );

        Ok(PublishedChange {
            id: doc.clone(),
            genesis: state.genesis,
            change: change_id,
            reference: reference_id,
            version: Version::from_heads(vec![change_id], self.config.head_order),
        })
    }

    /// Encode a signed blob, checking it first when configured to.
    fn finish(&self, blob: Blob) -> Result<BlobRef> {
        if self.config.verify_before_submit {
            validate_blob(&blob)?;
        }
        Ok(BlobRef::new(blob)?)
    }
}

/// The space a document lives in: the account named by its uid.
fn owner(id: &ResourceId) -> Result<Principal> {
    Ok(id.uid().parse()?)
}
