//! In-memory implementation of the BlobStore trait.
//!
//! A reference double of a real blob store: it checks what a store checks
//! (content ids, canonical form, signatures, dependencies) and serves
//! materialized documents, but keeps everything in memory.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use hypermedia_core::{
    validate_blob, Blob, BlobRef, ContentId, Principal, Ref, ResourceId, Version,
};
use hypermedia_dag::{resolve_with, ChangeRecord, ResolveOptions};
use hypermedia_diff::{DocumentContent, TreeState};

use crate::error::{Result, StoreError};
use crate::traits::{BlobStore, DocumentSnapshot, Submission};

/// `(space, path)`: the address a ref publishes under.
type DocumentKey = (Principal, String);

/// In-memory store implementation.
///
/// All data is lost when the store is dropped.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
    options: ResolveOptions,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Every accepted blob by content id.
    blobs: HashMap<ContentId, BlobRef>,

    /// Current ref per document.
    refs: HashMap<DocumentKey, ContentId>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::with_options(ResolveOptions::default())
    }

    /// Create a store that resolves histories with `options`.
    pub fn with_options(options: ResolveOptions) -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
            options,
        }
    }

    /// Number of stored blobs.
    pub async fn len(&self) -> usize {
        self.inner.read().await.blobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// True if the blob has been accepted.
    pub async fn contains(&self, id: &ContentId) -> bool {
        self.inner.read().await.blobs.contains_key(id)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn is_change(&self, id: &ContentId) -> bool {
        matches!(
            self.blobs.get(id).map(|b| &b.blob),
            Some(Blob::Genesis(_) | Blob::Change(_))
        )
    }

    fn reference(&self, id: &ContentId) -> Option<&Ref> {
        match self.blobs.get(id).map(|b| &b.blob) {
            Some(Blob::Ref(r)) => Some(r),
            _ => None,
        }
    }

    /// True if `candidate` should replace the current ref at its address.
    fn supersedes(&self, candidate_id: &ContentId, candidate: &Ref) -> bool {
        let current = self
            .refs
            .get(&ref_key(candidate))
            .and_then(|id| self.reference(id).map(|r| (id, r)));
        match current {
            None => true,
            Some((current_id, current)) => {
                (candidate.generation, candidate.header.ts, *candidate_id)
                    > (current.generation, current.header.ts, *current_id)
            }
        }
    }

    /// Heads to read `id` at: the pinned version, else the current ref's.
    /// `None` when the store has no ref for the document.
    fn heads_for(&self, id: &ResourceId) -> Result<Option<Vec<ContentId>>> {
        if let Some(version) = id.version() {
            let version: Version = version.parse()?;
            for head in version.heads() {
                if !self.is_change(head) {
                    return Err(StoreError::NotFound(format!("change {head}")));
                }
            }
            return Ok(Some(version.heads().to_vec()));
        }
        let key = document_key(id)?;
        Ok(self
            .refs
            .get(&key)
            .and_then(|ref_id| self.reference(ref_id))
            .map(|r| r.heads.clone()))
    }

    /// Every change reachable from `heads`, ordered by `(depth, id)`.
    fn collect_changes(&self, heads: &[ContentId]) -> Result<Vec<ChangeRecord>> {
        let mut seen = HashSet::new();
        let mut stack: Vec<ContentId> = heads.to_vec();
        let mut records = Vec::new();

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(blob) = self.blobs.get(&id).map(|b| &b.blob) else {
                return Err(StoreError::NotFound(format!("change {id}")));
            };
            let (deps, depth) = match blob {
                Blob::Genesis(_) => (Vec::new(), 0),
                Blob::Change(change) => (change.deps.clone(), change.depth),
                other => {
                    return Err(StoreError::UnexpectedBlob {
                        expected: "Change",
                        found: other.blob_type(),
                    })
                }
            };
            stack.extend(deps.iter().copied());
            records.push((
                depth,
                ChangeRecord {
                    id,
                    deps,
                    signer: Some(*blob.signer()),
                    timestamp: Some(blob.ts()),
                },
            ));
        }

        records.sort_by(|(da, a), (db, b)| (da, a.id).cmp(&(db, b.id)));
        Ok(records.into_iter().map(|(_, r)| r).collect())
    }

    /// Resolve the history and replay its operations in `(depth, id)` order.
    fn materialize(
        &self,
        records: &[ChangeRecord],
        options: ResolveOptions,
    ) -> Result<(ContentId, Version, DocumentContent)> {
        let state = resolve_with(records, options)?;
        let mut tree = TreeState::new();
        for id in state.ordered_changes() {
            if let Some(Blob::Change(change)) = self.blobs.get(&id).map(|b| &b.blob) {
                tree.apply_all(&change.ops)?;
            }
        }
        Ok((state.genesis, state.version(), tree.materialize()?))
    }
}

fn ref_key(reference: &Ref) -> DocumentKey {
    (reference.space(), reference.path.clone().unwrap_or_default())
}

fn document_key(id: &ResourceId) -> Result<DocumentKey> {
    let space: Principal = id.uid().parse()?;
    Ok((space, id.path_string()))
}

/// Re-derive the blob from its bytes and check it.
fn verified(blob: &BlobRef) -> Result<BlobRef> {
    let id = blob.content_id();
    let decoded = BlobRef::decode(blob.encoded.bytes.clone(), id).map_err(|e| {
        warn!(blob = %id, error = %e, "rejected undecodable blob");
        e
    })?;
    validate_blob(&decoded.blob).map_err(|e| {
        warn!(blob = %id, error = %e, "rejected invalid blob");
        e
    })?;
    Ok(decoded)
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn update_document(&self, submission: &Submission) -> Result<()> {
        let change = verified(&submission.change)?;
        let change_id = change.content_id();

        if submission.is_genesis() {
            if !matches!(change.blob, Blob::Genesis(_)) {
                return Err(StoreError::UnexpectedBlob {
                    expected: "genesis",
                    found: change.blob.blob_type(),
                });
            }
            self.inner.write().await.blobs.insert(change_id, change);
            info!(genesis = %change_id, "primed document genesis");
            return Ok(());
        }

        let reference = verified(&submission.reference)?;
        let reference_id = reference.content_id();
        let mut inner = self.inner.write().await;

        match &change.blob {
            Blob::Genesis(_) => {}
            Blob::Change(c) => {
                for dep in std::iter::once(&c.genesis).chain(&c.deps) {
                    if !inner.is_change(dep) {
                        warn!(change = %change_id, dependency = %dep, "rejected change with missing dependency");
                        return Err(StoreError::MissingDependency {
                            blob: change_id,
                            dependency: *dep,
                        });
                    }
                }
            }
            other => {
                return Err(StoreError::UnexpectedBlob {
                    expected: "Change",
                    found: other.blob_type(),
                })
            }
        }

        let Blob::Ref(r) = &reference.blob else {
            return Err(StoreError::UnexpectedBlob {
                expected: "Ref",
                found: reference.blob.blob_type(),
            });
        };
        for dep in std::iter::once(&r.genesis_blob).chain(&r.heads) {
            if *dep != change_id && !inner.is_change(dep) {
                warn!(reference = %reference_id, dependency = %dep, "rejected ref with missing dependency");
                return Err(StoreError::MissingDependency {
                    blob: reference_id,
                    dependency: *dep,
                });
            }
        }

        let advance = inner.supersedes(&reference_id, r);
        if advance {
            inner.refs.insert(ref_key(r), reference_id);
        }
        info!(
            change = %change_id,
            reference = %reference_id,
            generation = r.generation,
            advanced = advance,
            "accepted document update"
        );
        inner.blobs.insert(change_id, change);
        inner.blobs.insert(reference_id, reference);
        Ok(())
    }

    async fn list_changes(&self, id: &ResourceId) -> Result<Vec<ChangeRecord>> {
        let inner = self.inner.read().await;
        let records = match inner.heads_for(id)? {
            Some(heads) => inner.collect_changes(&heads)?,
            None => Vec::new(),
        };
        debug!(document = %id, changes = records.len(), "listed changes");
        Ok(records)
    }

    async fn get_document(&self, id: &ResourceId) -> Result<Option<DocumentSnapshot>> {
        let inner = self.inner.read().await;

        let reference = match id.version() {
            Some(_) => None,
            None => {
                let key = document_key(id)?;
                match inner.refs.get(&key) {
                    Some(ref_id) => Some(*ref_id),
                    None => return Ok(None),
                }
            }
        };

        if let Some(r) = reference.as_ref().and_then(|ref_id| inner.reference(ref_id)) {
            if r.is_tombstone() {
                return Ok(Some(DocumentSnapshot {
                    genesis: r.genesis_blob,
                    reference,
                    version: Version::default(),
                    content: DocumentContent::default(),
                    deleted: true,
                }));
            }
        }

        let Some(heads) = inner.heads_for(id)? else {
            return Ok(None);
        };
        let records = inner.collect_changes(&heads)?;
        let (genesis, version, content) = inner.materialize(&records, self.options)?;
        debug!(document = %id, version = %version, blocks = content.body.len(), "materialized document");

        Ok(Some(DocumentSnapshot {
            genesis,
            reference,
            version,
            content,
            deleted: false,
        }))
    }

    async fn put_blob(&self, blob: &BlobRef) -> Result<ContentId> {
        let blob = verified(blob)?;
        if !matches!(
            blob.blob,
            Blob::Comment(_) | Blob::Profile(_) | Blob::Capability(_)
        ) {
            return Err(StoreError::UnexpectedBlob {
                expected: "Comment, Profile or Capability",
                found: blob.blob.blob_type(),
            });
        }
        let id = blob.content_id();
        debug!(blob = %id, kind = blob.blob.blob_type(), "stored blob");
        self.inner.write().await.blobs.insert(id, blob);
        Ok(id)
    }

    async fn get_blob(&self, id: &ContentId) -> Result<Option<BlobRef>> {
        Ok(self.inner.read().await.blobs.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypermedia_core::{
        Block, BlockNode, ChangeBuilder, CommentBuilder, GenesisBuilder, Keypair, RefBuilder,
        ROOT_PARENT,
    };
    use hypermedia_diff::flatten_to_operations;

    fn keypair() -> Keypair {
        Keypair::from_seed(&[7u8; 32])
    }

    fn genesis(kp: &Keypair) -> BlobRef {
        BlobRef::new(GenesisBuilder::new().sign(kp).unwrap()).unwrap()
    }

    fn change(kp: &Keypair, genesis: ContentId, deps: Vec<ContentId>, depth: u64, text: &str) -> BlobRef {
        let tree = vec![BlockNode::new(Block::paragraph("b1", text))];
        let blob = ChangeBuilder::new(genesis, deps, depth)
            .ops(flatten_to_operations(&tree, ROOT_PARENT).unwrap())
            .timestamp(depth * 10)
            .sign(kp)
            .unwrap();
        BlobRef::new(blob).unwrap()
    }

    fn reference(kp: &Keypair, genesis: ContentId, heads: Vec<ContentId>, generation: u64) -> BlobRef {
        let blob = RefBuilder::new(genesis)
            .heads(heads)
            .generation(generation)
            .timestamp(generation)
            .sign(kp)
            .unwrap();
        BlobRef::new(blob).unwrap()
    }

    fn doc_id(kp: &Keypair) -> ResourceId {
        ResourceId::new(kp.account_id()).unwrap()
    }

    #[tokio::test]
    async fn test_prime_then_update() {
        let kp = keypair();
        let store = MemoryStore::new();
        let g = genesis(&kp);
        store.update_document(&Submission::genesis(g.clone())).await.unwrap();
        assert!(store.get_document(&doc_id(&kp)).await.unwrap().is_none());

        let c = change(&kp, g.content_id(), vec![g.content_id()], 1, "hello");
        let r = reference(&kp, g.content_id(), vec![c.content_id()], 10);
        store.update_document(&Submission::new(c.clone(), r)).await.unwrap();

        let snapshot = store.get_document(&doc_id(&kp)).await.unwrap().unwrap();
        assert_eq!(snapshot.genesis, g.content_id());
        assert_eq!(snapshot.version.heads(), &[c.content_id()]);
        assert_eq!(snapshot.content.body[0].block.text, "hello");
        assert!(!snapshot.deleted);

        let changes = store.list_changes(&doc_id(&kp)).await.unwrap();
        let ids: Vec<_> = changes.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![g.content_id(), c.content_id()]);
        assert_eq!(changes[1].signer, Some(kp.principal()));
    }

    #[tokio::test]
    async fn test_missing_dependency_rejected() {
        let kp = keypair();
        let store = MemoryStore::new();
        let g = genesis(&kp);
        let c = change(&kp, g.content_id(), vec![g.content_id()], 1, "x");
        let r = reference(&kp, g.content_id(), vec![c.content_id()], 10);

        let err = store.update_document(&Submission::new(c, r)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingDependency { dependency, .. } if dependency == g.content_id()));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_tampered_bytes_rejected() {
        let kp = keypair();
        let store = MemoryStore::new();
        let mut g = genesis(&kp);
        let mut bytes = g.encoded.bytes.to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        g.encoded.bytes = bytes.into();
        assert!(matches!(
            store.update_document(&Submission::genesis(g)).await,
            Err(StoreError::Core(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_signature_rejected() {
        let kp = keypair();
        let store = MemoryStore::new();
        let mut blob = GenesisBuilder::new().sign(&kp).unwrap();
        if let Blob::Genesis(g) = &mut blob {
            g.header.signer = Keypair::from_seed(&[8u8; 32]).principal();
        }
        let g = BlobRef::new(blob).unwrap();
        assert!(matches!(
            store.update_document(&Submission::genesis(g)).await,
            Err(StoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_highest_generation_wins() {
        let kp = keypair();
        let store = MemoryStore::new();
        let g = genesis(&kp);
        store.update_document(&Submission::genesis(g.clone())).await.unwrap();

        let c1 = change(&kp, g.content_id(), vec![g.content_id()], 1, "one");
        let c2 = change(&kp, g.content_id(), vec![c1.content_id()], 2, "two");
        let r1 = reference(&kp, g.content_id(), vec![c1.content_id()], 10);
        let r2 = reference(&kp, g.content_id(), vec![c2.content_id()], 20);
        store.update_document(&Submission::new(c1.clone(), r1.clone())).await.unwrap();
        store.update_document(&Submission::new(c2.clone(), r2)).await.unwrap();
        // an older ref arriving late does not move the document back
        store.update_document(&Submission::new(c1, r1)).await.unwrap();

        let snapshot = store.get_document(&doc_id(&kp)).await.unwrap().unwrap();
        assert_eq!(snapshot.version.heads(), &[c2.content_id()]);
        assert_eq!(snapshot.content.body[0].block.text, "two");
    }

    #[tokio::test]
    async fn test_pinned_version() {
        let kp = keypair();
        let store = MemoryStore::new();
        let g = genesis(&kp);
        store.update_document(&Submission::genesis(g.clone())).await.unwrap();
        let c1 = change(&kp, g.content_id(), vec![g.content_id()], 1, "one");
        let c2 = change(&kp, g.content_id(), vec![c1.content_id()], 2, "two");
        store
            .update_document(&Submission::new(c1.clone(), reference(&kp, g.content_id(), vec![c1.content_id()], 10)))
            .await
            .unwrap();
        store
            .update_document(&Submission::new(c2, reference(&kp, g.content_id(), vec![], 0)))
            .await
            .unwrap();

        let pinned = doc_id(&kp).with_version(c1.content_id().to_string()).unwrap();
        let snapshot = store.get_document(&pinned).await.unwrap().unwrap();
        assert_eq!(snapshot.content.body[0].block.text, "one");
        assert_eq!(store.list_changes(&pinned).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_tombstone_marks_deleted() {
        let kp = keypair();
        let store = MemoryStore::new();
        let g = genesis(&kp);
        store.update_document(&Submission::genesis(g.clone())).await.unwrap();
        let c = change(&kp, g.content_id(), vec![g.content_id()], 1, "x");
        store
            .update_document(&Submission::new(c.clone(), reference(&kp, g.content_id(), vec![c.content_id()], 10)))
            .await
            .unwrap();
        let tombstone = BlobRef::new(
            RefBuilder::tombstone(g.content_id())
                .generation(11)
                .timestamp(11)
                .sign(&kp)
                .unwrap(),
        )
        .unwrap();
        store.update_document(&Submission::new(c, tombstone)).await.unwrap();

        let snapshot = store.get_document(&doc_id(&kp)).await.unwrap().unwrap();
        assert!(snapshot.deleted);
        assert!(snapshot.content.body.is_empty());
        assert!(store.list_changes(&doc_id(&kp)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_blob_kinds() {
        let kp = keypair();
        let store = MemoryStore::new();
        let g = genesis(&kp);
        assert!(matches!(
            store.put_blob(&g).await,
            Err(StoreError::UnexpectedBlob { .. })
        ));

        let comment = CommentBuilder::new(kp.principal(), "", vec![g.content_id()])
            .body(vec![BlockNode::new(Block::paragraph("c", "nice"))])
            .sign(&kp)
            .unwrap();
        let comment = BlobRef::new(comment).unwrap();
        let id = store.put_blob(&comment).await.unwrap();
        assert_eq!(id, comment.content_id());
        assert_eq!(store.get_blob(&id).await.unwrap(), Some(comment));
    }

    #[tokio::test]
    async fn test_unknown_document() {
        let store = MemoryStore::new();
        let kp = keypair();
        assert!(store.get_document(&doc_id(&kp)).await.unwrap().is_none());
        assert!(store.list_changes(&doc_id(&kp)).await.unwrap().is_empty());
    }
}
