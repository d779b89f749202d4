//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hypermedia::{Publisher, PublisherConfig};
use hypermedia_core::{
    derive_keypair, BlobRef, Block, BlockIdGenerator, BlockNode, ChangeBuilder, ContentId,
    CoreError, DocumentOperation, GenesisBuilder, Keypair, Principal, RefBuilder, ResourceId,
    SeededIdGenerator, Timestamp, ROOT_PARENT,
};
use hypermedia_diff::flatten_to_operations;
use hypermedia_store::MemoryStore;

/// The standard 12-word test mnemonic.
pub const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// First timestamp handed out by a fixture clock.
pub const FIXTURE_EPOCH: Timestamp = 1_700_000_000_000;

/// A test fixture with a keypair, a shared memory store and a ticking clock.
pub struct TestFixture {
    pub keypair: Keypair,
    pub store: Arc<MemoryStore>,
    clock: Arc<AtomicU64>,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self::with_keypair(Keypair::generate())
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self::with_keypair(Keypair::from_seed(&seed))
    }

    /// Create with the key derived from [`TEST_MNEMONIC`].
    pub fn from_test_mnemonic() -> Result<Self, CoreError> {
        Ok(Self::with_keypair(derive_keypair(TEST_MNEMONIC, "")?))
    }

    fn with_keypair(keypair: Keypair) -> Self {
        Self {
            keypair,
            store: Arc::new(MemoryStore::new()),
            clock: Arc::new(AtomicU64::new(FIXTURE_EPOCH)),
        }
    }

    /// The fixture's account.
    pub fn account(&self) -> Principal {
        self.keypair.principal()
    }

    /// Next timestamp; strictly increasing.
    pub fn tick(&self) -> Timestamp {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// A document id in this fixture's space.
    pub fn doc_id(&self, path: &[&str]) -> Result<ResourceId, CoreError> {
        ResourceId::new(self.keypair.account_id())?.with_path(path.iter().copied())
    }

    /// Deterministic block ids for this fixture's account.
    pub fn id_generator(&self) -> SeededIdGenerator {
        SeededIdGenerator::from_label(&self.keypair.account_id())
    }

    /// A publisher over the fixture's store, sharing its clock.
    pub fn publisher(&self) -> Publisher<MemoryStore> {
        self.publisher_with(PublisherConfig::default())
    }

    pub fn publisher_with(&self, config: PublisherConfig) -> Publisher<MemoryStore> {
        let clock = Arc::clone(&self.clock);
        Publisher::with_shared_store(self.keypair.clone(), Arc::clone(&self.store), config)
            .with_clock(move || clock.fetch_add(1, Ordering::SeqCst))
    }

    /// The account's genesis blob.
    pub fn genesis(&self) -> Result<BlobRef, CoreError> {
        BlobRef::new(GenesisBuilder::new().sign(&self.keypair)?)
    }

    /// A change on top of `deps` carrying `ops`.
    pub fn change(
        &self,
        genesis: ContentId,
        deps: Vec<ContentId>,
        depth: u64,
        ops: Vec<DocumentOperation>,
    ) -> Result<BlobRef, CoreError> {
        let blob = ChangeBuilder::new(genesis, deps, depth)
            .ops(ops)
            .timestamp(self.tick())
            .sign(&self.keypair)?;
        BlobRef::new(blob)
    }

    /// A ref pointing the document at `path` to `heads`.
    pub fn reference(
        &self,
        genesis: ContentId,
        heads: Vec<ContentId>,
        path: &str,
    ) -> Result<BlobRef, CoreError> {
        let ts = self.tick();
        let blob = RefBuilder::new(genesis)
            .heads(heads)
            .generation(ts)
            .path(path)
            .timestamp(ts)
            .sign(&self.keypair)?;
        BlobRef::new(blob)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create fixtures for several parties sharing nothing.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            seed[31] = 0x5a;
            TestFixture::with_seed(seed)
        })
        .collect()
}

/// A small document body: a heading with two paragraphs and a code block.
pub fn sample_body() -> Vec<BlockNode> {
    vec![
        BlockNode::new(Block::new("heading1", "Heading").with_text("Introduction")).with_children(
            vec![
                BlockNode::new(Block::paragraph("para0001", "First paragraph.")),
                BlockNode::new(Block::paragraph("para0002", "Second paragraph.")),
            ],
        ),
        BlockNode::new(
            Block::new("code0001", "Code")
                .with_text("fn main() {}")
                .with_attribute(hypermedia_core::block::LANGUAGE, "rust"),
        ),
    ]
}

/// One top-level paragraph per text, ids minted by `ids`.
pub fn paragraphs(ids: &mut impl BlockIdGenerator, texts: &[&str]) -> Vec<BlockNode> {
    texts
        .iter()
        .map(|text| BlockNode::new(Block::generated(ids, "Paragraph").with_text(*text)))
        .collect()
}

/// Operations that build `body` from nothing.
pub fn body_operations(body: &[BlockNode]) -> hypermedia_diff::Result<Vec<DocumentOperation>> {
    flatten_to_operations(body, ROOT_PARENT)
}
