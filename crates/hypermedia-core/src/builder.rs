//! Builders for every blob kind.
//!
//! Each builder collects fields, then `.sign(&keypair)` fills in the signer,
//! drops fields equal to their implied defaults, and signs.

use crate::blob::{
    Blob, BlobHeader, Capability, Comment, DocumentChange, GenesisChange, Profile, Ref, Role,
};
use crate::block::BlockNode;
use crate::crypto::{Keypair, Principal};
use crate::error::Result;
use crate::operation::DocumentOperation;
use crate::types::{ContentId, Timestamp};

/// Builder for the first change of a document.
#[derive(Debug, Default)]
pub struct GenesisBuilder;

impl GenesisBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Sign. The genesis timestamp is always 0, so one key yields one genesis.
    pub fn sign(self, keypair: &Keypair) -> Result<Blob> {
        Blob::Genesis(GenesisChange {
            header: BlobHeader::unsigned(keypair.principal(), 0),
        })
        .sign(keypair)
    }
}

/// Builder for document changes.
#[derive(Debug)]
pub struct ChangeBuilder {
    genesis: ContentId,
    deps: Vec<ContentId>,
    depth: u64,
    ops: Vec<DocumentOperation>,
    timestamp: Timestamp,
}

impl ChangeBuilder {
    /// Start a change on top of `deps` at `depth`.
    pub fn new(genesis: ContentId, deps: Vec<ContentId>, depth: u64) -> Self {
        Self {
            genesis,
            deps,
            depth,
            ops: Vec::new(),
            timestamp: 0,
        }
    }

    /// Add one operation.
    pub fn op(mut self, op: DocumentOperation) -> Self {
        self.ops.push(op);
        self
    }

    /// Add operations.
    pub fn ops(mut self, ops: impl IntoIterator<Item = DocumentOperation>) -> Self {
        self.ops.extend(ops);
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = ts;
        self
    }

    /// Build and sign the change.
    pub fn sign(self, keypair: &Keypair) -> Result<Blob> {
        Blob::Change(DocumentChange {
            header: BlobHeader::unsigned(keypair.principal(), self.timestamp),
            genesis: self.genesis,
            deps: self.deps,
            depth: self.depth,
            op_count: self.ops.len() as u64,
            ops: self.ops,
        })
        .sign(keypair)
    }
}

/// Builder for refs.
#[derive(Debug)]
pub struct RefBuilder {
    genesis: ContentId,
    heads: Vec<ContentId>,
    generation: u64,
    path: Option<String>,
    space: Option<Principal>,
    capability: Option<ContentId>,
    timestamp: Timestamp,
}

impl RefBuilder {
    /// Start a ref for the document rooted at `genesis`.
    pub fn new(genesis: ContentId) -> Self {
        Self {
            genesis,
            heads: Vec::new(),
            generation: 0,
            path: None,
            space: None,
            capability: None,
            timestamp: 0,
        }
    }

    /// A ref with no heads, marking the document deleted.
    pub fn tombstone(genesis: ContentId) -> Self {
        Self::new(genesis)
    }

    /// Set the heads.
    pub fn heads(mut self, heads: Vec<ContentId>) -> Self {
        self.heads = heads;
        self
    }

    /// Set the generation.
    pub fn generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Set the document path. An empty path means the space root.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = (!path.is_empty()).then_some(path);
        self
    }

    /// Set the owning space.
    pub fn space(mut self, space: Principal) -> Self {
        self.space = Some(space);
        self
    }

    /// Attach the capability the signer writes under.
    pub fn capability(mut self, capability: ContentId) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = ts;
        self
    }

    /// Build and sign the ref.
    pub fn sign(self, keypair: &Keypair) -> Result<Blob> {
        let signer = keypair.principal();
        Blob::Ref(Ref {
            header: BlobHeader::unsigned(signer, self.timestamp),
            genesis_blob: self.genesis,
            heads: self.heads,
            generation: self.generation,
            path: self.path,
            space: self.space.filter(|s| *s != signer),
            capability: self.capability,
        })
        .sign(keypair)
    }
}

/// Builder for comments.
#[derive(Debug)]
pub struct CommentBuilder {
    space: Principal,
    path: String,
    version: Vec<ContentId>,
    body: Vec<BlockNode>,
    thread_root: Option<ContentId>,
    reply_parent: Option<ContentId>,
    capability: Option<ContentId>,
    timestamp: Timestamp,
}

impl CommentBuilder {
    /// Start a comment on `version` of the document at `space` and `path`.
    pub fn new(space: Principal, path: impl Into<String>, version: Vec<ContentId>) -> Self {
        Self {
            space,
            path: path.into(),
            version,
            body: Vec::new(),
            thread_root: None,
            reply_parent: None,
            capability: None,
            timestamp: 0,
        }
    }

    /// Set the body.
    pub fn body(mut self, body: Vec<BlockNode>) -> Self {
        self.body = body;
        self
    }

    /// Reply within a thread. `parent` is the comment replied to.
    pub fn reply(mut self, thread_root: ContentId, parent: ContentId) -> Self {
        self.thread_root = Some(thread_root);
        self.reply_parent = Some(parent);
        self
    }

    /// Attach the capability the signer writes under.
    pub fn capability(mut self, capability: ContentId) -> Self {
        self.capability = Some(capability);
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = ts;
        self
    }

    /// Build and sign the comment.
    pub fn sign(self, keypair: &Keypair) -> Result<Blob> {
        let signer = keypair.principal();
        let reply_parent = self.reply_parent.filter(|p| Some(*p) != self.thread_root);
        Blob::Comment(Comment {
            header: BlobHeader::unsigned(signer, self.timestamp),
            space: Some(self.space).filter(|s| *s != signer),
            path: self.path,
            version: self.version,
            thread_root: self.thread_root,
            reply_parent,
            capability: self.capability,
            body: self.body,
        })
        .sign(keypair)
    }
}

/// Builder for profiles.
#[derive(Debug, Default)]
pub struct ProfileBuilder {
    name: Option<String>,
    avatar: Option<String>,
    description: Option<String>,
    alias: Option<Principal>,
    account: Option<Principal>,
    timestamp: Timestamp,
}

impl ProfileBuilder {
    /// A named profile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// A profile redirecting to another key. Carries nothing else.
    pub fn alias(target: Principal) -> Self {
        Self {
            alias: Some(target),
            ..Default::default()
        }
    }

    /// Set the avatar URI.
    pub fn avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the account the signer acts for.
    pub fn account(mut self, account: Principal) -> Self {
        self.account = Some(account);
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = ts;
        self
    }

    /// Build and sign the profile.
    pub fn sign(self, keypair: &Keypair) -> Result<Blob> {
        let signer = keypair.principal();
        let profile = if self.alias.is_some() {
            Profile {
                header: BlobHeader::unsigned(signer, self.timestamp),
                name: None,
                avatar: None,
                description: None,
                alias: self.alias,
                account: None,
            }
        } else {
            Profile {
                header: BlobHeader::unsigned(signer, self.timestamp),
                name: self.name,
                avatar: self.avatar,
                description: self.description,
                alias: None,
                account: self.account.filter(|a| *a != signer),
            }
        };
        Blob::Profile(profile).sign(keypair)
    }
}

/// Builder for capabilities.
#[derive(Debug)]
pub struct CapabilityBuilder {
    delegate: Principal,
    role: Role,
    path: Option<String>,
    label: Option<String>,
    audience: Option<Principal>,
    timestamp: Timestamp,
}

impl CapabilityBuilder {
    /// Grant `role` to `delegate`.
    pub fn new(delegate: Principal, role: Role) -> Self {
        Self {
            delegate,
            role,
            path: None,
            label: None,
            audience: None,
            timestamp: 0,
        }
    }

    /// Limit the grant to a path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set a human-readable label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the audience for direct authentication.
    pub fn audience(mut self, audience: Principal) -> Self {
        self.audience = Some(audience);
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = ts;
        self
    }

    /// Build and sign the capability.
    pub fn sign(self, keypair: &Keypair) -> Result<Blob> {
        Blob::Capability(Capability {
            header: BlobHeader::unsigned(keypair.principal(), self.timestamp),
            delegate: self.delegate,
            role: self.role,
            path: self.path,
            label: self.label,
            audience: self.audience,
        })
        .sign(keypair)
    }
}
