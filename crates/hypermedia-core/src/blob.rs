//! Blobs: immutable, signed, content-addressed units of document history.
//!
//! Every blob carries a signer, a signature and a timestamp. The signature
//! covers the canonical encoding of the blob with `sig` set to 64 zero bytes.
//! Genesis and document changes share the wire type `"Change"`; a genesis is
//! the form without a `genesis` link.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::block::BlockNode;
use crate::canonical::{
    self, cid_link, cid_links, entry, principal_bytes, signature_bytes, text, uint, EncodedBlob,
    MapView,
};
use crate::crypto::{Ed25519Signature, Keypair, Principal};
use crate::error::{CoreError, Result};
use crate::operation::DocumentOperation;
use crate::types::{Codec, ContentId, Timestamp};

const HEADER_KEYS: [&str; 4] = ["type", "signer", "sig", "ts"];

/// Fields shared by every blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHeader {
    pub signer: Principal,
    pub sig: Ed25519Signature,
    pub ts: Timestamp,
}

impl BlobHeader {
    /// An unsigned header.
    pub fn unsigned(signer: Principal, ts: Timestamp) -> Self {
        Self {
            signer,
            sig: Ed25519Signature::ZERO,
            ts,
        }
    }

    fn entries(&self, blob_type: &str, sig: &Ed25519Signature) -> Vec<(Value, Value)> {
        vec![
            entry("type", text(blob_type)),
            entry("signer", principal_bytes(&self.signer)),
            entry("sig", signature_bytes(sig)),
            entry("ts", uint(self.ts)),
        ]
    }

    fn from_map(map: &MapView<'_>) -> Result<Self> {
        Ok(Self {
            signer: map.principal("signer")?,
            sig: Ed25519Signature::from_slice(map.bytes("sig")?)?,
            ts: map.u64("ts")?,
        })
    }
}

/// The first change of a document. Carries no dependencies and sits at depth 0.
#[derive(Debug, Clone, PartialEq)]
pub struct GenesisChange {
    pub header: BlobHeader,
}

/// A change that applies operations on top of its dependencies.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChange {
    pub header: BlobHeader,
    pub genesis: ContentId,
    pub deps: Vec<ContentId>,
    pub depth: u64,
    pub ops: Vec<DocumentOperation>,
    /// Declared number of operations, checked against `ops` by validation.
    pub op_count: u64,
}

/// A pointer advancing a document to a set of heads.
#[derive(Debug, Clone, PartialEq)]
pub struct Ref {
    pub header: BlobHeader,
    pub genesis_blob: ContentId,
    pub heads: Vec<ContentId>,
    pub generation: u64,
    pub path: Option<String>,
    /// Owning space when it differs from the signer.
    pub space: Option<Principal>,
    pub capability: Option<ContentId>,
}

impl Ref {
    /// A ref with no heads marks the document deleted.
    pub fn is_tombstone(&self) -> bool {
        self.heads.is_empty()
    }

    /// The space this ref belongs to.
    pub fn space(&self) -> Principal {
        self.space.unwrap_or(self.header.signer)
    }
}

/// A comment on a specific version of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub header: BlobHeader,
    pub space: Option<Principal>,
    pub path: String,
    pub version: Vec<ContentId>,
    pub thread_root: Option<ContentId>,
    pub reply_parent: Option<ContentId>,
    pub capability: Option<ContentId>,
    pub body: Vec<BlockNode>,
}

impl Comment {
    /// The space of the target document.
    pub fn space(&self) -> Principal {
        self.space.unwrap_or(self.header.signer)
    }

    /// The comment this one replies to, if any.
    pub fn replying_to(&self) -> Option<ContentId> {
        self.reply_parent.or(self.thread_root)
    }
}

/// Identity information for an account, or an alias to another key.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub header: BlobHeader,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub description: Option<String>,
    pub alias: Option<Principal>,
    /// Account the signer acts for, when it differs from the signer.
    pub account: Option<Principal>,
}

/// Access role granted by a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Writer,
    Agent,
}

impl Role {
    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Writer => "WRITER",
            Role::Agent => "AGENT",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "WRITER" => Ok(Role::Writer),
            "AGENT" => Ok(Role::Agent),
            other => Err(CoreError::MalformedBlob(format!("unknown role {other:?}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rights delegated from the signer to another key.
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    pub header: BlobHeader,
    pub delegate: Principal,
    pub role: Role,
    pub path: Option<String>,
    pub label: Option<String>,
    pub audience: Option<Principal>,
}

/// Every kind of blob the engine builds or reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Blob {
    Genesis(GenesisChange),
    Change(DocumentChange),
    Ref(Ref),
    Comment(Comment),
    Profile(Profile),
    Capability(Capability),
}

impl Blob {
    /// The wire `type` tag.
    pub fn blob_type(&self) -> &'static str {
        match self {
            Blob::Genesis(_) | Blob::Change(_) => "Change",
            Blob::Ref(_) => "Ref",
            Blob::Comment(_) => "Comment",
            Blob::Profile(_) => "Profile",
            Blob::Capability(_) => "Capability",
        }
    }

    /// Shared header.
    pub fn header(&self) -> &BlobHeader {
        match self {
            Blob::Genesis(b) => &b.header,
            Blob::Change(b) => &b.header,
            Blob::Ref(b) => &b.header,
            Blob::Comment(b) => &b.header,
            Blob::Profile(b) => &b.header,
            Blob::Capability(b) => &b.header,
        }
    }

    fn header_mut(&mut self) -> &mut BlobHeader {
        match self {
            Blob::Genesis(b) => &mut b.header,
            Blob::Change(b) => &mut b.header,
            Blob::Ref(b) => &mut b.header,
            Blob::Comment(b) => &mut b.header,
            Blob::Profile(b) => &mut b.header,
            Blob::Capability(b) => &mut b.header,
        }
    }

    /// The signing principal.
    pub fn signer(&self) -> &Principal {
        &self.header().signer
    }

    /// The blob timestamp.
    pub fn ts(&self) -> Timestamp {
        self.header().ts
    }

    /// True once a signature has been stored.
    pub fn is_signed(&self) -> bool {
        !self.header().sig.is_zero()
    }

    /// Wire value, including the current signature.
    pub fn to_value(&self) -> Result<Value> {
        self.to_value_with(&self.header().sig)
    }

    /// Bytes covered by the signature: the canonical encoding with a zero `sig`.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        canonical::encode_canonical(&self.to_value_with(&Ed25519Signature::ZERO)?)
    }

    /// Sign as `keypair`. The signer field is set to the keypair's principal.
    pub fn sign(mut self, keypair: &Keypair) -> Result<Self> {
        let header = self.header_mut();
        header.signer = keypair.principal();
        header.sig = Ed25519Signature::ZERO;
        let sig = keypair.sign(&self.signing_bytes()?);
        self.header_mut().sig = sig;
        Ok(self)
    }

    /// Verify the signature against the signer.
    pub fn verify(&self) -> Result<()> {
        let header = self.header();
        header.signer.verify(&self.signing_bytes()?, &header.sig)
    }

    /// Canonical encoding and content id.
    pub fn encode(&self) -> Result<EncodedBlob> {
        canonical::encode(&self.to_value()?, Codec::DagCbor)
    }

    fn to_value_with(&self, sig: &Ed25519Signature) -> Result<Value> {
        let mut entries = self.header().entries(self.blob_type(), sig);
        match self {
            Blob::Genesis(_) => {}
            Blob::Change(change) => {
                let ops = change
                    .ops
                    .iter()
                    .map(DocumentOperation::to_value)
                    .collect::<Result<Vec<_>>>()?;
                entries.push(entry("genesis", cid_link(&change.genesis)));
                entries.push(entry("deps", cid_links(&change.deps)));
                entries.push(entry("depth", uint(change.depth)));
                entries.push(entry(
                    "body",
                    Value::Map(vec![
                        entry("ops", Value::Array(ops)),
                        entry("opCount", uint(change.op_count)),
                    ]),
                ));
            }
            Blob::Ref(r) => {
                entries.push(entry("genesisBlob", cid_link(&r.genesis_blob)));
                entries.push(entry("heads", cid_links(&r.heads)));
                entries.push(entry("generation", uint(r.generation)));
                push_opt(&mut entries, "path", r.path.as_deref().map(text));
                push_opt(&mut entries, "space", r.space.as_ref().map(principal_bytes));
                push_opt(&mut entries, "capability", r.capability.as_ref().map(cid_link));
            }
            Blob::Comment(c) => {
                let body = c
                    .body
                    .iter()
                    .map(BlockNode::to_value)
                    .collect::<Result<Vec<_>>>()?;
                entries.push(entry("path", text(&c.path)));
                entries.push(entry("version", cid_links(&c.version)));
                entries.push(entry("body", Value::Array(body)));
                push_opt(&mut entries, "space", c.space.as_ref().map(principal_bytes));
                push_opt(&mut entries, "threadRoot", c.thread_root.as_ref().map(cid_link));
                push_opt(&mut entries, "replyParent", c.reply_parent.as_ref().map(cid_link));
                push_opt(&mut entries, "capability", c.capability.as_ref().map(cid_link));
            }
            Blob::Profile(p) => {
                push_opt(&mut entries, "name", p.name.as_deref().map(text));
                push_opt(&mut entries, "avatar", p.avatar.as_deref().map(text));
                push_opt(&mut entries, "description", p.description.as_deref().map(text));
                push_opt(&mut entries, "alias", p.alias.as_ref().map(principal_bytes));
                push_opt(&mut entries, "account", p.account.as_ref().map(principal_bytes));
            }
            Blob::Capability(c) => {
                entries.push(entry("delegate", principal_bytes(&c.delegate)));
                entries.push(entry("role", text(c.role.as_str())));
                push_opt(&mut entries, "path", c.path.as_deref().map(text));
                push_opt(&mut entries, "label", c.label.as_deref().map(text));
                push_opt(&mut entries, "audience", c.audience.as_ref().map(principal_bytes));
            }
        }
        Ok(Value::Map(entries))
    }

    /// Map a decoded wire value to a typed blob. Unknown fields are rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        let map = MapView::new(value, "blob")?;
        let header = BlobHeader::from_map(&map)?;
        let blob_type = map.text("type")?;
        let (blob, known): (Blob, &[&str]) = match blob_type {
            "Change" if map.get("genesis").is_none() => {
                (Blob::Genesis(GenesisChange { header }), &[])
            }
            "Change" => {
                let body = map
                    .get("body")
                    .ok_or_else(|| CoreError::MalformedBlob("change: field \"body\" is missing".into()))?;
                let body = MapView::new(body, "change body")?;
                let ops = body
                    .opt_array("ops")?
                    .iter()
                    .map(DocumentOperation::from_value)
                    .collect::<Result<Vec<_>>>()?;
                let change = DocumentChange {
                    header,
                    genesis: map.cid("genesis")?,
                    deps: map.cids("deps")?,
                    depth: map.u64("depth")?,
                    op_count: body.opt_u64("opCount")?.unwrap_or(ops.len() as u64),
                    ops,
                };
                (Blob::Change(change), &["genesis", "deps", "depth", "body"])
            }
            "Ref" => {
                let r = Ref {
                    header,
                    genesis_blob: map.cid("genesisBlob")?,
                    heads: map.cids("heads")?,
                    generation: map.u64("generation")?,
                    path: map.opt_text("path")?.map(str::to_string),
                    space: map.opt_principal("space")?,
                    capability: map.opt_cid("capability")?,
                };
                (
                    Blob::Ref(r),
                    &["genesisBlob", "heads", "generation", "path", "space", "capability"],
                )
            }
            "Comment" => {
                let c = Comment {
                    header,
                    space: map.opt_principal("space")?,
                    path: map.opt_text("path")?.unwrap_or_default().to_string(),
                    version: map.cids("version")?,
                    thread_root: map.opt_cid("threadRoot")?,
                    reply_parent: map.opt_cid("replyParent")?,
                    capability: map.opt_cid("capability")?,
                    body: map
                        .opt_array("body")?
                        .iter()
                        .map(BlockNode::from_value)
                        .collect::<Result<_>>()?,
                };
                (
                    Blob::Comment(c),
                    &["space", "path", "version", "threadRoot", "replyParent", "capability", "body"],
                )
            }
            "Profile" => {
                let p = Profile {
                    header,
                    name: map.opt_text("name")?.map(str::to_string),
                    avatar: map.opt_text("avatar")?.map(str::to_string),
                    description: map.opt_text("description")?.map(str::to_string),
                    alias: map.opt_principal("alias")?,
                    account: map.opt_principal("account")?,
                };
                (
                    Blob::Profile(p),
                    &["name", "avatar", "description", "alias", "account"],
                )
            }
            "Capability" => {
                let c = Capability {
                    header,
                    delegate: map.principal("delegate")?,
                    role: Role::parse(map.text("role")?)?,
                    path: map.opt_text("path")?.map(str::to_string),
                    label: map.opt_text("label")?.map(str::to_string),
                    audience: map.opt_principal("audience")?,
                };
                (
                    Blob::Capability(c),
                    &["delegate", "role", "path", "label", "audience"],
                )
            }
            other => {
                return Err(CoreError::MalformedBlob(format!(
                    "unknown blob type {other:?}"
                )))
            }
        };

        let mut all_known = HEADER_KEYS.to_vec();
        all_known.extend_from_slice(known);
        if let Some((key, _)) = map.remaining(&all_known).first() {
            return Err(CoreError::MalformedBlob(format!(
                "{blob_type}: unexpected field {key:?}"
            )));
        }
        Ok(blob)
    }
}

fn push_opt(entries: &mut Vec<(Value, Value)>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        entries.push(entry(key, value));
    }
}

/// Decode received bytes, checking the content id and canonical form.
pub fn decode_blob(bytes: &[u8], expected: &ContentId) -> Result<Blob> {
    let actual = ContentId::compute(expected.codec(), bytes);
    if actual != *expected {
        return Err(CoreError::ContentIdMismatch {
            expected: *expected,
            actual,
        });
    }
    if expected.codec() != Codec::DagCbor {
        return Err(CoreError::DecodingError(format!(
            "blobs must be dag-cbor, got {:?}",
            expected.codec()
        )));
    }
    let value = canonical::decode_value(bytes)?;
    if canonical::encode_canonical(&value)? != bytes {
        return Err(CoreError::DecodingError(
            "bytes are not in canonical form".to_string(),
        ));
    }
    Blob::from_value(&value)
}

/// A typed blob together with its encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobRef {
    pub blob: Blob,
    pub encoded: EncodedBlob,
}

impl BlobRef {
    /// Encode a blob.
    pub fn new(blob: Blob) -> Result<Self> {
        let encoded = blob.encode()?;
        Ok(Self { blob, encoded })
    }

    /// Decode received bytes; see [`decode_blob`].
    pub fn decode(bytes: impl Into<bytes::Bytes>, expected: ContentId) -> Result<Self> {
        let bytes = bytes.into();
        let blob = decode_blob(&bytes, &expected)?;
        Ok(Self {
            blob,
            encoded: EncodedBlob {
                content_id: expected,
                bytes,
            },
        })
    }

    /// Content id of the encoding.
    pub fn content_id(&self) -> ContentId {
        self.encoded.content_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;

    fn keypair() -> Keypair {
        Keypair::from_seed(&[9u8; 32])
    }

    fn genesis() -> Blob {
        Blob::Genesis(GenesisChange {
            header: BlobHeader::unsigned(keypair().principal(), 0),
        })
        .sign(&keypair())
        .unwrap()
    }

    fn change(genesis: ContentId) -> Blob {
        Blob::Change(DocumentChange {
            header: BlobHeader::unsigned(keypair().principal(), 1_700_000_000_000),
            genesis,
            deps: vec![genesis],
            depth: 1,
            ops: vec![DocumentOperation::ReplaceBlock {
                block: Block::paragraph("a", "foo"),
            }],
            op_count: 1,
        })
        .sign(&keypair())
        .unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let blob = genesis();
        assert!(blob.is_signed());
        blob.verify().unwrap();
    }

    #[test]
    fn test_tampered_blob_fails() {
        let blob = genesis();
        let Blob::Genesis(mut g) = blob else {
            panic!("expected genesis")
        };
        g.header.ts = 1;
        assert!(matches!(
            Blob::Genesis(g).verify(),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_change_decode_roundtrip() {
        let g = genesis().encode().unwrap();
        let blob = change(g.content_id);
        let encoded = blob.encode().unwrap();
        let decoded = decode_blob(&encoded.bytes, &encoded.content_id).unwrap();
        assert_eq!(decoded, blob);
        decoded.verify().unwrap();
    }

    #[test]
    fn test_wrong_cid_rejected() {
        let encoded = genesis().encode().unwrap();
        let other = ContentId::compute(Codec::DagCbor, b"other");
        assert!(matches!(
            decode_blob(&encoded.bytes, &other),
            Err(CoreError::ContentIdMismatch { .. })
        ));
    }

    #[test]
    fn test_non_canonical_rejected() {
        // {"b": 1, "a": 2} with keys out of order
        let bytes = [0xa2, 0x61, b'b', 0x01, 0x61, b'a', 0x02];
        let cid = ContentId::compute(Codec::DagCbor, &bytes);
        assert!(matches!(
            decode_blob(&bytes, &cid),
            Err(CoreError::DecodingError(_))
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let blob = genesis();
        let Value::Map(mut entries) = blob.to_value().unwrap() else {
            panic!("expected map")
        };
        entries.push(entry("extra", uint(1)));
        assert!(matches!(
            Blob::from_value(&Value::Map(entries)),
            Err(CoreError::MalformedBlob(_))
        ));
    }

    #[test]
    fn test_blob_ref_decode() {
        let blob_ref = BlobRef::new(genesis()).unwrap();
        let decoded = BlobRef::decode(blob_ref.encoded.bytes.clone(), blob_ref.content_id()).unwrap();
        assert_eq!(decoded, blob_ref);
    }
}
