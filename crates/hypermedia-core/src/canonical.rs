//! Canonical DAG-CBOR encoding for deterministic serialization.
//!
//! Rules:
//! - Map keys are text, unique, sorted by encoded bytes (shorter keys first)
//! - Integers use the smallest valid encoding
//! - Floats are always 64-bit; NaN and infinities are rejected
//! - Definite lengths only
//! - The only tag is 42 (content id link)
//!
//! The same logical value always produces the same bytes, and therefore the
//! same content id. Changing these rules invalidates every existing signature.

use bytes::Bytes;
use ciborium::value::Value;

use crate::crypto::{Ed25519Signature, Principal};
use crate::error::{CoreError, Result};
use crate::types::{Codec, ContentId};

/// CBOR tag for content id links.
pub const CID_TAG: u64 = 42;

/// Bytes plus the content id derived from them.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedBlob {
    /// Content id of `bytes`.
    pub content_id: ContentId,
    /// The canonical encoding.
    pub bytes: Bytes,
}

impl std::fmt::Debug for EncodedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncodedBlob({}, {} bytes)", self.content_id, self.bytes.len())
    }
}

/// Encode a value under the given codec and derive its content id.
///
/// `Codec::Raw` accepts a byte string only; the bytes are addressed as-is.
pub fn encode(value: &Value, codec: Codec) -> Result<EncodedBlob> {
    let bytes = match codec {
        Codec::DagCbor => encode_canonical(value)?,
        Codec::Raw => match value {
            Value::Bytes(b) => b.clone(),
            _ => {
                return Err(CoreError::EncodingError(
                    "raw codec requires a byte string".to_string(),
                ))
            }
        },
    };
    Ok(EncodedBlob {
        content_id: ContentId::compute(codec, &bytes),
        bytes: Bytes::from(bytes),
    })
}

/// Encode a CBOR value to canonical bytes.
pub fn encode_canonical(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value(&mut buf, value)?;
    Ok(buf)
}

/// Decode CBOR bytes into a value.
pub fn decode_value(bytes: &[u8]) -> Result<Value> {
    let cursor = std::io::Cursor::new(bytes);
    ciborium::from_reader(cursor).map_err(|e| CoreError::DecodingError(e.to_string()))
}

/// True if `bytes` is exactly the canonical encoding of what it decodes to.
pub fn is_canonical(bytes: &[u8]) -> bool {
    match decode_value(bytes).and_then(|v| encode_canonical(&v)) {
        Ok(reencoded) => reencoded == bytes,
        Err(_) => false,
    }
}

fn encode_value(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr)?,
        Value::Map(entries) => encode_map(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(f) => encode_float(buf, *f)?,
        Value::Tag(tag, inner) => encode_tag(buf, *tag, inner)?,
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".to_string(),
            ))
        }
    }
    Ok(())
}

fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_float(buf: &mut Vec<u8>, f: f64) -> Result<()> {
    if !f.is_finite() {
        return Err(CoreError::EncodingError(format!(
            "non-finite float {f} has no canonical form"
        )));
    }
    buf.push(0xfb);
    buf.extend_from_slice(&f.to_bits().to_be_bytes());
    Ok(())
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) -> Result<()> {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value(buf, item)?;
    }
    Ok(())
}

fn encode_tag(buf: &mut Vec<u8>, tag: u64, inner: &Value) -> Result<()> {
    if tag != CID_TAG {
        return Err(CoreError::EncodingError(format!("unsupported tag {tag}")));
    }
    match inner {
        Value::Bytes(b) if b.first() == Some(&0x00) => {
            encode_uint(buf, 6, tag);
            encode_bytes(buf, b);
            Ok(())
        }
        _ => Err(CoreError::EncodingError(
            "tag 42 must wrap identity-multibase bytes".to_string(),
        )),
    }
}

fn encode_map(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut sorted = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let key = match k {
            Value::Text(s) => s,
            _ => {
                return Err(CoreError::EncodingError(
                    "map keys must be text".to_string(),
                ))
            }
        };
        let mut key_bytes = Vec::with_capacity(key.len() + 1);
        encode_text(&mut key_bytes, key);
        sorted.push((key_bytes, v));
    }

    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    if let Some(w) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(CoreError::EncodingError(format!(
            "duplicate map key {:?}",
            String::from_utf8_lossy(&w[0].0[1..])
        )));
    }

    encode_uint(buf, 5, sorted.len() as u64);
    for (key_bytes, v) in sorted {
        buf.extend_from_slice(&key_bytes);
        encode_value(buf, v)?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Value construction helpers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub(crate) fn uint(n: u64) -> Value {
    Value::Integer(n.into())
}

pub(crate) fn cid_link(cid: &ContentId) -> Value {
    let mut bytes = Vec::with_capacity(ContentId::BYTE_LEN + 1);
    bytes.push(0x00);
    bytes.extend_from_slice(&cid.to_bytes());
    Value::Tag(CID_TAG, Box::new(Value::Bytes(bytes)))
}

pub(crate) fn cid_links(cids: &[ContentId]) -> Value {
    Value::Array(cids.iter().map(cid_link).collect())
}

pub(crate) fn principal_bytes(p: &Principal) -> Value {
    Value::Bytes(p.to_bytes().to_vec())
}

pub(crate) fn signature_bytes(sig: &Ed25519Signature) -> Value {
    Value::Bytes(sig.as_bytes().to_vec())
}

pub(crate) fn entry(key: &str, value: Value) -> (Value, Value) {
    (text(key), value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Value reading helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Read a CID link value.
pub(crate) fn read_cid(value: &Value) -> Result<ContentId> {
    match value {
        Value::Tag(CID_TAG, inner) => match inner.as_ref() {
            Value::Bytes(b) if b.first() == Some(&0x00) => ContentId::from_bytes(&b[1..]),
            _ => Err(CoreError::MalformedBlob("invalid cid link payload".into())),
        },
        _ => Err(CoreError::MalformedBlob("expected cid link".into())),
    }
}

/// Read-only view over a CBOR map with text keys.
pub(crate) struct MapView<'a> {
    entries: &'a [(Value, Value)],
    context: &'static str,
}

impl<'a> MapView<'a> {
    pub(crate) fn new(value: &'a Value, context: &'static str) -> Result<Self> {
        match value {
            Value::Map(entries) => Ok(Self { entries, context }),
            _ => Err(CoreError::MalformedBlob(format!("{context}: expected map"))),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&'a Value> {
        self.entries
            .iter()
            .find(|(k, _)| matches!(k, Value::Text(s) if s == key))
            .map(|(_, v)| v)
    }

    /// Entries whose key is not in `known`, in their original order.
    pub(crate) fn remaining(&self, known: &[&str]) -> Vec<(&'a str, &'a Value)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| match k {
                Value::Text(s) if !known.contains(&s.as_str()) => Some((s.as_str(), v)),
                _ => None,
            })
            .collect()
    }

    fn malformed(&self, key: &str, what: &str) -> CoreError {
        CoreError::MalformedBlob(format!("{}: field {key:?} {what}", self.context))
    }

    fn required(&self, key: &str) -> Result<&'a Value> {
        self.get(key).ok_or_else(|| self.malformed(key, "is missing"))
    }

    pub(crate) fn text(&self, key: &str) -> Result<&'a str> {
        match self.required(key)? {
            Value::Text(s) => Ok(s),
            _ => Err(self.malformed(key, "must be text")),
        }
    }

    pub(crate) fn opt_text(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Text(s)) => Ok(Some(s)),
            Some(_) => Err(self.malformed(key, "must be text")),
        }
    }

    pub(crate) fn u64(&self, key: &str) -> Result<u64> {
        self.opt_u64(key)?
            .ok_or_else(|| self.malformed(key, "is missing"))
    }

    pub(crate) fn opt_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Integer(i)) => {
                let n: i128 = (*i).into();
                u64::try_from(n)
                    .map(Some)
                    .map_err(|_| self.malformed(key, "is out of range"))
            }
            Some(_) => Err(self.malformed(key, "must be an integer")),
        }
    }

    pub(crate) fn bytes(&self, key: &str) -> Result<&'a [u8]> {
        match self.required(key)? {
            Value::Bytes(b) => Ok(b),
            _ => Err(self.malformed(key, "must be bytes")),
        }
    }

    pub(crate) fn array(&self, key: &str) -> Result<&'a [Value]> {
        match self.required(key)? {
            Value::Array(items) => Ok(items),
            _ => Err(self.malformed(key, "must be an array")),
        }
    }

    pub(crate) fn opt_array(&self, key: &str) -> Result<&'a [Value]> {
        match self.get(key) {
            None => Ok(&[]),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(self.malformed(key, "must be an array")),
        }
    }

    pub(crate) fn cid(&self, key: &str) -> Result<ContentId> {
        read_cid(self.required(key)?)
    }

    pub(crate) fn opt_cid(&self, key: &str) -> Result<Option<ContentId>> {
        self.get(key).map(read_cid).transpose()
    }

    pub(crate) fn cids(&self, key: &str) -> Result<Vec<ContentId>> {
        self.array(key)?.iter().map(read_cid).collect()
    }

    pub(crate) fn principal(&self, key: &str) -> Result<Principal> {
        Principal::from_bytes(self.bytes(key)?)
    }

    pub(crate) fn opt_principal(&self, key: &str) -> Result<Option<Principal>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bytes(b)) => Principal::from_bytes(b).map(Some),
            Some(_) => Err(self.malformed(key, "must be bytes")),
        }
    }
}
