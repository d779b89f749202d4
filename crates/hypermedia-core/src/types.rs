//! Strong type definitions shared by every blob.
//!
//! Content identifiers are CIDv1 values over a SHA-256 digest. Versions are
//! ordered sets of change identifiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Sha256Hash;
use crate::error::{CoreError, Result};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// CID version byte.
const CID_V1: u8 = 0x01;

/// Multihash code for sha2-256.
const SHA2_256: u8 = 0x12;

/// Digest length of sha2-256.
const SHA2_256_LEN: u8 = 0x20;

/// Multibase prefix for base32 lower-case, no padding.
const MULTIBASE_BASE32: char = 'b';

/// Content codec of the addressed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Codec {
    /// Canonical DAG-CBOR.
    DagCbor,
    /// Opaque bytes.
    Raw,
}

impl Codec {
    /// The multicodec code.
    pub const fn code(self) -> u8 {
        match self {
            Codec::DagCbor => 0x71,
            Codec::Raw => 0x55,
        }
    }

    /// Look up a codec by multicodec code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x71 => Some(Codec::DagCbor),
            0x55 => Some(Codec::Raw),
            _ => None,
        }
    }
}

/// A content identifier: CIDv1 over the SHA-256 digest of the encoded bytes.
///
/// Two blobs with the same bytes always have the same `ContentId`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId {
    codec: Codec,
    digest: Sha256Hash,
}

impl ContentId {
    /// Length of the binary form.
    pub const BYTE_LEN: usize = 36;

    /// Compute the content id of `data` under `codec`.
    pub fn compute(codec: Codec, data: &[u8]) -> Self {
        Self {
            codec,
            digest: Sha256Hash::hash(data),
        }
    }

    /// Build from a known digest.
    pub const fn from_digest(codec: Codec, digest: Sha256Hash) -> Self {
        Self { codec, digest }
    }

    /// The codec of the addressed content.
    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// The SHA-256 digest.
    pub const fn digest(&self) -> &Sha256Hash {
        &self.digest
    }

    /// Binary CID: `0x01 || codec || 0x12 || 0x20 || digest`.
    pub fn to_bytes(&self) -> [u8; Self::BYTE_LEN] {
        let mut out = [0u8; Self::BYTE_LEN];
        out[0] = CID_V1;
        out[1] = self.codec.code();
        out[2] = SHA2_256;
        out[3] = SHA2_256_LEN;
        out[4..].copy_from_slice(self.digest.as_bytes());
        out
    }

    /// Parse the binary CID form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::BYTE_LEN {
            return Err(CoreError::InvalidContentId(format!(
                "expected {} bytes, got {}",
                Self::BYTE_LEN,
                bytes.len()
            )));
        }
        if bytes[0] != CID_V1 {
            return Err(CoreError::InvalidContentId(format!(
                "unsupported cid version {}",
                bytes[0]
            )));
        }
        let codec = Codec::from_code(bytes[1]).ok_or_else(|| {
            CoreError::InvalidContentId(format!("unsupported codec 0x{:02x}", bytes[1]))
        })?;
        if bytes[2] != SHA2_256 || bytes[3] != SHA2_256_LEN {
            return Err(CoreError::InvalidContentId(
                "unsupported multihash".to_string(),
            ));
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes[4..]);
        Ok(Self {
            codec,
            digest: Sha256Hash::from_bytes(digest),
        })
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", MULTIBASE_BASE32, base32_encode(&self.to_bytes()))
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_string();
        write!(f, "ContentId({}...)", &text[text.len() - 12..])
    }
}

impl FromStr for ContentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix(MULTIBASE_BASE32)
            .ok_or_else(|| CoreError::InvalidContentId(format!("unsupported multibase: {s}")))?;
        let bytes = base32_decode(body)
            .ok_or_else(|| CoreError::InvalidContentId(format!("invalid base32: {s}")))?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for ContentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Order in which head ids are listed in a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadOrder {
    /// Sorted by content id text.
    #[default]
    Canonical,
    /// Whatever order the heads were discovered in.
    Discovery,
}

/// A document version: the set of change heads it points at.
///
/// Text form joins the head ids with `.`.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Version(Vec<ContentId>);

impl Version {
    /// Build a version from heads, ordered as requested.
    pub fn from_heads(mut heads: Vec<ContentId>, order: HeadOrder) -> Self {
        if order == HeadOrder::Canonical {
            heads.sort_by_cached_key(|h| h.to_string());
        }
        heads.dedup();
        Self(heads)
    }

    /// The heads in this version.
    pub fn heads(&self) -> &[ContentId] {
        &self.0
    }

    /// True if the version names no heads.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, head) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{head}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({self})")
    }
}

impl FromStr for Version {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(CoreError::InvalidContentId("empty version".to_string()));
        }
        let heads = s
            .split('.')
            .map(ContentId::from_str)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(heads))
    }
}

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// RFC 4648 base32, lower case, no padding.
pub(crate) fn base32_encode(data: &[u8]) -> String {
    let mut result = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in data {
        buffer = (buffer << 8) | (byte as u64);
        bits_in_buffer += 8;

        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let index = ((buffer >> bits_in_buffer) & 0x1f) as usize;
            result.push(BASE32_ALPHABET[index] as char);
        }
    }

    if bits_in_buffer > 0 {
        let index = ((buffer << (5 - bits_in_buffer)) & 0x1f) as usize;
        result.push(BASE32_ALPHABET[index] as char);
    }

    result
}

/// Inverse of [`base32_encode`]. Returns `None` on characters outside the alphabet.
pub(crate) fn base32_decode(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for c in text.bytes() {
        let value = match c {
            b'a'..=b'z' => c - b'a',
            b'2'..=b'7' => c - b'2' + 26,
            _ => return None,
        };
        buffer = (buffer << 5) | value as u64;
        bits_in_buffer += 5;
        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            out.push((buffer >> bits_in_buffer) as u8);
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base32_encode() {
        assert_eq!(base32_encode(b""), "");
        assert_eq!(base32_encode(b"f"), "my");
        assert_eq!(base32_encode(b"fo"), "mzxq");
        assert_eq!(base32_encode(b"foo"), "mzxw6");
        assert_eq!(base32_encode(b"foob"), "mzxw6yq");
        assert_eq!(base32_encode(b"fooba"), "mzxw6ytb");
        assert_eq!(base32_encode(b"foobar"), "mzxw6ytboi");
    }

    #[test]
    fn test_base32_decode() {
        assert_eq!(base32_decode("mzxw6ytboi").unwrap(), b"foobar");
        assert_eq!(base32_decode("my").unwrap(), b"f");
        assert!(base32_decode("MZXW6").is_none());
    }

    #[test]
    fn test_content_id_text_roundtrip() {
        let cid = ContentId::compute(Codec::DagCbor, b"hello");
        let text = cid.to_string();
        assert!(text.starts_with("bafyrei"));
        assert_eq!(text.parse::<ContentId>().unwrap(), cid);
    }

    #[test]
    fn test_raw_codec_prefix() {
        let cid = ContentId::compute(Codec::Raw, b"hello");
        assert!(cid.to_string().starts_with("bafkrei"));
    }

    #[test]
    fn test_content_id_rejects_garbage() {
        assert!("zabc".parse::<ContentId>().is_err());
        assert!("b!!".parse::<ContentId>().is_err());
        assert!(ContentId::from_bytes(&[0x01, 0x71]).is_err());
    }

    #[test]
    fn test_version_sorts_canonically() {
        let a = ContentId::compute(Codec::DagCbor, b"a");
        let b = ContentId::compute(Codec::DagCbor, b"b");
        let v1 = Version::from_heads(vec![a, b], HeadOrder::Canonical);
        let v2 = Version::from_heads(vec![b, a], HeadOrder::Canonical);
        assert_eq!(v1, v2);
        assert_eq!(v1.to_string().parse::<Version>().unwrap(), v1);

        let discovered = Version::from_heads(vec![b, a], HeadOrder::Discovery);
        assert_eq!(discovered.heads(), &[b, a]);
    }
}
