//! Cryptographic primitives: Ed25519 signing, SHA-256 hashing, and principals.
//!
//! A principal is an Ed25519 public key prefixed with its multicodec tag
//! (`0xED 0x01`). Its text form is multibase base58btc (leading `z`), which is
//! also the account id.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Multicodec varint prefix for Ed25519 public keys.
pub const ED25519_PREFIX: [u8; 2] = [0xed, 0x01];

/// Multibase prefix for base58btc.
const MULTIBASE_BASE58BTC: char = 'z';

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256({}...)", &self.to_hex()[..8])
    }
}

impl AsRef<[u8]> for Sha256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<()> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let sig = Signature::from_bytes(&signature.0);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", &self.to_hex()[..8])
    }
}

impl AsRef<[u8]> for Ed25519PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    /// Width of a signature in bytes.
    pub const LEN: usize = 64;

    /// The zero-filled placeholder used while signing.
    pub const ZERO: Self = Self([0u8; 64]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse from a byte slice of exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CoreError::MalformedBlob(format!("signature of {} bytes", bytes.len())))?;
        Ok(Self(arr))
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// True for the zero-filled placeholder.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({}...)", &self.to_hex()[..8])
    }
}

impl AsRef<[u8]> for Ed25519Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A multicodec-tagged Ed25519 public key identifying an account or agent.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal(Ed25519PublicKey);

impl Principal {
    /// Length of the binary form (prefix + key).
    pub const BYTE_LEN: usize = 34;

    /// Wrap a raw public key.
    pub const fn from_public_key(key: Ed25519PublicKey) -> Self {
        Self(key)
    }

    /// The raw public key.
    pub const fn public_key(&self) -> &Ed25519PublicKey {
        &self.0
    }

    /// Binary form: `0xED 0x01 || key`.
    pub fn to_bytes(&self) -> [u8; Self::BYTE_LEN] {
        let mut out = [0u8; Self::BYTE_LEN];
        out[..2].copy_from_slice(&ED25519_PREFIX);
        out[2..].copy_from_slice(self.0.as_bytes());
        out
    }

    /// Parse the binary form, checking length and multicodec prefix.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::BYTE_LEN {
            return Err(CoreError::InvalidPrincipal(format!(
                "expected {} bytes, got {}",
                Self::BYTE_LEN,
                bytes.len()
            )));
        }
        if bytes[..2] != ED25519_PREFIX {
            return Err(CoreError::InvalidPrincipal(
                "expected Ed25519 multicodec 0xed01".to_string(),
            ));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[2..]);
        Ok(Self(Ed25519PublicKey(key)))
    }

    /// Verify a signature made by this principal.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<()> {
        self.0.verify(message, signature)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            MULTIBASE_BASE58BTC,
            bs58::encode(self.to_bytes()).into_string()
        )
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_string();
        write!(f, "Principal({}...)", &text[..12])
    }
}

impl FromStr for Principal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let body = s.strip_prefix(MULTIBASE_BASE58BTC).ok_or_else(|| {
            CoreError::InvalidPrincipal(format!("expected base58btc multibase: {s}"))
        })?;
        let bytes = bs58::decode(body)
            .into_vec()
            .map_err(|e| CoreError::InvalidPrincipal(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl Serialize for Principal {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// An Ed25519 keypair for signing blobs.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The 32-byte private seed.
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The raw public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// The multicodec-tagged public key.
    pub fn principal(&self) -> Principal {
        Principal(self.public_key())
    }

    /// The account id: base58btc text of the tagged public key.
    pub fn account_id(&self) -> String {
        self.principal().to_string()
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// Sign `message` with the key derived from a raw 32-byte seed.
pub fn sign_with_seed(message: &[u8], seed: &[u8; 32]) -> Ed25519Signature {
    Keypair::from_seed(seed).sign(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"hello world";
        let signature = keypair.sign(message);

        keypair.public_key().verify(message, &signature).unwrap();
        assert!(keypair.public_key().verify(b"hello worlD", &signature).is_err());
    }

    #[test]
    fn test_deterministic_from_seed() {
        let seed = [0x42u8; 32];
        let kp1 = Keypair::from_seed(&seed);
        let kp2 = Keypair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.seed(), seed);
        assert_eq!(sign_with_seed(b"m", &seed), kp1.sign(b"m"));
    }

    #[test]
    fn test_principal_text_roundtrip() {
        let keypair = Keypair::from_seed(&[7u8; 32]);
        let principal = keypair.principal();
        let text = principal.to_string();
        assert!(text.starts_with("z6Mk"));
        assert_eq!(text.parse::<Principal>().unwrap(), principal);
        assert_eq!(keypair.account_id(), text);
    }

    #[test]
    fn test_principal_rejects_wrong_prefix() {
        let mut bytes = Keypair::from_seed(&[7u8; 32]).principal().to_bytes();
        bytes[0] = 0xe7;
        assert!(matches!(
            Principal::from_bytes(&bytes),
            Err(CoreError::InvalidPrincipal(_))
        ));
        assert!(Principal::from_bytes(&bytes[..33]).is_err());
        assert!("6Mkabc".parse::<Principal>().is_err());
    }

    #[test]
    fn test_zero_signature() {
        assert!(Ed25519Signature::ZERO.is_zero());
        assert!(Ed25519Signature::from_slice(&[0u8; 63]).is_err());
    }
}
