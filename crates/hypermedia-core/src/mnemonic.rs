//! Mnemonic recovery phrases and deterministic key derivation.
//!
//! Pipeline: BIP-39 phrase + passphrase → 64-byte seed → SLIP-0010 Ed25519
//! derivation along `m/44'/104109'/0'` → signing key. The same phrase and
//! passphrase always produce the same account.

use bip39::{Language, Mnemonic};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha512;

use crate::crypto::Keypair;
use crate::error::{CoreError, Result};

type HmacSha512 = Hmac<Sha512>;

/// Hardened derivation path, without the hardening bit.
pub const DERIVATION_PATH: [u32; 3] = [44, 104109, 0];

const HARDENED: u32 = 0x8000_0000;

/// SLIP-0010 master key for the ed25519 curve.
const ED25519_CURVE_KEY: &[u8] = b"ed25519 seed";

/// Supported phrase lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    Twelve,
    TwentyFour,
}

impl WordCount {
    /// Number of words.
    pub const fn words(self) -> usize {
        match self {
            WordCount::Twelve => 12,
            WordCount::TwentyFour => 24,
        }
    }

    /// Entropy bytes backing a phrase of this length.
    const fn entropy_len(self) -> usize {
        match self {
            WordCount::Twelve => 16,
            WordCount::TwentyFour => 32,
        }
    }
}

impl TryFrom<usize> for WordCount {
    type Error = CoreError;

    fn try_from(words: usize) -> Result<Self> {
        match words {
            12 => Ok(WordCount::Twelve),
            24 => Ok(WordCount::TwentyFour),
            n => Err(CoreError::InvalidMnemonic(format!(
                "expected 12 or 24 words, got {n}"
            ))),
        }
    }
}

/// Generate a fresh English phrase from OS entropy.
pub fn generate_mnemonic(count: WordCount) -> Result<String> {
    let mut entropy = vec![0u8; count.entropy_len()];
    rand::thread_rng().fill_bytes(&mut entropy);
    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| CoreError::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Check word list membership, checksum and length.
pub fn validate_mnemonic(phrase: &str) -> Result<()> {
    parse(phrase).map(|_| ())
}

/// Derive the account keypair for a phrase and optional passphrase.
pub fn derive_keypair(phrase: &str, passphrase: &str) -> Result<Keypair> {
    let mnemonic = parse(phrase)?;
    let seed = mnemonic.to_seed_normalized(passphrase);
    let key = derive_ed25519(&seed, &DERIVATION_PATH)?;
    Ok(Keypair::from_seed(&key))
}

fn parse(phrase: &str) -> Result<Mnemonic> {
    let normalized = normalize(phrase);
    WordCount::try_from(normalized.split(' ').count())?;
    Mnemonic::parse_in_normalized(Language::English, &normalized)
        .map_err(|e| CoreError::InvalidMnemonic(e.to_string()))
}

fn normalize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// SLIP-0010 hardened-only derivation for ed25519.
fn derive_ed25519(seed: &[u8], path: &[u32]) -> Result<[u8; 32]> {
    let (mut key, mut chain_code) = hmac_split(ED25519_CURVE_KEY, &[seed])?;
    for index in path {
        let hardened = (index | HARDENED).to_be_bytes();
        (key, chain_code) = hmac_split(&chain_code, &[&[0u8][..], &key[..], &hardened[..]])?;
    }
    Ok(key)
}

fn hmac_split(key: &[u8], parts: &[&[u8]]) -> Result<([u8; 32], [u8; 32])> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| CoreError::InvalidMnemonic(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let out = mac.finalize().into_bytes();
    let mut left = [0u8; 32];
    let mut right = [0u8; 32];
    left.copy_from_slice(&out[..32]);
    right.copy_from_slice(&out[32..]);
    Ok((left, right))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_known_account_id() {
        let keypair = derive_keypair(ABANDON, "").unwrap();
        assert_eq!(
            keypair.account_id(),
            "z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f"
        );
        assert_eq!(
            hex::encode(keypair.seed()),
            "6c76e170ee1665be4688f3f67889e1a22560e0ef706e91748018767d1adde6ff"
        );
    }

    #[test]
    fn test_passphrase_changes_account() {
        let keypair = derive_keypair(ABANDON, "secret").unwrap();
        assert_eq!(
            keypair.account_id(),
            "z6MkvhkZFjkyqPQPwSUZUKaH747sYzyCXdi75bA8oUAgLnhb"
        );
    }

    #[test]
    fn test_whitespace_and_case_normalized() {
        let messy = format!("  {}  ", ABANDON.to_uppercase().replace(' ', "\n "));
        let a = derive_keypair(&messy, "").unwrap();
        let b = derive_keypair(ABANDON, "").unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let bad = ABANDON.replace("about", "abandon");
        assert!(matches!(
            validate_mnemonic(&bad),
            Err(CoreError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_unknown_word_rejected() {
        let bad = ABANDON.replace("about", "zzzzz");
        assert!(validate_mnemonic(&bad).is_err());
        assert!(derive_keypair(&bad, "").is_err());
    }

    #[test]
    fn test_word_count_enforced() {
        // 15 words is valid BIP-39 but not accepted here.
        let fifteen = "abandon ".repeat(14) + "address";
        assert!(matches!(
            validate_mnemonic(&fifteen),
            Err(CoreError::InvalidMnemonic(_))
        ));
        assert!(WordCount::try_from(18).is_err());
    }

    #[test]
    fn test_generated_phrases_validate() {
        for count in [WordCount::Twelve, WordCount::TwentyFour] {
            let phrase = generate_mnemonic(count).unwrap();
            assert_eq!(phrase.split(' ').count(), count.words());
            validate_mnemonic(&phrase).unwrap();
            derive_keypair(&phrase, "").unwrap();
        }
    }
}
