//! Golden test vectors for deterministic verification.
//!
//! These vectors pin key derivation, genesis signing, canonical encoding
//! and identifier formatting so independent implementations agree byte for
//! byte.

use hypermedia_core::{derive_keypair, BlobRef, CoreError, GenesisBuilder, ResourceId};

/// A key-derivation and genesis vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// BIP-39 phrase.
    pub mnemonic: &'static str,
    /// BIP-39 passphrase.
    pub passphrase: &'static str,
    /// Expected account id text.
    pub account_id: &'static str,
    /// Expected genesis content id, if pinned.
    pub genesis_cid: Option<&'static str>,
    /// Expected genesis bytes (hex), if pinned.
    pub genesis_bytes: Option<&'static str>,
}

/// An identifier text and its canonical re-rendering.
#[derive(Debug, Clone)]
pub struct IdVector {
    pub input: &'static str,
    pub canonical: &'static str,
}

const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Get all golden key vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "abandon mnemonic, empty passphrase",
            mnemonic: ABANDON,
            passphrase: "",
            account_id: "z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f",
            genesis_cid: Some("bafyreibp6hwi4izowsc5mlfglaf2jnhhrb3xfgdgxobxwwzleytewwfhr4"),
            genesis_bytes: Some("a462747300637369675840687d80cc540f42f6e2460ed0316ed13e27e3dd5b20c3a327543bb035caa401dfea10e320687ff85c55420ce0216797ea3f4ee33b1a4dfbec3f359cc1576faf086474797065664368616e6765667369676e65725822ed01a9312efd61bd60750de744d3ee3aded626e536c4489785b7681d921b9789c86c"),
        },
        GoldenVector {
            name: "abandon mnemonic, secret passphrase",
            mnemonic: ABANDON,
            passphrase: "secret",
            account_id: "z6MkvhkZFjkyqPQPwSUZUKaH747sYzyCXdi75bA8oUAgLnhb",
            genesis_cid: None,
            genesis_bytes: None,
        },
    ]
}

/// Identifier texts and how they render after parsing.
pub fn id_vectors() -> Vec<IdVector> {
    vec![
        IdVector {
            input: "z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f",
            canonical: "hm://z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f",
        },
        IdVector {
            input: "hm://z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f//notes//today/",
            canonical: "hm://z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f/notes/today",
        },
        IdVector {
            input: "hm://z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f/a?foo=bar&v=bafyx",
            canonical: "hm://z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f/a?v=bafyx",
        },
        IdVector {
            input: "hm://z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f?l",
            canonical: "hm://z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f?l",
        },
        IdVector {
            input: "hm://z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f/docs?v=bafyabc.bafydef#Xy_9-AbC[3:10]",
            canonical: "hm://z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f/docs?v=bafyabc.bafydef#Xy_9-AbC[3:10]",
        },
        IdVector {
            input: "https://example.com/hm/z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f/notes#abcdefgh+",
            canonical: "https://example.com/hm/z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f/notes#abcdefgh+",
        },
    ]
}

/// Outcome of checking one vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorReport {
    pub name: String,
    pub matches: bool,
    /// What this implementation produced.
    pub actual: String,
}

fn check_key_vector(vector: &GoldenVector) -> Result<VectorReport, CoreError> {
    let keypair = derive_keypair(vector.mnemonic, vector.passphrase)?;
    let account = keypair.account_id();
    let genesis = BlobRef::new(GenesisBuilder::new().sign(&keypair)?)?;
    let cid = genesis.content_id().to_string();
    let bytes = hex::encode(&genesis.encoded.bytes);

    let matches = account == vector.account_id
        && vector.genesis_cid.map_or(true, |expected| expected == cid)
        && vector.genesis_bytes.map_or(true, |expected| expected == bytes);

    Ok(VectorReport {
        name: vector.name.to_string(),
        matches,
        actual: format!("{account} {cid}"),
    })
}

fn check_id_vector(vector: &IdVector) -> VectorReport {
    let actual = match ResourceId::parse(vector.input) {
        Ok(id) => id.to_string(),
        Err(e) => format!("error: {e}"),
    };
    VectorReport {
        name: vector.input.to_string(),
        matches: actual == vector.canonical,
        actual,
    }
}

/// Verify every vector against this implementation.
///
/// A vector that fails to evaluate is reported as a mismatch.
pub fn verify_all_vectors() -> Vec<VectorReport> {
    let keys = all_vectors().into_iter().map(|v| {
        check_key_vector(&v).unwrap_or_else(|e| VectorReport {
            name: v.name.to_string(),
            matches: false,
            actual: format!("error: {e}"),
        })
    });
    let ids = id_vectors().into_iter().map(|v| check_id_vector(&v));
    keys.chain(ids).collect()
}
