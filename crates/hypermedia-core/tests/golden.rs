//! Golden test vectors for cross-implementation verification.
//!
//! Every implementation of the hypermedia engine must produce identical:
//! - derived seed and public key for a mnemonic
//! - account id text
//! - genesis signature (deterministic Ed25519)
//! - genesis bytes
//! - genesis content id

use hypermedia_core::{
    decode_blob, derive_keypair, validate_blob, Blob, ChangeBuilder, ContentId, DocumentOperation,
    GenesisBuilder, Principal, Block,
};
use serde::{Deserialize, Serialize};

/// A single golden test vector.
#[derive(Debug, Serialize, Deserialize)]
pub struct GoldenVector {
    pub name: String,

    // Inputs
    pub mnemonic: String,
    pub passphrase: String,

    // Derived outputs (hex except account_id and cid)
    pub seed: String,
    pub public_key: String,
    pub account_id: String,
    pub genesis_sig: Option<String>,
    pub genesis_bytes: Option<String>,
    pub genesis_cid: Option<String>,
}

const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn pinned_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "abandon_about_empty_passphrase".into(),
            mnemonic: ABANDON.into(),
            passphrase: String::new(),
            seed: "6c76e170ee1665be4688f3f67889e1a22560e0ef706e91748018767d1adde6ff".into(),
            public_key: "a9312efd61bd60750de744d3ee3aded626e536c4489785b7681d921b9789c86c".into(),
            account_id: "z6MkqqiSjqcT9NasDUXiymyB8kpgz6h3CNQaghGAoXsaYJ2f".into(),
            genesis_sig: Some("687d80cc540f42f6e2460ed0316ed13e27e3dd5b20c3a327543bb035caa401dfea10e320687ff85c55420ce0216797ea3f4ee33b1a4dfbec3f359cc1576faf08".into()),
            genesis_bytes: Some("a462747300637369675840687d80cc540f42f6e2460ed0316ed13e27e3dd5b20c3a327543bb035caa401dfea10e320687ff85c55420ce0216797ea3f4ee33b1a4dfbec3f359cc1576faf086474797065664368616e6765667369676e65725822ed01a9312efd61bd60750de744d3ee3aded626e536c4489785b7681d921b9789c86c".into()),
            genesis_cid: Some("bafyreibp6hwi4izowsc5mlfglaf2jnhhrb3xfgdgxobxwwzleytewwfhr4".into()),
        },
        GoldenVector {
            name: "abandon_about_secret_passphrase".into(),
            mnemonic: ABANDON.into(),
            passphrase: "secret".into(),
            seed: String::new(),
            public_key: String::new(),
            account_id: "z6MkvhkZFjkyqPQPwSUZUKaH747sYzyCXdi75bA8oUAgLnhb".into(),
            genesis_sig: None,
            genesis_bytes: None,
            genesis_cid: None,
        },
    ]
}

#[test]
fn test_pinned_vectors() {
    for v in pinned_vectors() {
        let keypair = derive_keypair(&v.mnemonic, &v.passphrase).unwrap();
        assert_eq!(keypair.account_id(), v.account_id, "{}: account id", v.name);
        if !v.seed.is_empty() {
            assert_eq!(hex::encode(keypair.seed()), v.seed, "{}: seed", v.name);
            assert_eq!(keypair.public_key().to_hex(), v.public_key, "{}: public key", v.name);
        }

        let genesis = GenesisBuilder::new().sign(&keypair).unwrap();
        let encoded = genesis.encode().unwrap();
        if let Some(sig) = &v.genesis_sig {
            assert_eq!(&genesis.header().sig.to_hex(), sig, "{}: sig", v.name);
        }
        if let Some(bytes) = &v.genesis_bytes {
            assert_eq!(&hex::encode(&encoded.bytes), bytes, "{}: bytes", v.name);
        }
        if let Some(cid) = &v.genesis_cid {
            assert_eq!(&encoded.content_id.to_string(), cid, "{}: cid", v.name);
        }
    }
}

#[test]
fn test_account_id_parses_back() {
    let keypair = derive_keypair(ABANDON, "").unwrap();
    let principal: Principal = keypair.account_id().parse().unwrap();
    assert_eq!(principal, keypair.principal());
    assert_eq!(&principal.to_bytes()[..2], &[0xed, 0x01]);
}

#[test]
fn test_golden_genesis_decodes() {
    let v = &pinned_vectors()[0];
    let bytes = hex::decode(v.genesis_bytes.as_ref().unwrap()).unwrap();
    let cid: ContentId = v.genesis_cid.as_ref().unwrap().parse().unwrap();
    let blob = decode_blob(&bytes, &cid).unwrap();
    assert!(matches!(blob, Blob::Genesis(_)));
    assert_eq!(blob.signer().to_string(), v.account_id);
    validate_blob(&blob).unwrap();
}

#[test]
fn test_change_is_deterministic() {
    let keypair = derive_keypair(ABANDON, "").unwrap();
    let genesis: ContentId = "bafyreibp6hwi4izowsc5mlfglaf2jnhhrb3xfgdgxobxwwzleytewwfhr4"
        .parse()
        .unwrap();
    let build = || {
        ChangeBuilder::new(genesis, vec![genesis], 1)
            .op(DocumentOperation::ReplaceBlock {
                block: Block::paragraph("a", "foo"),
            })
            .op(DocumentOperation::MoveBlocks {
                blocks: vec!["a".into()],
                parent: String::new(),
            })
            .timestamp(1_700_000_000_000)
            .sign(&keypair)
            .unwrap()
            .encode()
            .unwrap()
    };
    let first = build();
    assert_eq!(first, build());
    let decoded = decode_blob(&first.bytes, &first.content_id).unwrap();
    validate_blob(&decoded).unwrap();
}

#[test]
fn test_vectors_serialize() {
    let json = serde_json::to_string_pretty(&pinned_vectors()).unwrap();
    let back: Vec<GoldenVector> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), 2);
}
