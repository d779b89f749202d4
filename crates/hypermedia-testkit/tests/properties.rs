//! Property tests across the engine's layers.

use std::collections::HashSet;

use proptest::prelude::*;

use hypermedia_core::{
    decode_blob, encode_canonical, validate_blob, Blob, BlockNode, ChangeBuilder, Codec,
    CommentBuilder, ContentId, DocumentOperation, GenesisBuilder, ProfileBuilder,
    RefBuilder, ResourceId,
};
use hypermedia_diff::{apply_operations, diff, flatten_to_map, match_identity};
use hypermedia_testkit::generators::{
    block, block_tree, content_id, keypair, operation, resource_id, unique_block_tree,
};

fn blob_of_each_kind() -> impl Strategy<Value = Vec<Blob>> {
    (
        keypair(),
        content_id(),
        prop::collection::vec(content_id(), 1..4),
        prop::collection::vec(operation(), 0..6),
        block_tree(2, 3),
        "[a-z]{1,12}",
        any::<u32>(),
    )
        .prop_map(|(kp, genesis, deps, ops, body, name, ts)| {
            let ts = u64::from(ts);
            let mut seen = HashSet::new();
            let heads: Vec<ContentId> = deps.iter().copied().filter(|h| seen.insert(*h)).collect();
            vec![
                GenesisBuilder::new().sign(&kp),
                ChangeBuilder::new(genesis, deps.clone(), 1)
                    .ops(ops)
                    .timestamp(ts)
                    .sign(&kp),
                RefBuilder::new(genesis)
                    .heads(heads)
                    .generation(ts)
                    .path(format!("/{name}"))
                    .timestamp(ts)
                    .sign(&kp),
                RefBuilder::tombstone(genesis).timestamp(ts).sign(&kp),
                CommentBuilder::new(kp.principal(), format!("/{name}"), deps)
                    .body(body)
                    .timestamp(ts)
                    .sign(&kp),
                ProfileBuilder::new(name).timestamp(ts).sign(&kp),
            ]
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
        })
}

fn all_ids(tree: &[BlockNode]) -> Vec<String> {
    tree.iter()
        .flat_map(|node| node.iter().map(|n| n.block.id.clone()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn resource_id_text_roundtrips(id in resource_id()) {
        let text = id.to_string();
        let parsed = ResourceId::parse(&text).unwrap();
        prop_assert_eq!(&parsed, &id);
        prop_assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn block_encoding_is_deterministic(block in block()) {
        let a = encode_canonical(&block.to_value().unwrap()).unwrap();
        let b = encode_canonical(&block.clone().to_value().unwrap()).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn operation_encoding_is_deterministic(op in operation()) {
        let a = encode_canonical(&op.to_value().unwrap()).unwrap();
        let decoded = DocumentOperation::from_value(&op.to_value().unwrap()).unwrap();
        let b = encode_canonical(&decoded.to_value().unwrap()).unwrap();
        prop_assert_eq!(&decoded, &op);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn blobs_decode_to_themselves(blobs in blob_of_each_kind()) {
        for blob in blobs {
            let encoded = blob.encode().unwrap();
            let decoded = decode_blob(&encoded.bytes, &encoded.content_id).unwrap();
            prop_assert!(validate_blob(&decoded).is_ok());
            prop_assert_eq!(&decoded, &blob);

            let wrong = ContentId::compute(Codec::DagCbor, b"something else");
            prop_assert!(decode_blob(&encoded.bytes, &wrong).is_err());
        }
    }

    #[test]
    fn flipped_byte_fails_verification(
        blobs in blob_of_each_kind(),
        position in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        for blob in blobs {
            let encoded = blob.encode().unwrap();
            let mut bytes = encoded.bytes.to_vec();
            let at = position.index(bytes.len());
            bytes[at] ^= mask;

            // The tampered bytes get their own content id, so only the
            // structure and signature stand between them and acceptance.
            let cid = ContentId::compute(Codec::DagCbor, &bytes);
            match decode_blob(&bytes, &cid) {
                Err(_) => {}
                Ok(tampered) => prop_assert!(validate_blob(&tampered).is_err()),
            }
        }
    }

    #[test]
    fn diff_then_apply_reproduces_matched_tree(
        old in unique_block_tree(3, 3, "o"),
        new in unique_block_tree(3, 3, "n"),
    ) {
        let matched = match_identity(&old, &new).unwrap();
        let ops = diff(&flatten_to_map(&old).unwrap(), &matched).unwrap();
        let content = apply_operations(&old, &Default::default(), &ops).unwrap();
        prop_assert_eq!(content.body, matched);
    }

    #[test]
    fn diff_against_itself_only_reorders(tree in unique_block_tree(3, 3, "s")) {
        let ops = diff(&flatten_to_map(&tree).unwrap(), &tree).unwrap();
        let moves_only = ops.iter().all(|op| matches!(op, DocumentOperation::MoveBlocks { .. }));
        prop_assert!(moves_only, "unexpected ops {:?}", ops);
        prop_assert_eq!(
            apply_operations(&tree, &Default::default(), &ops).unwrap().body,
            tree
        );
    }

    #[test]
    fn matching_keeps_new_shape(
        old in unique_block_tree(2, 3, "o"),
        new in unique_block_tree(2, 3, "n"),
    ) {
        let matched = match_identity(&old, &new).unwrap();
        prop_assert_eq!(all_ids(&matched).len(), all_ids(&new).len());
        for (m, n) in matched.iter().zip(&new) {
            prop_assert_eq!(&m.block.block_type, &n.block.block_type);
            prop_assert_eq!(&m.block.text, &n.block.text);
        }
    }
}
