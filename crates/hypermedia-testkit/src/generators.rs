//! Proptest generators for property-based testing.

use proptest::prelude::*;

use hypermedia_core::block::{CHILDREN_TYPE, LANGUAGE};
use hypermedia_core::{
    Annotation, AttrValue, AttributeEntry, Block, BlockNode, BlockRange, BlockRef, Codec,
    ContentId, DocumentOperation, Keypair, Principal, ResourceId, ROOT_PARENT,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random principal.
pub fn principal() -> impl Strategy<Value = Principal> {
    keypair().prop_map(|kp| kp.principal())
}

/// Generate a content id over random bytes.
pub fn content_id() -> impl Strategy<Value = ContentId> {
    prop::collection::vec(any::<u8>(), 0..64).prop_map(|data| ContentId::compute(Codec::DagCbor, &data))
}

/// Generate a block id in the standard alphabet.
pub fn block_id() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{8}".prop_map(String::from)
}

/// Generate a block type.
pub fn block_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Paragraph".to_string()),
        Just("Heading".to_string()),
        Just("Code".to_string()),
        Just("Image".to_string()),
    ]
}

/// Generate a single-span annotation.
pub fn annotation() -> impl Strategy<Value = Annotation> {
    (
        prop_oneof![Just("Bold"), Just("Italic"), Just("Link")],
        0u32..32,
        0u32..32,
        prop::option::of("[a-z]{1,8}"),
    )
        .prop_map(|(kind, a, b, link)| {
            let span = Annotation::span(kind, a.min(b), a.max(b));
            match link {
                Some(target) => span.with_link(format!("hm://{target}")),
                None => span,
            }
        })
}

/// Generate a block. Only the attributes the diff compares are used, so
/// attribute-only edits are never silently dropped.
pub fn block() -> impl Strategy<Value = Block> {
    (
        block_id(),
        block_type(),
        "[ -~]{0,24}",
        prop::option::of("[a-z]{1,8}"),
        prop::collection::vec(annotation(), 0..3),
        prop::option::of(prop_oneof![Just("Ordered"), Just("Unordered"), Just("Group")]),
        prop::option::of(prop_oneof![Just("rust"), Just("go"), Just("typescript")]),
    )
        .prop_map(|(id, kind, text, link, annotations, children_type, language)| {
            let mut block = Block::new(id, kind).with_text(text);
            if let Some(target) = link {
                block = block.with_link(format!("hm://{target}"));
            }
            for annotation in annotations {
                block = block.with_annotation(annotation);
            }
            if let Some(style) = children_type {
                block = block.with_attribute(CHILDREN_TYPE, style);
            }
            if let Some(lang) = language {
                block = block.with_attribute(LANGUAGE, lang);
            }
            block
        })
}

/// Generate a block tree at most `depth` levels deep with up to `width`
/// children per node. Ids may repeat; use [`unique_ids`] where that matters.
pub fn block_tree(depth: u32, width: usize) -> impl Strategy<Value = Vec<BlockNode>> {
    let leaf = block().prop_map(BlockNode::new);
    let node = leaf.prop_recursive(depth, (width * width) as u32, width as u32, move |inner| {
        (block(), prop::collection::vec(inner, 0..=width))
            .prop_map(|(block, children)| BlockNode::new(block).with_children(children))
    });
    prop::collection::vec(node, 0..=width)
}

/// Rewrite ids so every block in the tree is distinct.
pub fn unique_ids(tree: Vec<BlockNode>, prefix: &str) -> Vec<BlockNode> {
    let mut counter = 0usize;
    let mut tree = tree;
    let mut stack: Vec<&mut BlockNode> = tree.iter_mut().collect();
    while let Some(node) = stack.pop() {
        node.block.id = format!("{prefix}{counter}");
        counter += 1;
        stack.extend(node.children.iter_mut());
    }
    tree
}

/// Generate a tree with distinct ids.
pub fn unique_block_tree(depth: u32, width: usize, prefix: &'static str) -> impl Strategy<Value = Vec<BlockNode>> {
    block_tree(depth, width).prop_map(move |tree| unique_ids(tree, prefix))
}

/// Generate an attribute value.
pub fn attr_value() -> impl Strategy<Value = AttrValue> {
    prop_oneof![
        Just(AttrValue::Null),
        any::<bool>().prop_map(AttrValue::Bool),
        any::<i64>().prop_map(AttrValue::Int),
        (-1.0e6f64..1.0e6).prop_map(AttrValue::Float),
        "[ -~]{0,16}".prop_map(AttrValue::Text),
    ]
}

/// Generate a document operation.
pub fn operation() -> impl Strategy<Value = DocumentOperation> {
    prop_oneof![
        prop::collection::vec(
            (prop::collection::vec("[a-zA-Z]{1,8}", 1..3), attr_value())
                .prop_map(|(key, value)| AttributeEntry::new(key, value)),
            1..4
        )
        .prop_map(|attrs| DocumentOperation::SetAttributes { attrs }),
        block().prop_map(|block| DocumentOperation::ReplaceBlock { block }),
        (
            prop::collection::vec(block_id(), 1..4),
            prop_oneof![Just(ROOT_PARENT.to_string()), block_id()]
        )
            .prop_map(|(blocks, parent)| DocumentOperation::MoveBlocks { blocks, parent }),
        prop::collection::vec(block_id(), 1..4)
            .prop_map(|blocks| DocumentOperation::DeleteBlocks { blocks }),
    ]
}

fn block_ref() -> impl Strategy<Value = BlockRef> {
    (
        block_id(),
        prop_oneof![
            Just(None),
            Just(Some(BlockRange::Expanded)),
            (any::<u32>(), any::<u32>()).prop_map(|(start, end)| Some(BlockRange::Exact { start, end })),
        ],
    )
        .prop_map(|(block_id, range)| BlockRef { block_id, range })
}

/// Generate a valid resource identifier in either text form.
pub fn resource_id() -> impl Strategy<Value = ResourceId> {
    (
        "[A-Za-z0-9]{1,48}",
        prop::collection::vec("[A-Za-z0-9_.-]{1,12}", 0..4),
        prop::option::of("[a-z0-9]{1,16}(\\.[a-z0-9]{1,16}){0,2}"),
        any::<bool>(),
        prop::option::of(block_ref()),
        prop::option::of(("[a-z]{1,10}(\\.[a-z]{2,5})?(:[0-9]{2,4})?", any::<bool>())),
    )
        .prop_filter_map("valid resource id", |(uid, path, version, latest, block_ref, gateway)| {
            let mut id = ResourceId::new(uid).and_then(|id| id.with_path(path)).ok()?;
            id = match version {
                Some(version) => id.with_version(version).ok()?,
                None if latest => id.latest(),
                None => id,
            };
            if let Some(block_ref) = block_ref {
                id = id.with_block_ref(block_ref).ok()?;
            }
            if let Some((host, secure)) = gateway {
                id = id.on_gateway(host, secure).ok()?;
            }
            Some(id)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    proptest! {
        #[test]
        fn test_unique_ids_are_unique(tree in block_tree(3, 3)) {
            let tree = unique_ids(tree, "n");
            let mut seen = HashSet::new();
            for node in &tree {
                for descendant in node.iter() {
                    prop_assert!(seen.insert(descendant.block.id.clone()));
                }
            }
        }

        #[test]
        fn test_generated_blocks_encode(block in block()) {
            prop_assert!(block.to_value().is_ok());
        }
    }
}
