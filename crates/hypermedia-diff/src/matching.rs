//! Positional identity matching between an old and a new block tree.
//!
//! A new block at position N inherits the id of the old block at position N
//! when both have the same type. Children are always matched against the old
//! node's children at the same position, whether or not the parents matched.
//!
//! A new block whose own id already exists in the old tree keeps it, and an
//! old id the new tree already uses elsewhere is never inherited, so reordered
//! bodies that kept their ids stay collision free.

use std::collections::HashSet;

use hypermedia_core::BlockNode;

use crate::diff::DiffOptions;
use crate::error::{DiffError, Result};

/// Reassign ids in `new` to preserve identity with `old`.
pub fn match_identity(old: &[BlockNode], new: &[BlockNode]) -> Result<Vec<BlockNode>> {
    match_identity_with(old, new, &DiffOptions::default())
}

/// Like [`match_identity`] with an explicit depth ceiling.
pub fn match_identity_with(
    old: &[BlockNode],
    new: &[BlockNode],
    options: &DiffOptions,
) -> Result<Vec<BlockNode>> {
    let old_ids = collect_ids(old);
    let new_ids = collect_ids(new);
    let mut matched = new.to_vec();
    let mut stack: Vec<(&mut [BlockNode], &[BlockNode], usize)> =
        vec![(matched.as_mut_slice(), old, 1)];

    while let Some((nodes, old_nodes, depth)) = stack.pop() {
        if nodes.is_empty() {
            continue;
        }
        if depth > options.max_depth {
            return Err(DiffError::DepthExceeded {
                max_depth: options.max_depth,
            });
        }
        for (idx, node) in nodes.iter_mut().enumerate() {
            let old_node = old_nodes.get(idx);
            if let Some(old_node) = old_node {
                let inherit = old_node.block.block_type == node.block.block_type
                    && !old_ids.contains(node.block.id.as_str())
                    && !new_ids.contains(old_node.block.id.as_str());
                if inherit {
                    node.block.id = old_node.block.id.clone();
                }
            }
            let old_children = old_node.map(|n| n.children.as_slice()).unwrap_or(&[]);
            stack.push((node.children.as_mut_slice(), old_children, depth + 1));
        }
    }

    Ok(matched)
}

fn collect_ids(tree: &[BlockNode]) -> HashSet<&str> {
    tree.iter()
        .flat_map(|node| node.iter())
        .map(|node| node.block.id.as_str())
        .collect()
}
