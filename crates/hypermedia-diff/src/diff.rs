//! Minimal operation lists between two block trees.
//!
//! Levels are processed in the order a recursive walk would produce:
//! for each block, its `ReplaceBlock` (when new or changed), then its whole
//! child level; then one `MoveBlocks` for the level; then one `DeleteBlocks`
//! for old children of the level's parent that appear nowhere in the new tree.

use hypermedia_core::block::{CHILDREN_TYPE, LANGUAGE};
use hypermedia_core::{AttrValue, Block, BlockNode, DocumentOperation, ROOT_PARENT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::blocks_map::{flatten_to_map_with, BlocksMap};
use crate::error::{DiffError, Result};
use crate::matching::match_identity_with;

/// Default nesting ceiling for tree walks.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Limits applied while walking trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Deepest level accepted; the top level is 1.
    pub max_depth: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Operations turning the tree indexed by `old_map` into `matched`.
///
/// `matched` should come from [`match_identity`](crate::match_identity) so
/// that unchanged blocks keep their ids.
pub fn diff(old_map: &BlocksMap, matched: &[BlockNode]) -> Result<Vec<DocumentOperation>> {
    diff_with(old_map, matched, &DiffOptions::default())
}

/// Like [`diff`] with explicit options.
pub fn diff_with(
    old_map: &BlocksMap,
    matched: &[BlockNode],
    options: &DiffOptions,
) -> Result<Vec<DocumentOperation>> {
    let ops = emit_levels(old_map, matched, ROOT_PARENT, options)?;
    debug!(
        old_blocks = old_map.len(),
        ops = ops.len(),
        "computed block tree diff"
    );
    Ok(ops)
}

/// Flatten `old`, match `new` against it, and diff.
pub fn replace_tree(old: &[BlockNode], new: &[BlockNode]) -> Result<Vec<DocumentOperation>> {
    replace_tree_with(old, new, &DiffOptions::default())
}

/// Like [`replace_tree`] with explicit options.
pub fn replace_tree_with(
    old: &[BlockNode],
    new: &[BlockNode],
    options: &DiffOptions,
) -> Result<Vec<DocumentOperation>> {
    let old_map = flatten_to_map_with(old, options)?;
    let matched = match_identity_with(old, new, options)?;
    diff_with(&old_map, &matched, options)
}

/// True if two blocks carry the same content as far as the diff is concerned.
///
/// Compares type, text, link, annotations and the `childrenType` and
/// `language` attributes. Missing and empty values are equal.
pub fn is_content_equal(old: &Block, new: &Block) -> bool {
    old.block_type == new.block_type
        && old.text == new.text
        && old.link == new.link
        && old.annotations == new.annotations
        && relevant_attr(old, CHILDREN_TYPE) == relevant_attr(new, CHILDREN_TYPE)
        && relevant_attr(old, LANGUAGE) == relevant_attr(new, LANGUAGE)
}

fn relevant_attr<'a>(block: &'a Block, key: &str) -> Option<&'a AttrValue> {
    match block.attribute(key) {
        None | Some(AttrValue::Null) => None,
        Some(AttrValue::Text(s)) if s.is_empty() => None,
        other => other,
    }
}

/// One level being walked: its nodes, its parent id, and the next index.
struct Level<'a> {
    nodes: &'a [BlockNode],
    parent: &'a str,
    next: usize,
}

/// Shared walk used by [`diff`] and [`flatten_to_operations`](crate::flatten_to_operations).
pub(crate) fn emit_levels(
    old_map: &BlocksMap,
    tree: &[BlockNode],
    parent: &str,
    options: &DiffOptions,
) -> Result<Vec<DocumentOperation>> {
    let touched = collect_ids(tree, options)?;
    let mut ops = Vec::new();
    let mut stack = vec![Level {
        nodes: tree,
        parent,
        next: 0,
    }];

    while let Some(level) = stack.last_mut() {
        let nodes = level.nodes;
        if let Some(node) = nodes.get(level.next) {
            level.next += 1;
            let changed = match old_map.get(&node.block.id) {
                None => true,
                Some(entry) => !is_content_equal(&entry.block, &node.block),
            };
            if changed {
                ops.push(DocumentOperation::ReplaceBlock {
                    block: node.block.clone(),
                });
            }
            stack.push(Level {
                nodes: &node.children,
                parent: &node.block.id,
                next: 0,
            });
            continue;
        }

        let parent = level.parent;
        stack.pop();
        if !nodes.is_empty() {
            ops.push(DocumentOperation::MoveBlocks {
                blocks: nodes.iter().map(|n| n.block.id.clone()).collect(),
                parent: parent.to_string(),
            });
        }
        let deleted: Vec<String> = old_map
            .children_of(parent)
            .iter()
            .filter(|id| !touched.contains(id.as_str()))
            .cloned()
            .collect();
        if !deleted.is_empty() {
            ops.push(DocumentOperation::DeleteBlocks { blocks: deleted });
        }
    }

    Ok(ops)
}

/// Every id in the tree. Fails on duplicates or excessive depth.
fn collect_ids<'a>(tree: &'a [BlockNode], options: &DiffOptions) -> Result<HashSet<&'a str>> {
    let mut ids = HashSet::new();
    let mut stack: Vec<(&[BlockNode], usize)> = vec![(tree, 1)];
    while let Some((nodes, depth)) = stack.pop() {
        if nodes.is_empty() {
            continue;
        }
        if depth > options.max_depth {
            return Err(DiffError::DepthExceeded {
                max_depth: options.max_depth,
            });
        }
        for node in nodes {
            if !ids.insert(node.block.id.as_str()) {
                return Err(DiffError::IdentityCollision(node.block.id.clone()));
            }
            stack.push((node.children.as_slice(), depth + 1));
        }
    }
    Ok(ids)
}
