//! Flat index of a block tree keyed by block id.

use hypermedia_core::{Block, BlockNode, ROOT_PARENT};
use std::collections::HashMap;

use crate::diff::DiffOptions;
use crate::error::{DiffError, Result};

/// Position and content of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntry {
    /// Parent block id, empty at the top level.
    pub parent: String,
    /// Previous sibling id, empty for the first child.
    pub left: String,
    pub block: Block,
}

/// Every block of a tree keyed by id, plus each parent's child order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlocksMap {
    entries: HashMap<String, BlockEntry>,
    children: HashMap<String, Vec<String>>,
}

impl BlocksMap {
    /// Look up a block.
    pub fn get(&self, id: &str) -> Option<&BlockEntry> {
        self.entries.get(id)
    }

    /// True if the block is in the tree.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Child ids of `parent` in sibling order. Use [`ROOT_PARENT`] for the top level.
    pub fn children_of(&self, parent: &str) -> &[String] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn into_parts(self) -> (HashMap<String, BlockEntry>, HashMap<String, Vec<String>>) {
        (self.entries, self.children)
    }
}

/// Index a tree with the default depth ceiling.
pub fn flatten_to_map(tree: &[BlockNode]) -> Result<BlocksMap> {
    flatten_to_map_with(tree, &DiffOptions::default())
}

/// Index a tree. Fails on duplicate ids or nesting deeper than `options.max_depth`.
pub fn flatten_to_map_with(tree: &[BlockNode], options: &DiffOptions) -> Result<BlocksMap> {
    let mut map = BlocksMap::default();
    let mut stack: Vec<(&[BlockNode], &str, usize)> = vec![(tree, ROOT_PARENT, 1)];

    while let Some((nodes, parent, depth)) = stack.pop() {
        if nodes.is_empty() {
            continue;
        }
        if depth > options.max_depth {
            return Err(DiffError::DepthExceeded {
                max_depth: options.max_depth,
            });
        }
        let mut left = "";
        let mut ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            let id = node.block.id.as_str();
            let entry = BlockEntry {
                parent: parent.to_string(),
                left: left.to_string(),
                block: node.block.clone(),
            };
            if map.entries.insert(id.to_string(), entry).is_some() {
                return Err(DiffError::IdentityCollision(id.to_string()));
            }
            ids.push(id.to_string());
            stack.push((node.children.as_slice(), id, depth + 1));
            left = id;
        }
        map.children.insert(parent.to_string(), ids);
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, children: Vec<BlockNode>) -> BlockNode {
        BlockNode::new(Block::paragraph(id, id)).with_children(children)
    }

    #[test]
    fn test_parent_and_left() {
        let tree = vec![
            node("a", vec![node("a1", vec![]), node("a2", vec![])]),
            node("b", vec![]),
        ];
        let map = flatten_to_map(&tree).unwrap();
        assert_eq!(map.len(), 4);

        let a2 = map.get("a2").unwrap();
        assert_eq!(a2.parent, "a");
        assert_eq!(a2.left, "a1");

        let b = map.get("b").unwrap();
        assert_eq!(b.parent, ROOT_PARENT);
        assert_eq!(b.left, "a");

        assert_eq!(map.children_of(ROOT_PARENT), &["a".to_string(), "b".to_string()]);
        assert_eq!(map.children_of("a").len(), 2);
        assert!(map.children_of("b").is_empty());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let tree = vec![node("a", vec![node("x", vec![])]), node("x", vec![])];
        assert!(matches!(
            flatten_to_map(&tree),
            Err(DiffError::IdentityCollision(id)) if id == "x"
        ));
    }

    #[test]
    fn test_depth_ceiling() {
        let mut tree = node("leaf", vec![]);
        for i in 0..10 {
            tree = node(&format!("n{i}"), vec![tree]);
        }
        let options = DiffOptions { max_depth: 5 };
        assert!(matches!(
            flatten_to_map_with(&[tree.clone()], &options),
            Err(DiffError::DepthExceeded { max_depth: 5 })
        ));
        assert_eq!(flatten_to_map(&[tree]).unwrap().len(), 11);
    }
}
