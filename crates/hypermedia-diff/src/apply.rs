//! Applying operations to a block tree.
//!
//! Block content is kept by id, separately from placement. `DeleteBlocks`
//! only detaches a block (its subtree goes with it), so a later `MoveBlocks`
//! can place a detached block again. `ReplaceBlock` never changes placement.

use hypermedia_core::{Attributes, Block, BlockNode, DocumentOperation, ROOT_PARENT};
use std::collections::{HashMap, HashSet};

use crate::blocks_map::flatten_to_map_with;
use crate::diff::DiffOptions;
use crate::error::{DiffError, Result};

/// Materialized document: metadata plus the block tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentContent {
    /// Metadata keyed by the `.`-joined attribute path.
    pub metadata: Attributes,
    pub body: Vec<BlockNode>,
}

/// Mutable document state that operations are applied to.
#[derive(Debug, Clone, Default)]
pub struct TreeState {
    blocks: HashMap<String, Block>,
    children: HashMap<String, Vec<String>>,
    parents: HashMap<String, String>,
    metadata: Attributes,
    options: DiffOptions,
}

impl TreeState {
    /// An empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty document with explicit limits.
    pub fn with_options(options: DiffOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Start from an existing tree and metadata.
    pub fn from_tree(tree: &[BlockNode], metadata: Attributes) -> Result<Self> {
        let options = DiffOptions::default();
        let (entries, children) = flatten_to_map_with(tree, &options)?.into_parts();
        let mut state = Self {
            children,
            metadata,
            options,
            ..Default::default()
        };
        for (id, entry) in entries {
            state.parents.insert(id.clone(), entry.parent);
            state.blocks.insert(id, entry.block);
        }
        Ok(state)
    }

    /// Current metadata.
    pub fn metadata(&self) -> &Attributes {
        &self.metadata
    }

    /// Content of a block, placed or not.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Apply operations in order.
    pub fn apply_all<'a>(&mut self, ops: impl IntoIterator<Item = &'a DocumentOperation>) -> Result<()> {
        for op in ops {
            self.apply(op)?;
        }
        Ok(())
    }

    /// Apply one operation.
    pub fn apply(&mut self, op: &DocumentOperation) -> Result<()> {
        match op {
            DocumentOperation::SetAttributes { attrs } => {
                for attr in attrs {
                    self.metadata.insert(attr.joined_key(), attr.value.clone());
                }
            }
            DocumentOperation::ReplaceBlock { block } => {
                self.blocks.insert(block.id.clone(), block.clone());
            }
            DocumentOperation::MoveBlocks { blocks, parent } => self.move_blocks(blocks, parent)?,
            DocumentOperation::DeleteBlocks { blocks } => {
                for id in blocks {
                    self.detach(id);
                }
            }
        }
        Ok(())
    }

    fn move_blocks(&mut self, blocks: &[String], parent: &str) -> Result<()> {
        let mut listed = Vec::with_capacity(blocks.len());
        let mut seen = HashSet::with_capacity(blocks.len());
        for id in blocks {
            if self.is_self_or_ancestor(id, parent) {
                return Err(DiffError::InvalidMove {
                    block: id.clone(),
                    parent: parent.to_string(),
                });
            }
            if seen.insert(id.as_str()) {
                listed.push(id.clone());
            }
        }

        for id in &listed {
            self.detach(id);
        }
        let rest = self.children.remove(parent).unwrap_or_default();
        for id in &listed {
            self.parents.insert(id.clone(), parent.to_string());
        }
        listed.extend(rest);
        self.children.insert(parent.to_string(), listed);
        Ok(())
    }

    fn detach(&mut self, id: &str) {
        if let Some(parent) = self.parents.remove(id) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|s| s != id);
            }
        }
    }

    /// True if `id` is `node` or one of its ancestors.
    fn is_self_or_ancestor(&self, id: &str, node: &str) -> bool {
        let mut current = node;
        for _ in 0..=self.parents.len() {
            if current == id {
                return true;
            }
            if current == ROOT_PARENT {
                return false;
            }
            match self.parents.get(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Build the tree reachable from the top level.
    ///
    /// Blocks that were placed but never given content are skipped along
    /// with their subtree.
    pub fn materialize(&self) -> Result<DocumentContent> {
        let mut order: Vec<&str> = Vec::new();
        let mut stack: Vec<(&str, usize)> = self
            .placed_children(ROOT_PARENT)
            .rev()
            .map(|id| (id, 1))
            .collect();
        while let Some((id, depth)) = stack.pop() {
            if depth > self.options.max_depth {
                return Err(DiffError::DepthExceeded {
                    max_depth: self.options.max_depth,
                });
            }
            order.push(id);
            stack.extend(self.placed_children(id).rev().map(|c| (c, depth + 1)));
        }

        let mut built: HashMap<&str, BlockNode> = HashMap::with_capacity(order.len());
        for id in order.into_iter().rev() {
            let children = self
                .placed_children(id)
                .filter_map(|c| built.remove(c))
                .collect();
            if let Some(block) = self.blocks.get(id) {
                built.insert(id, BlockNode::new(block.clone()).with_children(children));
            }
        }
        let body = self
            .placed_children(ROOT_PARENT)
            .filter_map(|id| built.remove(id))
            .collect();

        Ok(DocumentContent {
            metadata: self.metadata.clone(),
            body,
        })
    }

    fn placed_children<'a>(&'a self, parent: &str) -> impl DoubleEndedIterator<Item = &'a str> + 'a {
        self.children
            .get(parent)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .filter(|id| self.blocks.contains_key(*id))
    }
}

/// Apply `ops` to a tree and its metadata.
pub fn apply_operations(
    tree: &[BlockNode],
    metadata: &Attributes,
    ops: &[DocumentOperation],
) -> Result<DocumentContent> {
    let mut state = TreeState::from_tree(tree, metadata.clone())?;
    state.apply_all(ops)?;
    state.materialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::replace_tree;
    use crate::flatten::flatten_to_operations;
    use crate::matching::match_identity;
    use hypermedia_core::{AttrValue, AttributeEntry};

    fn leaf(id: &str, text: &str) -> BlockNode {
        BlockNode::new(Block::paragraph(id, text))
    }

    #[test]
    fn test_build_from_scratch() {
        let tree = vec![
            leaf("a", "one").with_children(vec![leaf("a1", "nested")]),
            leaf("b", "two"),
        ];
        let ops = flatten_to_operations(&tree, ROOT_PARENT).unwrap();
        let content = apply_operations(&[], &Attributes::new(), &ops).unwrap();
        assert_eq!(content.body, tree);
    }

    #[test]
    fn test_diff_then_apply_reproduces_new_tree() {
        let old = vec![
            leaf("A", "foo").with_children(vec![leaf("A1", "x"), leaf("A2", "y")]),
            leaf("B", "bar"),
        ];
        let new = vec![
            leaf("n1", "foo"),
            BlockNode::new(Block::new("n2", "Heading").with_text("baz"))
                .with_children(vec![leaf("n3", "moved")]),
        ];
        let ops = replace_tree(&old, &new).unwrap();
        let content = apply_operations(&old, &Attributes::new(), &ops).unwrap();
        assert_eq!(content.body, match_identity(&old, &new).unwrap());
    }

    #[test]
    fn test_delete_takes_subtree() {
        let tree = vec![leaf("a", "x").with_children(vec![leaf("a1", "y")]), leaf("b", "z")];
        let ops = vec![DocumentOperation::DeleteBlocks {
            blocks: vec!["a".into()],
        }];
        let content = apply_operations(&tree, &Attributes::new(), &ops).unwrap();
        assert_eq!(content.body, vec![leaf("b", "z")]);
    }

    #[test]
    fn test_move_puts_listed_first() {
        let tree = vec![leaf("a", "1"), leaf("b", "2"), leaf("c", "3")];
        let ops = vec![DocumentOperation::MoveBlocks {
            blocks: vec!["c".into()],
            parent: ROOT_PARENT.into(),
        }];
        let content = apply_operations(&tree, &Attributes::new(), &ops).unwrap();
        let ids: Vec<_> = content.body.iter().map(|n| n.block.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_move_under_own_descendant_rejected() {
        let tree = vec![leaf("a", "x").with_children(vec![leaf("a1", "y")])];
        let ops = vec![DocumentOperation::MoveBlocks {
            blocks: vec!["a".into()],
            parent: "a1".into(),
        }];
        assert!(matches!(
            apply_operations(&tree, &Attributes::new(), &ops),
            Err(DiffError::InvalidMove { .. })
        ));
    }

    #[test]
    fn test_set_attributes_joins_keys() {
        let ops = vec![DocumentOperation::SetAttributes {
            attrs: vec![
                AttributeEntry::new(["name"], "Doc"),
                AttributeEntry::new(["theme", "headerLayout"], "Center"),
            ],
        }];
        let content = apply_operations(&[], &Attributes::new(), &ops).unwrap();
        assert_eq!(content.metadata.get("name"), Some(&AttrValue::from("Doc")));
        assert!(content.metadata.contains_key("theme.headerLayout"));
    }

    #[test]
    fn test_unplaced_block_not_materialized() {
        let mut state = TreeState::new();
        state
            .apply(&DocumentOperation::ReplaceBlock {
                block: Block::paragraph("floating", "x"),
            })
            .unwrap();
        assert!(state.block("floating").is_some());
        assert!(state.materialize().unwrap().body.is_empty());
    }
}
