//! Operations that create a brand-new tree.

use hypermedia_core::{BlockNode, DocumentOperation};

use crate::blocks_map::BlocksMap;
use crate::diff::{emit_levels, DiffOptions};
use crate::error::Result;

/// `ReplaceBlock` for every block and one `MoveBlocks` per level, placing
/// the tree under `parent`. Parents are created before their children are
/// moved under them.
pub fn flatten_to_operations(tree: &[BlockNode], parent: &str) -> Result<Vec<DocumentOperation>> {
    flatten_to_operations_with(tree, parent, &DiffOptions::default())
}

/// Like [`flatten_to_operations`] with explicit options.
pub fn flatten_to_operations_with(
    tree: &[BlockNode],
    parent: &str,
    options: &DiffOptions,
) -> Result<Vec<DocumentOperation>> {
    emit_levels(&BlocksMap::default(), tree, parent, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypermedia_core::{Block, ROOT_PARENT};

    #[test]
    fn test_every_block_created_and_placed() {
        let tree = vec![
            BlockNode::new(Block::new("h", "Heading").with_text("Title"))
                .with_children(vec![BlockNode::new(Block::paragraph("p", "body"))]),
            BlockNode::new(Block::paragraph("q", "tail")),
        ];
        let ops = flatten_to_operations(&tree, ROOT_PARENT).unwrap();
        let kinds: Vec<_> = ops.iter().map(|op| op.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "ReplaceBlock",
                "ReplaceBlock",
                "MoveBlocks",
                "ReplaceBlock",
                "MoveBlocks"
            ]
        );
        assert_eq!(
            ops[2],
            DocumentOperation::MoveBlocks {
                blocks: vec!["p".into()],
                parent: "h".into()
            }
        );
    }

    #[test]
    fn test_appends_under_parent() {
        let tree = vec![BlockNode::new(Block::paragraph("n", "new"))];
        let ops = flatten_to_operations(&tree, "existing").unwrap();
        assert_eq!(
            ops.last(),
            Some(&DocumentOperation::MoveBlocks {
                blocks: vec!["n".into()],
                parent: "existing".into()
            })
        );
        assert!(flatten_to_operations(&[], ROOT_PARENT).unwrap().is_empty());
    }
}
