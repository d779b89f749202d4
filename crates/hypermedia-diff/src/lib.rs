//! # Hypermedia Diff
//!
//! Turns edits of a document's block tree into the minimal operation list a
//! change carries, and applies operation lists back onto a tree.
//!
//! ```text
//! old tree ──flatten_to_map──► BlocksMap ─┐
//! new tree ──match_identity──► matched ───┴─diff──► Vec<DocumentOperation>
//! ```

pub mod apply;
pub mod blocks_map;
pub mod diff;
pub mod error;
pub mod flatten;
pub mod matching;

pub use apply::{apply_operations, DocumentContent, TreeState};
pub use blocks_map::{flatten_to_map, flatten_to_map_with, BlockEntry, BlocksMap};
pub use diff::{
    diff, diff_with, is_content_equal, replace_tree, replace_tree_with, DiffOptions,
    DEFAULT_MAX_DEPTH,
};
pub use error::{DiffError, Result};
pub use flatten::{flatten_to_operations, flatten_to_operations_with};
pub use matching::{match_identity, match_identity_with};
