//! Publisher configuration.

use hypermedia_core::HeadOrder;
use hypermedia_dag::ResolveOptions;
use hypermedia_diff::{DiffOptions, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for the [`Publisher`](crate::Publisher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Order of heads in resolved versions.
    pub head_order: HeadOrder,
    /// Validate every built blob before handing it to the store.
    pub verify_before_submit: bool,
    /// Deepest block nesting accepted in document bodies.
    pub max_tree_depth: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            head_order: HeadOrder::Canonical,
            verify_before_submit: true,
            max_tree_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl PublisherConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            head_order: self.head_order,
        }
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            max_depth: self.max_tree_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PublisherConfig::default();
        assert!(config.verify_before_submit);
        assert_eq!(config.max_tree_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.resolve_options().head_order, HeadOrder::Canonical);
    }

    #[test]
    fn test_from_json_partial() {
        let config = PublisherConfig::from_json(r#"{"head_order":"discovery","max_tree_depth":8}"#)
            .unwrap();
        assert_eq!(config.head_order, HeadOrder::Discovery);
        assert_eq!(config.diff_options().max_depth, 8);
        assert!(config.verify_before_submit);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(PublisherConfig::from_json("{").is_err());
        assert!(PublisherConfig::from_json(r#"{"head_order":"random"}"#).is_err());
    }
}
