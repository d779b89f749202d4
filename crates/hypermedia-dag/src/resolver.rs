//! Depth and head resolution over a flat change list.
//!
//! Depth is the length of the longest dependency chain from the genesis.
//! Depths are propagated in topological order (Kahn's algorithm), so a change
//! is only visited once all of its dependencies have been.

use hypermedia_core::{ContentId, HeadOrder, Principal, Timestamp, Version};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

use crate::error::{DagError, Result};

/// One entry of a document's change list, as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub id: ContentId,
    pub deps: Vec<ContentId>,
    pub signer: Option<Principal>,
    pub timestamp: Option<Timestamp>,
}

impl ChangeRecord {
    /// A record with only id and dependencies.
    pub fn new(id: ContentId, deps: Vec<ContentId>) -> Self {
        Self {
            id,
            deps,
            signer: None,
            timestamp: None,
        }
    }

    /// True for the change without dependencies.
    pub fn is_genesis(&self) -> bool {
        self.deps.is_empty()
    }
}

/// Options for [`resolve_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Order of the heads in the resolved state.
    #[serde(default)]
    pub head_order: HeadOrder,
}

/// The resolved state of a document's change DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentState {
    pub genesis: ContentId,
    pub heads: Vec<ContentId>,
    /// Maximum depth among the heads.
    pub head_depth: u64,
    pub depths: HashMap<ContentId, u64>,
}

impl DocumentState {
    /// Depth for a change built on top of the current heads.
    pub fn next_depth(&self) -> u64 {
        self.head_depth + 1
    }

    /// The current version, heads in resolved order.
    pub fn version(&self) -> Version {
        Version::from_heads(self.heads.clone(), HeadOrder::Discovery)
    }

    /// Depth of a known change.
    pub fn depth(&self, id: &ContentId) -> Option<u64> {
        self.depths.get(id).copied()
    }

    /// Every change ordered by `(depth, content id)`. Dependencies always
    /// come before their dependents.
    pub fn ordered_changes(&self) -> Vec<ContentId> {
        let mut ids: Vec<_> = self.depths.iter().map(|(id, d)| (*d, *id)).collect();
        ids.sort();
        ids.into_iter().map(|(_, id)| id).collect()
    }
}

/// Whether a document has any history yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum History {
    /// No changes: the document does not exist yet.
    New,
    /// The resolved state of existing changes.
    Existing(DocumentState),
}

impl History {
    /// The resolved state, if any.
    pub fn state(&self) -> Option<&DocumentState> {
        match self {
            History::New => None,
            History::Existing(state) => Some(state),
        }
    }
}

/// Resolve with default options.
pub fn resolve(records: &[ChangeRecord]) -> Result<DocumentState> {
    resolve_with(records, ResolveOptions::default())
}

/// Like [`resolve_with`], but an empty list is [`History::New`].
pub fn resolve_history(records: &[ChangeRecord], options: ResolveOptions) -> Result<History> {
    if records.is_empty() {
        return Ok(History::New);
    }
    resolve_with(records, options).map(History::Existing)
}

/// Compute depths, the genesis and the heads of a change list.
pub fn resolve_with(records: &[ChangeRecord], options: ResolveOptions) -> Result<DocumentState> {
    if records.is_empty() {
        return Err(DagError::EmptyHistory);
    }

    let mut known = HashSet::with_capacity(records.len());
    for record in records {
        if !known.insert(record.id) {
            return Err(DagError::DuplicateChange(record.id));
        }
    }

    let genesis_ids: Vec<_> = records
        .iter()
        .filter(|r| r.is_genesis())
        .map(|r| r.id)
        .collect();
    let genesis = match genesis_ids.as_slice() {
        [] => return Err(DagError::GenesisNotFound),
        [one] => *one,
        _ => return Err(DagError::MultipleGenesis(genesis_ids)),
    };

    // dependency -> dependents, and the number of distinct unresolved deps per change
    let mut dependents: HashMap<ContentId, Vec<ContentId>> = HashMap::new();
    let mut pending: HashMap<ContentId, usize> = HashMap::with_capacity(records.len());
    let mut depended_on = HashSet::new();
    for record in records {
        let mut unique = HashSet::with_capacity(record.deps.len());
        for dep in &record.deps {
            if !known.contains(dep) {
                return Err(DagError::MissingDependency {
                    change: record.id,
                    dependency: *dep,
                });
            }
            if unique.insert(*dep) {
                dependents.entry(*dep).or_default().push(record.id);
            }
            depended_on.insert(*dep);
        }
        pending.insert(record.id, unique.len());
    }

    let discovered: Vec<_> = records
        .iter()
        .filter(|r| !depended_on.contains(&r.id))
        .map(|r| r.id)
        .collect();
    if discovered.is_empty() {
        return Err(DagError::NoHeads);
    }

    let mut depths: HashMap<ContentId, u64> = HashMap::with_capacity(records.len());
    depths.insert(genesis, 0);
    let mut queue = VecDeque::from([genesis]);
    while let Some(id) = queue.pop_front() {
        let depth = depths.get(&id).copied().unwrap_or_default();
        for child in dependents.get(&id).into_iter().flatten() {
            let entry = depths.entry(*child).or_insert(0);
            *entry = (*entry).max(depth + 1);
            if let Some(remaining) = pending.get_mut(child) {
                *remaining -= 1;
                if *remaining == 0 {
                    queue.push_back(*child);
                }
            }
        }
    }

    let unresolved: Vec<_> = records
        .iter()
        .filter(|r| pending.get(&r.id).copied().unwrap_or_default() > 0)
        .map(|r| r.id)
        .collect();
    if !unresolved.is_empty() {
        return Err(DagError::Cycle { unresolved });
    }

    let heads = Version::from_heads(discovered, options.head_order)
        .heads()
        .to_vec();
    let head_depth = heads
        .iter()
        .filter_map(|h| depths.get(h))
        .copied()
        .max()
        .unwrap_or_default();

    debug!(
        changes = records.len(),
        heads = heads.len(),
        head_depth,
        "resolved change history"
    );

    Ok(DocumentState {
        genesis,
        heads,
        head_depth,
        depths,
    })
}
