//! Old-to-new node id mapping produced by a fork.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::ids::NodeId;
use crate::error::{ArborError, ArborResult};

/// Maps every node of a forked version's source to its fresh copy.
///
/// Iteration is ordered by source node id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdMap {
    entries: BTreeMap<NodeId, NodeId>,
}

impl IdMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `old` was copied to `new`. Returns the previous target if
    /// `old` was already mapped.
    pub fn insert(&mut self, old: NodeId, new: NodeId) -> Option<NodeId> {
        self.entries.insert(old, new)
    }

    /// Copy of `old`, if it was mapped.
    pub fn get(&self, old: NodeId) -> Option<NodeId> {
        self.entries.get(&old).copied()
    }

    /// Copy of `old`, or `NodeNotFound` if it was not part of the source.
    pub fn translate(&self, old: NodeId) -> ArborResult<NodeId> {
        self.get(old).ok_or_else(|| ArborError::node_not_found(old))
    }

    /// Whether `old` was mapped.
    pub fn contains(&self, old: NodeId) -> bool {
        self.entries.contains_key(&old)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(old, new)` pairs in ascending order of `old`.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.entries.iter().map(|(old, new)| (*old, *new))
    }

    /// Target node ids.
    pub fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.values().copied()
    }

    /// No two source nodes share a target.
    pub fn is_injective(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.entries.len());
        self.entries.values().all(|new| seen.insert(*new))
    }
}

impl FromIterator<(NodeId, NodeId)> for IdMap {
    fn from_iter<I: IntoIterator<Item = (NodeId, NodeId)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
