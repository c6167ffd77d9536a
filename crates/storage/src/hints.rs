//! Hints held on behalf of unreachable replicas.
//!
//! When a write lands on a fallback node because one of the key's nominal
//! replicas was down, the fallback remembers which node the write was meant
//! for. A delivery worker drains these queues once the owner is back.

use corelib::NodeId;
use dashmap::DashMap;

use crate::record::{now_ms, VersionedRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub key: String,
    pub record: VersionedRecord,
    pub received_at_ms: u64,
}

/// Per-owner hint queues.
#[derive(Debug, Default)]
pub struct HintStore {
    hints: DashMap<NodeId, Vec<Hint>>,
}

impl HintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `record` for delivery to `owner`. A newer hint for the same key
    /// replaces one it descends from.
    pub fn record(&self, owner: NodeId, key: &str, record: VersionedRecord) {
        let mut queue = self.hints.entry(owner).or_default();
        queue.retain(|hint| hint.key != key || !record.version.descends(&hint.record.version));
        queue.push(Hint {
            key: key.to_string(),
            record,
            received_at_ms: now_ms(),
        });
    }

    /// Copy of the hints waiting for `owner`.
    pub fn pending_for(&self, owner: &NodeId) -> Vec<Hint> {
        self.hints
            .get(owner)
            .map(|queue| queue.value().clone())
            .unwrap_or_default()
    }

    /// Remove and return the hints waiting for `owner`.
    pub fn take_for(&self, owner: &NodeId) -> Vec<Hint> {
        self.hints
            .remove(owner)
            .map(|(_, queue)| queue)
            .unwrap_or_default()
    }

    /// Owners with at least one pending hint.
    pub fn owners(&self) -> Vec<NodeId> {
        self.hints
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Total number of pending hints.
    pub fn len(&self) -> usize {
        self.hints.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
