//! Non-versioned adapter over a [`ReplicaStore`].

use std::sync::Arc;

use corelib::{NodeId, VersionVector};

use crate::engine::{KvStore, ReplicaStore};
use crate::error::Result;
use crate::record::VersionedRecord;
use crate::siblings::merged_version;

/// Pseudo-node id stamped on writes that carry no causal context.
pub const LEGACY_NODE_ID: &str = "legacy";

/// Exposes raw `get`/`put`/`delete` on top of a versioned store.
///
/// Every write descends from all of the key's siblings and bumps the
/// `legacy` slot, so it supersedes whatever the key held before; deletes
/// write a tombstone and reads hide it. Version derivation and the write
/// happen under the store's key lock.
#[derive(Debug)]
pub struct LegacyStore<S> {
    inner: Arc<S>,
    writer: NodeId,
}

impl<S: ReplicaStore> LegacyStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            writer: NodeId::from(LEGACY_NODE_ID),
        }
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    fn next_version(&self, held: &[VersionedRecord]) -> VersionVector {
        let mut version = merged_version(held);
        version.increment(&self.writer);
        version
    }
}

impl<S: ReplicaStore> KvStore for LegacyStore<S> {
    /// The newest live sibling, by timestamp.
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner
            .get_versioned(key)
            .into_iter()
            .filter(|record| !record.tombstone)
            .max_by(|a, b| {
                a.timestamp_ms
                    .cmp(&b.timestamp_ms)
                    .then_with(|| a.value.cmp(&b.value))
            })
            .map(|record| record.value)
    }

    fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.inner
            .update(key, |held| VersionedRecord::new(value, self.next_version(held)))?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        if self.inner.get_versioned(key).is_empty() {
            return Ok(());
        }
        self.inner
            .update(key, |held| VersionedRecord::tombstone(self.next_version(held)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_round_trip_and_delete() {
        let store = Arc::new(MemoryStore::new());
        let legacy = LegacyStore::new(Arc::clone(&store));

        legacy.put("k", b"v1".to_vec()).unwrap();
        legacy.put("k", b"v2".to_vec()).unwrap();
        assert_eq!(legacy.get("k"), Some(b"v2".to_vec()));

        legacy.delete("k").unwrap();
        assert_eq!(legacy.get("k"), None);

        // The tombstone keeps the causal history underneath
        let held = store.get_versioned("k");
        assert_eq!(held.len(), 1);
        assert!(held[0].tombstone);
        assert_eq!(held[0].version.get(&NodeId::from(LEGACY_NODE_ID)), 3);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let legacy = LegacyStore::new(Arc::clone(&store));
        legacy.delete("nothing").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_supersedes_versioned_write() {
        let store = Arc::new(MemoryStore::new());
        let mut version = VersionVector::new();
        version.increment(&NodeId::from("node-a"));
        store
            .put_versioned("k", VersionedRecord::new(b"versioned".to_vec(), version))
            .unwrap();

        let legacy = LegacyStore::new(Arc::clone(&store));
        legacy.put("k", b"raw".to_vec()).unwrap();
        assert_eq!(legacy.get("k"), Some(b"raw".to_vec()));
    }

    #[test]
    fn test_put_supersedes_every_sibling() {
        let store = Arc::new(MemoryStore::new());
        for node in ["node-a", "node-b"] {
            let mut version = VersionVector::new();
            version.increment(&NodeId::from(node));
            store
                .put_versioned("k", VersionedRecord::new(node, version))
                .unwrap();
        }
        assert_eq!(store.get_versioned("k").len(), 2);

        let legacy = LegacyStore::new(Arc::clone(&store));
        legacy.put("k", b"raw".to_vec()).unwrap();
        assert_eq!(store.get_versioned("k").len(), 1);
        assert_eq!(legacy.get("k"), Some(b"raw".to_vec()));
    }

    #[test]
    fn test_concurrent_puts_never_share_a_version() {
        let store = Arc::new(MemoryStore::new());
        let legacy = Arc::new(LegacyStore::new(Arc::clone(&store)));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let legacy = Arc::clone(&legacy);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        legacy.put("hot", format!("{}-{}", t, i).into_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Every put bumped the counter exactly once
        let held = store.get_versioned("hot");
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].version.get(&NodeId::from(LEGACY_NODE_ID)), 200);
    }
}
