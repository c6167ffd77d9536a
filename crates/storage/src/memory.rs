//! In-memory replica store.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::engine::{PutOutcome, ReplicaStore};
use crate::error::{Result, StorageError};
use crate::record::VersionedRecord;
use crate::siblings::admit;

/// `DashMap`-backed store: writes to different shards never block each
/// other, and a write to one key never blocks reads of another shard.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: DashMap<String, Vec<VersionedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.data.iter().map(|entry| entry.key().clone()).collect()
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidArgument("key cannot be empty".into()));
    }
    Ok(())
}

impl ReplicaStore for MemoryStore {
    fn get_versioned(&self, key: &str) -> Vec<VersionedRecord> {
        self.data
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn put_versioned(&self, key: &str, record: VersionedRecord) -> Result<PutOutcome> {
        check_key(key)?;
        match self.data.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(vec![record]);
                Ok(PutOutcome::Applied)
            }
            Entry::Occupied(mut slot) => {
                let outcome = admit(slot.get_mut(), record);
                if outcome == PutOutcome::Stale {
                    tracing::trace!(key, "ignoring stale version");
                }
                Ok(outcome)
            }
        }
    }

    fn update<F>(&self, key: &str, build: F) -> Result<VersionedRecord>
    where
        F: FnOnce(&[VersionedRecord]) -> VersionedRecord,
    {
        check_key(key)?;
        match self.data.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                let record = build(&[]);
                slot.insert(vec![record.clone()]);
                Ok(record)
            }
            Entry::Occupied(mut slot) => {
                let record = build(slot.get());
                admit(slot.get_mut(), record.clone());
                Ok(record)
            }
        }
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::siblings::merged_version;
    use corelib::{NodeId, VersionVector};

    fn vv(entries: &[(&str, u64)]) -> VersionVector {
        entries.iter().map(|(n, c)| (*n, *c)).collect()
    }

    #[test]
    fn test_put_then_get() {
        let store = MemoryStore::new();
        let record = VersionedRecord::new(b"v1".to_vec(), vv(&[("a", 1)]));
        assert_eq!(store.put_versioned("k", record.clone()).unwrap(), PutOutcome::Applied);
        assert_eq!(store.get_versioned("k"), vec![record]);
        assert!(store.get_versioned("missing").is_empty());
    }

    #[test]
    fn test_empty_key_rejected() {
        let store = MemoryStore::new();
        let err = store
            .put_versioned("", VersionedRecord::new(b"v".to_vec(), vv(&[("a", 1)])))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));

        let err = store
            .update("", |_| VersionedRecord::new("v", vv(&[("a", 1)])))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[test]
    fn test_stale_write_ignored() {
        let store = MemoryStore::new();
        store
            .put_versioned("k", VersionedRecord::new(b"new".to_vec(), vv(&[("a", 2)])))
            .unwrap();
        let outcome = store
            .put_versioned("k", VersionedRecord::new(b"old".to_vec(), vv(&[("a", 1)])))
            .unwrap();
        assert_eq!(outcome, PutOutcome::Stale);

        let held = store.get_versioned("k");
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].value, b"new");
    }

    #[test]
    fn test_equal_write_unchanged() {
        let store = MemoryStore::new();
        let record = VersionedRecord::new(b"v".to_vec(), vv(&[("a", 1)]));
        store.put_versioned("k", record.clone()).unwrap();
        assert_eq!(store.put_versioned("k", record).unwrap(), PutOutcome::Unchanged);
    }

    #[test]
    fn test_concurrent_writes_kept_as_siblings() {
        let store = MemoryStore::new();
        store
            .put_versioned("k", VersionedRecord::new("left", vv(&[("a", 1)])))
            .unwrap();
        let outcome = store
            .put_versioned("k", VersionedRecord::new("right", vv(&[("b", 1)])))
            .unwrap();
        assert_eq!(outcome, PutOutcome::Applied);

        let mut values: Vec<Vec<u8>> = store
            .get_versioned("k")
            .into_iter()
            .map(|record| record.value)
            .collect();
        values.sort();
        assert_eq!(values, vec![b"left".to_vec(), b"right".to_vec()]);
        assert_eq!(store.len(), 1);

        // A write that has seen both collapses the set
        store
            .put_versioned("k", VersionedRecord::new("both", vv(&[("a", 1), ("b", 2)])))
            .unwrap();
        let held = store.get_versioned("k");
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].value, b"both");
    }

    #[test]
    fn test_update_descends_from_every_sibling() {
        let store = MemoryStore::new();
        store
            .put_versioned("k", VersionedRecord::new("left", vv(&[("a", 1)])))
            .unwrap();
        store
            .put_versioned("k", VersionedRecord::new("right", vv(&[("b", 1)])))
            .unwrap();

        let node = NodeId::from("c");
        let written = store
            .update("k", |held| {
                let mut version = merged_version(held);
                version.increment(&node);
                VersionedRecord::new("resolved", version)
            })
            .unwrap();
        assert_eq!(written.version, vv(&[("a", 1), ("b", 1), ("c", 1)]));
        assert_eq!(store.get_versioned("k"), vec![written]);
    }

    #[test]
    fn test_delete_keeps_version() {
        let store = MemoryStore::new();
        store
            .put_versioned("k", VersionedRecord::new(b"v".to_vec(), vv(&[("a", 1)])))
            .unwrap();
        store.delete_versioned("k", vv(&[("a", 2)])).unwrap();

        let held = store.get_versioned("k");
        assert_eq!(held.len(), 1);
        assert!(held[0].tombstone);
        assert!(held[0].live_value().is_none());
        assert_eq!(held[0].version.get(&NodeId::from("a")), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_returned_records_are_copies() {
        let store = MemoryStore::new();
        store
            .put_versioned("k", VersionedRecord::new(b"v".to_vec(), vv(&[("a", 1)])))
            .unwrap();

        let mut copy = store.get_versioned("k");
        copy[0].value.push(b'!');
        copy[0].version.increment(&NodeId::from("a"));

        let stored = store.get_versioned("k");
        assert_eq!(stored[0].value, b"v");
        assert_eq!(stored[0].version.get(&NodeId::from("a")), 1);
    }
}
