//! Replica store capability sets.

use corelib::VersionVector;

use crate::error::Result;
use crate::record::VersionedRecord;

/// What a versioned put did to the stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The record joined the key's siblings, replacing those it dominates.
    Applied,
    /// A stored version already strictly dominates the record.
    Stale,
    /// A stored version is identical; nothing changed.
    Unchanged,
}

impl PutOutcome {
    pub fn applied(self) -> bool {
        self == PutOutcome::Applied
    }
}

/// Per-node key/value map holding the latest known versions of each key.
///
/// A key maps to a set of siblings: records whose versions are mutually
/// concurrent. Implementations must be safe to call concurrently from many
/// request tasks. Records cross the boundary by value in both directions:
/// a caller never holds a reference into the store's own state.
pub trait ReplicaStore: Send + Sync + 'static {
    /// Current siblings of `key`, tombstones included. Empty when absent.
    fn get_versioned(&self, key: &str) -> Vec<VersionedRecord>;

    /// Add `record` to the key's siblings unless a stored version already
    /// descends from it.
    fn put_versioned(&self, key: &str, record: VersionedRecord) -> Result<PutOutcome>;

    /// Build a record from the current siblings and store it, atomically
    /// with respect to every other write to `key`.
    ///
    /// `build` runs with the key locked and must not call back into the
    /// store.
    fn update<F>(&self, key: &str, build: F) -> Result<VersionedRecord>
    where
        F: FnOnce(&[VersionedRecord]) -> VersionedRecord,
        Self: Sized;

    /// Add a tombstone carrying `version`.
    fn delete_versioned(&self, key: &str, version: VersionVector) -> Result<PutOutcome> {
        self.put_versioned(key, VersionedRecord::tombstone(version))
    }

    /// Number of keys, tombstoned ones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw-bytes store without explicit versioning.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}
