//! Sets of mutually concurrent records.
//!
//! A key holds an antichain: no stored record's version descends from
//! another's. A write that dominates some siblings replaces them, a write
//! concurrent with all of them joins the set.

use corelib::{VersionOrder, VersionVector};

use crate::engine::PutOutcome;
use crate::record::VersionedRecord;

/// Add `record` to `siblings`, keeping the set an antichain.
///
/// Equal versions collapse into one record, a tombstone winning over a
/// live value with the same history.
pub fn admit(siblings: &mut Vec<VersionedRecord>, record: VersionedRecord) -> PutOutcome {
    for held in siblings.iter_mut() {
        match record.version.compare(&held.version) {
            VersionOrder::Before => return PutOutcome::Stale,
            VersionOrder::Equal => {
                if record.tombstone && !held.tombstone {
                    *held = record;
                    return PutOutcome::Applied;
                }
                return PutOutcome::Unchanged;
            }
            VersionOrder::After | VersionOrder::Concurrent => {}
        }
    }

    siblings.retain(|held| !record.version.dominates(&held.version));
    if !siblings.is_empty() {
        tracing::debug!(siblings = siblings.len() + 1, "keeping concurrent versions");
    }
    siblings.push(record);
    PutOutcome::Applied
}

/// Merge of every version in `records`: the context that supersedes all
/// of them.
pub fn merged_version(records: &[VersionedRecord]) -> VersionVector {
    records
        .iter()
        .fold(VersionVector::new(), |acc, record| acc.merge(&record.version))
}
