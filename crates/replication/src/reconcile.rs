//! Version reconciliation across replica responses.

use storage::siblings::admit;
use storage::VersionedRecord;

pub use storage::merged_version;

/// Keep only the records no other record strictly dominates.
///
/// Concurrent records are all kept (siblings); records with equal versions
/// are collapsed into one, preferring a tombstone. Tombstones take part like
/// any other version, so a delete that causally follows a write hides it.
pub fn reconcile(records: impl IntoIterator<Item = VersionedRecord>) -> Vec<VersionedRecord> {
    let mut winners: Vec<VersionedRecord> = Vec::new();
    for record in records {
        admit(&mut winners, record);
    }

    // Present siblings in a stable order.
    winners.sort_by(|a, b| {
        a.timestamp_ms
            .cmp(&b.timestamp_ms)
            .then_with(|| a.value.cmp(&b.value))
    });
    winners
}

/// Whether a replica holding `held` is missing `resolved`.
pub fn is_stale(held: &[VersionedRecord], resolved: &VersionedRecord) -> bool {
    !held
        .iter()
        .any(|record| record.version.descends(&resolved.version))
}
