//! Versioned records.

use std::time::{SystemTime, UNIX_EPOCH};

use corelib::VersionVector;
use serde::{Deserialize, Serialize};

/// A value together with its causal history.
///
/// A delete is stored as a tombstone: the value is dropped but the version
/// vector stays, so a stale replica can still learn that the delete
/// happened after its own write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub value: Vec<u8>,
    pub version: VersionVector,
    /// Milliseconds since the Unix epoch at which the record was created.
    pub timestamp_ms: u64,
    pub tombstone: bool,
}

impl VersionedRecord {
    pub fn new(value: impl Into<Vec<u8>>, version: VersionVector) -> Self {
        Self {
            value: value.into(),
            version,
            timestamp_ms: now_ms(),
            tombstone: false,
        }
    }

    pub fn tombstone(version: VersionVector) -> Self {
        Self {
            value: Vec::new(),
            version,
            timestamp_ms: now_ms(),
            tombstone: true,
        }
    }

    /// True if this record is a tombstone or carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.tombstone || self.value.is_empty()
    }

    /// The value, unless this is a tombstone.
    pub fn live_value(&self) -> Option<&[u8]> {
        if self.tombstone {
            None
        } else {
            Some(&self.value)
        }
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
