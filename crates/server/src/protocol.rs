//! Wire types of the client and node-to-node endpoints.
//!
//! Values travel as base64 strings inside JSON; version vectors as plain
//! `{node: counter}` objects.

use corelib::{NodeId, VersionVector};
use replication::{ReadResult, ReplicaWrite};
use serde::{Deserialize, Serialize};
use storage::record::now_ms;
use storage::VersionedRecord;

pub const HEALTH_PATH: &str = "/healthz";
pub const READY_PATH: &str = "/readyz";
pub const KV_PREFIX: &str = "/kv/";
pub const KV_PATH: &str = "/kv/{key}";
pub const INTERNAL_STORAGE_PREFIX: &str = "/internal/storage/";
pub const INTERNAL_STORAGE_PATH: &str = "/internal/storage/{key}";

pub const READ_CONSISTENCY_HEADER: &str = "X-Consistency-R";
pub const WRITE_CONSISTENCY_HEADER: &str = "X-Consistency-W";
/// JSON version vector from an earlier read.
pub const CONTEXT_HEADER: &str = "X-Context";

/// Response of `GET /kv/{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    pub value: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<VersionVector>,
    /// Only set when more than one concurrent version survived.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub siblings: Vec<Sibling>,
    #[serde(default)]
    pub context: VersionVector,
    pub found: bool,
}

impl From<ReadResult> for GetResponse {
    fn from(result: ReadResult) -> Self {
        let value = result.value().map(<[u8]>::to_vec);
        let versions = result.versions();
        let siblings = if result.has_siblings() {
            result
                .siblings
                .into_iter()
                .map(|record| Sibling {
                    value: record.value,
                    version: record.version,
                })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            key: result.key,
            value,
            versions,
            siblings,
            context: result.context,
            found: result.found,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sibling {
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
    pub version: VersionVector,
}

/// Response of `PUT /kv/{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResponse {
    pub version: VersionVector,
}

/// Body of `PUT /internal/storage/{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicateRequest {
    pub key: String,
    #[serde(default, with = "base64_bytes")]
    pub value: Vec<u8>,
    pub version: VersionVector,
    #[serde(default)]
    pub tombstone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    /// Owner the receiver holds this write for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_for: Option<NodeId>,
}

impl ReplicateRequest {
    pub fn from_write(key: &str, write: &ReplicaWrite) -> Self {
        Self {
            key: key.to_string(),
            value: write.record.value.clone(),
            version: write.record.version.clone(),
            tombstone: write.record.tombstone,
            timestamp_ms: Some(write.record.timestamp_ms),
            hint_for: write.hint_for.clone(),
        }
    }

    pub fn into_write(self) -> ReplicaWrite {
        let record = VersionedRecord {
            value: if self.tombstone { Vec::new() } else { self.value },
            version: self.version,
            timestamp_ms: self.timestamp_ms.unwrap_or_else(now_ms),
            tombstone: self.tombstone,
        };
        ReplicaWrite {
            record,
            hint_for: self.hint_for,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplicateResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Response of `GET /internal/storage/{key}`. Tombstones are reported
/// with `found: true` so the coordinator can order them.
///
/// A single held record is flattened into the top-level fields; concurrent
/// ones are listed under `siblings` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaGetResponse {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    pub value: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionVector>,
    #[serde(default)]
    pub tombstone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub siblings: Vec<ReplicaRecord>,
    pub found: bool,
}

/// One stored record of a replica, tombstones included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaRecord {
    #[serde(default, with = "base64_bytes")]
    pub value: Vec<u8>,
    pub version: VersionVector,
    #[serde(default)]
    pub tombstone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl From<VersionedRecord> for ReplicaRecord {
    fn from(record: VersionedRecord) -> Self {
        Self {
            value: record.value,
            version: record.version,
            tombstone: record.tombstone,
            timestamp_ms: Some(record.timestamp_ms),
        }
    }
}

impl ReplicaRecord {
    pub fn into_record(self) -> VersionedRecord {
        VersionedRecord {
            value: if self.tombstone { Vec::new() } else { self.value },
            version: self.version,
            timestamp_ms: self.timestamp_ms.unwrap_or_else(now_ms),
            tombstone: self.tombstone,
        }
    }
}

impl ReplicaGetResponse {
    pub fn from_records(key: &str, mut records: Vec<VersionedRecord>) -> Self {
        let mut response = Self {
            key: key.to_string(),
            value: None,
            version: None,
            tombstone: false,
            timestamp_ms: None,
            siblings: Vec::new(),
            found: !records.is_empty(),
        };
        match records.len() {
            0 => {}
            1 => {
                let record = records.remove(0);
                response.value = record.live_value().map(<[u8]>::to_vec);
                response.version = Some(record.version);
                response.tombstone = record.tombstone;
                response.timestamp_ms = Some(record.timestamp_ms);
            }
            _ => response.siblings = records.into_iter().map(ReplicaRecord::from).collect(),
        }
        response
    }

    /// Every record the replica reported; empty when it held none.
    pub fn into_records(self) -> Vec<VersionedRecord> {
        if !self.found {
            return Vec::new();
        }
        if !self.siblings.is_empty() {
            return self
                .siblings
                .into_iter()
                .map(ReplicaRecord::into_record)
                .collect();
        }
        let Some(version) = self.version else {
            return Vec::new();
        };
        let single = ReplicaRecord {
            value: self.value.unwrap_or_default(),
            version,
            tombstone: self.tombstone,
            timestamp_ms: self.timestamp_ms,
        };
        vec![single.into_record()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

mod base64_opt {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vv(entries: &[(&str, u64)]) -> VersionVector {
        entries.iter().map(|(n, c)| (*n, *c)).collect()
    }

    #[test]
    fn test_values_are_base64() {
        let request = ReplicateRequest::from_write(
            "k",
            &ReplicaWrite {
                record: VersionedRecord::new("hello", vv(&[("n1", 1)])),
                hint_for: None,
            },
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["value"], "aGVsbG8=");
        assert_eq!(json["version"], serde_json::json!({"n1": 1}));
        assert!(json.get("hint_for").is_none());
    }

    #[test]
    fn test_minimal_replicate_body_is_accepted() {
        let body = r#"{"key":"k","value":"dg==","version":{"n1":2}}"#;
        let write = serde_json::from_str::<ReplicateRequest>(body)
            .unwrap()
            .into_write();
        assert_eq!(write.record.value, b"v");
        assert!(!write.record.tombstone);
        assert_eq!(write.hint_for, None);
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let body = r#"{"key":"k","value":"not base64!","version":{}}"#;
        assert!(serde_json::from_str::<ReplicateRequest>(body).is_err());
    }

    #[test]
    fn test_replica_get_keeps_tombstones() {
        let tombstone = VersionedRecord::tombstone(vv(&[("n1", 3)]));
        let response = ReplicaGetResponse::from_records("k", vec![tombstone]);
        assert!(response.found);
        assert!(response.tombstone);
        assert_eq!(response.value, None);
        assert!(response.siblings.is_empty());

        let records = response.into_records();
        assert_eq!(records.len(), 1);
        assert!(records[0].tombstone);
        assert_eq!(records[0].version, vv(&[("n1", 3)]));

        let missing = ReplicaGetResponse::from_records("k", Vec::new());
        assert!(!missing.found);
        assert!(missing.into_records().is_empty());
    }

    #[test]
    fn test_replica_get_lists_concurrent_records() {
        let left = VersionedRecord::new("left", vv(&[("n1", 1)]));
        let right = VersionedRecord::new("right", vv(&[("n2", 1)]));
        let response = ReplicaGetResponse::from_records("k", vec![left.clone(), right.clone()]);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("version").is_none());
        assert_eq!(json["siblings"][0]["value"], "bGVmdA==");
        assert_eq!(json["siblings"][1]["version"], serde_json::json!({"n2": 1}));

        let decoded: ReplicaGetResponse = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.into_records(), vec![left, right]);
    }

    #[test]
    fn test_get_response_omits_empty_fields() {
        let response = GetResponse {
            key: "k".into(),
            value: None,
            versions: Vec::new(),
            siblings: Vec::new(),
            context: VersionVector::new(),
            found: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({"key": "k", "context": {}, "found": false}));
    }
}
