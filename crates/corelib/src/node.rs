//! Node abstractions for the consistent hash ring.
//!
//! Nodes represent physical participants in the ring. They are identified by
//! an opaque string id that stays stable for the lifetime of the process.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a physical node in the cluster.
///
/// The id doubles as the key of the node's slot in every version vector, so
/// it must be unique within a cluster.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Physical node participating in the ring.
///
/// Keep this struct small and cheap to clone; connection state lives in the
/// peer client, liveness in the coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// `host:port` other nodes use to reach this one.
    pub address: String,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}
