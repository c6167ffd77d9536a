//! Remote replica invocation.

use async_trait::async_trait;
use corelib::{Node, NodeId};
use storage::VersionedRecord;

use crate::error::ReplicaError;

/// A write shipped to a replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaWrite {
    pub record: VersionedRecord,
    /// Set when the target stores the record on behalf of this node.
    pub hint_for: Option<NodeId>,
}

/// Node-to-node replication calls.
///
/// Implementations should bound every call; the coordinator adds its own
/// timeout on top, so a hung call only ever costs one replica.
#[async_trait]
pub trait PeerClient: Send + Sync + 'static {
    /// Store `write` on `target`.
    async fn put_replica(
        &self,
        target: &Node,
        key: &str,
        write: &ReplicaWrite,
    ) -> Result<(), ReplicaError>;

    /// Fetch `target`'s siblings for `key`, tombstones included. Empty when
    /// the replica has never seen the key.
    async fn get_replica(
        &self,
        target: &Node,
        key: &str,
    ) -> Result<Vec<VersionedRecord>, ReplicaError>;
}
