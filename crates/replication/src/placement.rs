//! Replica placement for a single key.

use corelib::partitioner::Partitioner;
use corelib::token::LongToken;
use corelib::{HashRing, NodeId};

/// Nodes responsible for a key, split at the replication factor.
///
/// `nominal` is the preference list (length `min(N, ring size)`),
/// `fallbacks` the rest of the ring in clockwise order. Sloppy quorum
/// borrows from `fallbacks` front to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaPlacement {
    pub nominal: Vec<NodeId>,
    pub fallbacks: Vec<NodeId>,
}

impl ReplicaPlacement {
    /// # Errors
    /// [`corelib::Error::EmptyRing`] when no node is registered.
    pub fn for_key<P>(ring: &HashRing<P>, key: &str, n: usize) -> corelib::Result<Self>
    where
        P: Partitioner<TokenType = LongToken>,
    {
        let mut walk = ring.walk(key)?;
        let n = n.clamp(1, walk.len());
        let fallbacks = walk.split_off(n);
        Ok(Self {
            nominal: walk,
            fallbacks,
        })
    }

    /// Effective replication factor for this key.
    pub fn n(&self) -> usize {
        self.nominal.len()
    }

    pub fn is_replica(&self, node: &NodeId) -> bool {
        self.nominal.contains(node)
    }
}
