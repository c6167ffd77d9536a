//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! Instead of each physical node owning a single position on the ring, each
//! node owns `k` positions (virtual nodes). This provides:
//!
//! 1. **Better Load Distribution**: more positions smooth out the ranges
//! 2. **Gradual Rebalancing**: a join/leave moves about `1/V` of the keyspace
//!    per vnode instead of a whole neighbour's range
//! 3. **Fault Tolerance**: the ranges of a failed node are spread over many
//!    successors
//!
//! # Performance Characteristics
//!
//! - **Memory**: O(k) per physical node
//! - **Lookup**: O(log V) where V = total vnodes on the ring
//!
//! # Typical Configuration
//!
//! 20 to 100 vnodes per node is plenty for clusters of a few dozen nodes.

use crate::node::NodeId;
use crate::partitioner::Partitioner;
use crate::token::LongToken;

/// A virtual node on the hash ring.
///
/// # Invariants
///
/// - Every `VirtualNode` belongs to exactly one physical node
/// - The id is derived from the owner and an index, so it is unique
///   as long as node ids are unique
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualNode {
    /// `"<node_id>-vnode-<index>"`.
    pub id: String,
    /// The physical node that owns this virtual node.
    pub node_id: NodeId,
    /// Position on the ring, the hash of `id`.
    pub token: LongToken,
}

impl VirtualNode {
    /// Create a virtual node from a node ID and vnode index.
    ///
    /// # Algorithm
    ///
    /// 1. Format string: `"<node_id>-vnode-<index>"`
    /// 2. Hash the string with the ring's partitioner
    ///
    /// # Example
    /// ```rust
    /// use corelib::partitioner::Md5Partitioner;
    /// use corelib::{NodeId, VirtualNode};
    ///
    /// let vnode = VirtualNode::from_index(&NodeId::from("node1"), 0, &Md5Partitioner);
    /// assert_eq!(vnode.id, "node1-vnode-0");
    /// ```
    pub fn from_index<P>(node_id: &NodeId, vnode_index: usize, partitioner: &P) -> Self
    where
        P: Partitioner<TokenType = LongToken>,
    {
        let id = vnode_id(node_id, vnode_index);
        let token = partitioner.partition(id.as_bytes());

        Self {
            id,
            node_id: node_id.clone(),
            token,
        }
    }

    #[inline]
    pub fn token(&self) -> LongToken {
        self.token
    }

    #[inline]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }
}

/// Ring order: by position, ties broken by id so sorting is total.
impl Ord for VirtualNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.token
            .cmp(&other.token)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for VirtualNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VNode({}, token={}, node={})", self.id, self.token, self.node_id)
    }
}

fn vnode_id(node_id: &NodeId, vnode_index: usize) -> String {
    format!("{}-vnode-{}", node_id, vnode_index)
}
