//! Hash ring data structure.
//!
//! Holds the node map and the sorted vnode sequence behind a single
//! `RwLock`. Readers never see a sequence that is being re-sorted: every
//! mutation builds under the write lock and every read copies what it needs
//! out before the guard is released.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::node::{Node, NodeId};
use crate::partitioner::{Md5Partitioner, Partitioner};
use crate::token::{LongToken, Token};
use crate::vnode::VirtualNode;

/// Virtual nodes per physical node when none is configured.
pub const DEFAULT_VNODES: usize = 100;

#[derive(Debug, Default)]
struct RingState {
    /// Sorted by (token, id).
    vnodes: Vec<VirtualNode>,
    /// node id -> address.
    nodes: HashMap<NodeId, String>,
}

/// Consistent hash ring with virtual nodes.
///
/// All methods take `&self`; the ring is meant to be shared behind an `Arc`
/// between the request handlers and whatever feeds it membership changes.
#[derive(Debug)]
pub struct HashRing<P = Md5Partitioner> {
    partitioner: P,
    vnodes_per_node: usize,
    state: RwLock<RingState>,
}

impl HashRing<Md5Partitioner> {
    /// Empty ring with the MD5 partitioner and [`DEFAULT_VNODES`] per node.
    pub fn new() -> Self {
        Self::with_partitioner(Md5Partitioner, DEFAULT_VNODES)
    }

    /// Empty ring with the MD5 partitioner and `vnodes_per_node` per node.
    pub fn with_vnodes(vnodes_per_node: usize) -> Self {
        Self::with_partitioner(Md5Partitioner, vnodes_per_node)
    }
}

impl Default for HashRing<Md5Partitioner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> HashRing<P>
where
    P: Partitioner<TokenType = LongToken>,
{
    /// Empty ring using `partitioner`. A vnode count of 0 falls back to
    /// [`DEFAULT_VNODES`].
    pub fn with_partitioner(partitioner: P, vnodes_per_node: usize) -> Self {
        let vnodes_per_node = if vnodes_per_node == 0 {
            DEFAULT_VNODES
        } else {
            vnodes_per_node
        };
        Self {
            partitioner,
            vnodes_per_node,
            state: RwLock::new(RingState::default()),
        }
    }

    /// Add a physical node and its virtual nodes.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if the id is empty
    /// - [`Error::AlreadyExists`] if the id is already on the ring
    ///
    /// # Performance
    /// O(V log V) where V is the total number of vnodes after the insert.
    pub fn add_node(&self, node: Node) -> Result<()> {
        if node.id.is_empty() {
            return Err(Error::InvalidArgument("node id cannot be empty".into()));
        }

        // Hash outside the lock, vnode generation does not touch ring state.
        let mut fresh: Vec<VirtualNode> = (0..self.vnodes_per_node)
            .map(|i| VirtualNode::from_index(&node.id, i, &self.partitioner))
            .collect();

        let mut state = self.state.write();
        if state.nodes.contains_key(&node.id) {
            return Err(Error::AlreadyExists(node.id));
        }

        state.vnodes.append(&mut fresh);
        state.vnodes.sort_unstable();
        state.nodes.insert(node.id, node.address);
        Ok(())
    }

    /// Remove a physical node and every vnode it owns.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the node is not on the ring.
    pub fn remove_node(&self, node_id: &NodeId) -> Result<()> {
        let mut state = self.state.write();
        if state.nodes.remove(node_id).is_none() {
            return Err(Error::NotFound(node_id.clone()));
        }
        state.vnodes.retain(|vnode| &vnode.node_id != node_id);
        Ok(())
    }

    /// Ordered, duplicate-free list of up to `n` nodes responsible for `key`.
    ///
    /// # Algorithm
    ///
    /// 1. Hash the key with the same partitioner used for vnode positions
    /// 2. Binary search the first vnode with position >= hash, wrapping to 0
    /// 3. Walk clockwise collecting distinct node ids until `n` are found or
    ///    the whole ring has been visited
    ///
    /// `n == 0` or `n` above the node count is clamped to the node count.
    ///
    /// # Errors
    /// [`Error::EmptyRing`] if no node has been added.
    pub fn preference_list(&self, key: &str, n: usize) -> Result<Vec<NodeId>> {
        let hash = self.partitioner.partition(key.as_bytes());

        let state = self.state.read();
        if state.vnodes.is_empty() {
            return Err(Error::EmptyRing);
        }

        let node_count = state.nodes.len();
        let n = if n == 0 || n > node_count { node_count } else { n };

        let start = successor_index(&state.vnodes, hash);
        let total = state.vnodes.len();

        let mut seen = HashSet::with_capacity(n);
        let mut preference_list = Vec::with_capacity(n);
        for i in 0..total {
            if preference_list.len() >= n {
                break;
            }
            let vnode = &state.vnodes[(start + i) % total];
            if seen.insert(&vnode.node_id) {
                preference_list.push(vnode.node_id.clone());
            }
        }

        Ok(preference_list)
    }

    /// Every node of the ring in clockwise order starting at `key`.
    ///
    /// The first N entries are the preference list; the rest is the order in
    /// which sloppy-quorum fallbacks are tried.
    pub fn walk(&self, key: &str) -> Result<Vec<NodeId>> {
        self.preference_list(key, 0)
    }

    /// First node responsible for `key`, if any.
    pub fn lookup(&self, key: &str) -> Option<NodeId> {
        self.preference_list(key, 1)
            .ok()
            .and_then(|list| list.into_iter().next())
    }

    /// Address registered for `node_id`.
    pub fn node_address(&self, node_id: &NodeId) -> Option<String> {
        self.state.read().nodes.get(node_id).cloned()
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.state.read().nodes.contains_key(node_id)
    }

    /// Number of physical nodes.
    pub fn size(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().nodes.is_empty()
    }

    /// Number of vnodes on the ring.
    pub fn token_count(&self) -> usize {
        self.state.read().vnodes.len()
    }

    pub fn vnodes_per_node(&self) -> usize {
        self.vnodes_per_node
    }

    /// Copy of the physical nodes, sorted by id.
    pub fn nodes(&self) -> Vec<Node> {
        let state = self.state.read();
        let mut nodes: Vec<Node> = state
            .nodes
            .iter()
            .map(|(id, address)| Node::new(id.clone(), address.clone()))
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Copy of the vnode positions in ring order (for debugging and tests).
    pub fn tokens(&self) -> Vec<(LongToken, NodeId)> {
        self.state
            .read()
            .vnodes
            .iter()
            .map(|vnode| (vnode.token, vnode.node_id.clone()))
            .collect()
    }

    /// Fraction of the ring owned by each node.
    ///
    /// A vnode owns the range between its predecessor (exclusive) and itself
    /// (inclusive), the same ranges `preference_list` resolves to.
    pub fn ownership(&self) -> HashMap<NodeId, f64> {
        let state = self.state.read();
        let mut owned: HashMap<NodeId, f64> = HashMap::with_capacity(state.nodes.len());
        let total = state.vnodes.len();
        if total == 0 {
            return owned;
        }
        if total == 1 {
            owned.insert(state.vnodes[0].node_id.clone(), 1.0);
            return owned;
        }

        for (i, vnode) in state.vnodes.iter().enumerate() {
            let prev = &state.vnodes[(i + total - 1) % total];
            let share = prev.token.distance_to(&vnode.token).ring_fraction();
            *owned.entry(vnode.node_id.clone()).or_insert(0.0) += share;
        }
        owned
    }

    pub fn partitioner_name(&self) -> &'static str {
        self.partitioner.name()
    }
}

/// Index of the first vnode whose position is >= `hash`, wrapping to 0.
fn successor_index(vnodes: &[VirtualNode], hash: LongToken) -> usize {
    let idx = vnodes.partition_point(|vnode| vnode.token < hash);
    if idx == vnodes.len() {
        0
    } else {
        idx
    }
}
