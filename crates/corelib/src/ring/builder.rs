//! Builder for rings with a known initial membership.

use crate::error::Result;
use crate::node::Node;
use crate::partitioner::{Md5Partitioner, Partitioner};
use crate::ring::ring::{HashRing, DEFAULT_VNODES};
use crate::token::LongToken;

/// Builds a [`HashRing`] from a static node list.
///
/// # Example
///
/// ```rust
/// use corelib::{Node, RingBuilder};
///
/// let ring = RingBuilder::new()
///     .with_vnodes(8)
///     .add_node(Node::new("node1", "127.0.0.1:8080"))
///     .add_node(Node::new("node2", "127.0.0.1:8081"))
///     .build()
///     .unwrap();
/// assert_eq!(ring.token_count(), 16);
/// ```
#[derive(Debug)]
pub struct RingBuilder<P = Md5Partitioner> {
    partitioner: P,
    vnodes_per_node: usize,
    nodes: Vec<Node>,
}

impl RingBuilder<Md5Partitioner> {
    pub fn new() -> Self {
        Self {
            partitioner: Md5Partitioner,
            vnodes_per_node: DEFAULT_VNODES,
            nodes: Vec::new(),
        }
    }
}

impl Default for RingBuilder<Md5Partitioner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> RingBuilder<P>
where
    P: Partitioner<TokenType = LongToken>,
{
    /// Swap the partitioner, keeping the nodes added so far.
    pub fn with_partitioner<Q>(self, partitioner: Q) -> RingBuilder<Q>
    where
        Q: Partitioner<TokenType = LongToken>,
    {
        RingBuilder {
            partitioner,
            vnodes_per_node: self.vnodes_per_node,
            nodes: self.nodes,
        }
    }

    pub fn with_vnodes(mut self, vnodes_per_node: usize) -> Self {
        self.vnodes_per_node = vnodes_per_node;
        self
    }

    pub fn add_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn add_nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Fails on the first duplicate or empty node id.
    pub fn build(self) -> Result<HashRing<P>> {
        let ring = HashRing::with_partitioner(self.partitioner, self.vnodes_per_node);
        for node in self.nodes {
            ring.add_node(node)?;
        }
        Ok(ring)
    }
}
