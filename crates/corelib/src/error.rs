//! Error types for the core library.

use crate::node::NodeId;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A node with this id is already part of the ring.
    #[error("node {0} already exists")]
    AlreadyExists(NodeId),
    /// The node is not part of the ring.
    #[error("node {0} does not exist")]
    NotFound(NodeId),
    /// No node has been registered yet.
    #[error("no nodes in ring")]
    EmptyRing,
    /// Malformed input (empty id, empty key, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
