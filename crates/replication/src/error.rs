//! Error types for replica calls and coordinated requests.

use std::time::Duration;

use corelib::NodeId;
use storage::StorageError;

/// Failure of a single replica operation, local or remote.
///
/// These never reach the client directly: the coordinator folds them into
/// its success count.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplicaError {
    #[error("replica call timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("replica returned status {0}")]
    Status(u16),
    #[error("replica rejected the write: {0}")]
    Rejected(String),
    #[error("malformed replica response: {0}")]
    Decode(String),
    #[error("node {0} has no known address")]
    UnknownNode(NodeId),
    #[error(transparent)]
    Store(#[from] StorageError),
}

impl ReplicaError {
    /// Whether the failure says the node could not be reached, as opposed
    /// to a reachable node refusing or garbling one request.
    pub fn is_unreachable(&self) -> bool {
        match self {
            ReplicaError::Timeout(_) | ReplicaError::Transport(_) => true,
            ReplicaError::Status(status) => *status >= 500,
            ReplicaError::Rejected(_)
            | ReplicaError::Decode(_)
            | ReplicaError::UnknownNode(_)
            | ReplicaError::Store(_) => false,
        }
    }
}

/// Result type alias for coordinated requests.
pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Outcome of a client request that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    /// Empty key or malformed input; never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// No node has joined the ring yet.
    #[error("ring unavailable: no nodes registered")]
    RingUnavailable,
    /// Fewer than the required replicas answered. Writes that did land are
    /// kept.
    #[error("insufficient replicas: needed {needed}, got {got}")]
    InsufficientReplicas { needed: usize, got: usize },
}

impl From<StorageError> for CoordinatorError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidArgument(msg) => CoordinatorError::InvalidArgument(msg),
        }
    }
}

impl CoordinatorError {
    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CoordinatorError::InvalidArgument(_))
    }
}
