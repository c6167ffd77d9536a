//! Error types for the replica store.

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Empty key or otherwise malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
