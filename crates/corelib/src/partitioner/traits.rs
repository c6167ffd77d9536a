use crate::token::Token;

/// Maps node ids and keys to ring positions.
///
/// Every node in a cluster must use the same partitioner, and it must be
/// deterministic across processes: two nodes hashing `"user:1"` have to land
/// on the same token or they will disagree about the replicas.
pub trait Partitioner: Send + Sync + 'static {
    type TokenType: Token;

    fn partition(&self, key: &[u8]) -> Self::TokenType;

    /// Short name, reported by the ring for diagnostics.
    fn name(&self) -> &'static str;
}
