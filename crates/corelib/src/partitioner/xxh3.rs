//! XXH3 partitioner.

use crate::partitioner::traits::Partitioner;
use crate::token::LongToken;
use xxhash_rust::xxh3::xxh3_64;

/// Faster alternative to [`Md5Partitioner`](super::Md5Partitioner).
///
/// Positions differ from the MD5 ones, so every node of a cluster must agree
/// on the partitioner.
#[derive(Clone, Copy, Debug, Default)]
pub struct Xxh3Partitioner;

impl Partitioner for Xxh3Partitioner {
    type TokenType = LongToken;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        LongToken(xxh3_64(key))
    }

    fn name(&self) -> &'static str {
        "Xxh3Partitioner"
    }
}
