//! MD5 partitioner: first 8 bytes of the digest, big-endian.

use crate::partitioner::traits::Partitioner;
use crate::token::LongToken;
use ::md5::{Digest, Md5};

/// Default partitioner.
///
/// MD5 is not used for security here, only for its avalanche behaviour and
/// because every node must derive identical positions from the same ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct Md5Partitioner;

impl Partitioner for Md5Partitioner {
    type TokenType = LongToken;

    fn partition(&self, key: &[u8]) -> Self::TokenType {
        let digest = Md5::digest(key);
        LongToken::from_digest_prefix(&digest)
    }

    fn name(&self) -> &'static str {
        "Md5Partitioner"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_prefix() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(Md5Partitioner.partition(b""), LongToken(0xd41d_8cd9_8f00_b204));
    }
}
