//! 64-bit token covering the full `u64` ring.

use crate::token::traits::Token;

/// Position on a ring of size 2^64.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LongToken(pub u64);

impl Token for LongToken {
    fn distance_to(&self, other: &Self) -> Self {
        // Wrapping subtraction is exactly the clockwise distance on a 2^64 ring.
        LongToken(other.0.wrapping_sub(self.0))
    }
}

impl LongToken {
    /// Big-endian interpretation of the first 8 bytes of a digest.
    ///
    /// Shorter inputs are zero-padded on the right.
    pub fn from_digest_prefix(digest: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        let len = digest.len().min(8);
        buf[..len].copy_from_slice(&digest[..len]);
        LongToken(u64::from_be_bytes(buf))
    }

    /// Fraction of the full ring this distance covers.
    pub fn ring_fraction(&self) -> f64 {
        self.0 as f64 / (u64::MAX as f64 + 1.0)
    }
}

impl std::fmt::Display for LongToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
