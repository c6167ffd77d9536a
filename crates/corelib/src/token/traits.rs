use std::fmt::Debug;
use std::hash::Hash;

/// A position on the ring.
///
/// Positions wrap: the successor of the largest token is the smallest one.
pub trait Token: Clone + Ord + Hash + Send + Sync + Debug + 'static {
    /// Clockwise distance from `self` to `other`, wrapping past the end.
    fn distance_to(&self, other: &Self) -> Self;
}
