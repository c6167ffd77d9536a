//! Consistent hash ring implementation.
//!
//! The ring manages vnode positions and provides the key -> preference list
//! mapping used by the coordinator.

pub mod builder;
pub mod ring;

pub use builder::RingBuilder;
pub use ring::{HashRing, DEFAULT_VNODES};

/// Alias for the main ring type (used by lib.rs).
pub type Ring = HashRing;
