//! Core library for the replicated key-value store.
//!
//! This crate provides the placement and causality primitives:
//! - Token types and partitioners (key -> ring position)
//! - Node and virtual node abstractions
//! - The consistent hash ring and its preference lists
//! - Version vectors for detecting concurrent updates

pub mod error;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod token;
pub mod version;
pub mod vnode;

pub use error::{Error, Result};
pub use node::{Node, NodeId};
pub use partitioner::Partitioner;
pub use ring::{HashRing, Ring, RingBuilder};
pub use token::Token;
pub use version::{VersionOrder, VersionVector};
pub use vnode::VirtualNode;
