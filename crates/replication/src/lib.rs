//! Quorum replication on top of the hash ring.
//!
//! This crate decides, for every client request:
//! - Which nodes hold the key (placement, with sloppy-quorum fallbacks)
//! - How many of them must answer (consistency levels)
//! - How divergent replica responses are reconciled into siblings

pub mod consistency;
pub mod coordinator;
pub mod error;
pub mod health;
pub mod peer;
pub mod placement;
pub mod reconcile;

pub use consistency::{ConsistencyLevel, QuorumConfig, QuorumConfigError};
pub use coordinator::{Coordinator, ReadResult, RequestOptions};
pub use error::{CoordinatorError, ReplicaError, Result};
pub use health::NodeHealth;
pub use peer::{PeerClient, ReplicaWrite};
pub use placement::ReplicaPlacement;
