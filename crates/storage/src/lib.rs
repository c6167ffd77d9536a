//! Replica-local storage.
//!
//! Every node keeps the versions it is responsible for in a [`ReplicaStore`],
//! one set of concurrent siblings per key.
//! The store only knows about single keys; placement and quorum logic live
//! in the `replication` crate.
//!
//! - [`MemoryStore`]: key-sharded in-memory implementation
//! - [`LegacyStore`]: raw-bytes adapter tagging writes with a pseudo node
//! - [`HintStore`]: writes accepted on behalf of unreachable replicas

pub mod engine;
pub mod error;
pub mod hints;
pub mod legacy;
pub mod memory;
pub mod record;
pub mod siblings;

pub use engine::{KvStore, PutOutcome, ReplicaStore};
pub use error::{Result, StorageError};
pub use hints::{Hint, HintStore};
pub use legacy::{LegacyStore, LEGACY_NODE_ID};
pub use memory::MemoryStore;
pub use record::VersionedRecord;
pub use siblings::merged_version;
