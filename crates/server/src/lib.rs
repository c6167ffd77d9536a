//! HTTP front end of a storage node.
//!
//! - Client API: `GET/PUT/DELETE /kv/{key}`
//! - Replication API: `GET/PUT /internal/storage/{key}`
//! - Probes: `/healthz`, `/readyz`

pub mod client;
pub mod error;
pub mod handlers;
pub mod node;
pub mod protocol;
pub mod router;

pub use client::HttpPeerClient;
pub use error::ApiError;
pub use node::{serve, HttpCoordinator, HttpState, NodeSpec, ServerError};
pub use router::{router, AppState};
