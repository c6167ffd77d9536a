//! Shared handler state and route table.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use replication::{Coordinator, PeerClient};
use storage::ReplicaStore;

use crate::handlers;
use crate::protocol::{
    HEALTH_PATH, INTERNAL_STORAGE_PATH, INTERNAL_STORAGE_PREFIX, KV_PATH, KV_PREFIX, READY_PATH,
};

/// State handed to every handler.
pub struct AppState<S, C> {
    pub coordinator: Arc<Coordinator<S, C>>,
    ready: Arc<AtomicBool>,
}

impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            ready: Arc::clone(&self.ready),
        }
    }
}

impl<S: ReplicaStore, C: PeerClient> AppState<S, C> {
    /// Starts out not ready; call [`mark_ready`](Self::mark_ready) once the
    /// ring is populated.
    pub fn new(coordinator: Arc<Coordinator<S, C>>) -> Self {
        Self {
            coordinator,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Ready once marked and the ring has at least one node.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire) && !self.coordinator.ring().is_empty()
    }
}

/// Client, internal replication, and probe routes.
pub fn router<S: ReplicaStore, C: PeerClient>(state: AppState<S, C>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(handlers::healthz))
        .route(READY_PATH, get(handlers::readyz::<S, C>))
        .route(
            KV_PATH,
            get(handlers::get_kv::<S, C>)
                .put(handlers::put_kv::<S, C>)
                .delete(handlers::delete_kv::<S, C>),
        )
        .route(
            INTERNAL_STORAGE_PATH,
            get(handlers::get_replica::<S, C>)
                .put(handlers::put_replica::<S, C>)
                .post(handlers::put_replica::<S, C>),
        )
        .route(KV_PREFIX, axum::routing::any(handlers::empty_key))
        .route(INTERNAL_STORAGE_PREFIX, axum::routing::any(handlers::empty_key))
        .with_state(state)
}
