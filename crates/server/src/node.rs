//! Assembling and serving a node.

use std::future::Future;
use std::sync::Arc;

use corelib::{HashRing, Node, NodeId};
use replication::{Coordinator, QuorumConfig, QuorumConfigError};
use storage::MemoryStore;
use tokio::net::TcpListener;

use crate::client::HttpPeerClient;
use crate::router::{router, AppState};

pub type HttpCoordinator = Coordinator<MemoryStore, HttpPeerClient>;
pub type HttpState = AppState<MemoryStore, HttpPeerClient>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid membership: {0}")]
    Ring(#[from] corelib::Error),
    #[error(transparent)]
    Quorum(#[from] QuorumConfigError),
    #[error("failed to build peer client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to start one node.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub id: NodeId,
    /// Address other nodes reach this one at.
    pub advertise: String,
    /// Static membership, self excluded.
    pub peers: Vec<Node>,
    pub vnodes: usize,
    pub quorum: QuorumConfig,
}

impl NodeSpec {
    /// Ring holding this node and its peers.
    pub fn ring(&self) -> Result<HashRing, ServerError> {
        let ring = HashRing::with_vnodes(self.vnodes);
        ring.add_node(Node::new(self.id.clone(), self.advertise.clone()))?;
        for peer in &self.peers {
            ring.add_node(peer.clone())?;
        }
        Ok(ring)
    }

    /// Ready-to-serve state with an empty in-memory store.
    pub fn build(&self) -> Result<HttpState, ServerError> {
        self.quorum.validate()?;
        let ring = Arc::new(self.ring()?);
        let peers = Arc::new(HttpPeerClient::new(self.quorum.peer_timeout)?);
        let coordinator = Coordinator::new(
            self.id.clone(),
            ring,
            Arc::new(MemoryStore::new()),
            peers,
            self.quorum.clone(),
        );

        let state = AppState::new(Arc::new(coordinator));
        state.mark_ready();
        tracing::info!(
            node = %self.id,
            nodes = state.coordinator.ring().size(),
            vnodes = self.vnodes,
            "node initialized"
        );
        Ok(state)
    }
}

/// Serve `state` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: HttpState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
