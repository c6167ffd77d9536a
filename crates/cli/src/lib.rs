//! `dhtnode`: runs one storage node.
//!
//! Provides:
//! - Flag and environment parsing into a validated [`NodeConfig`]
//! - Logging setup
//! - The serve loop with graceful shutdown

pub mod config;
pub mod telemetry;

use anyhow::Context;
use tokio::net::TcpListener;

pub use config::{ConfigError, NodeConfig, PeerArg};

/// Build the node described by `config` and serve until Ctrl-C.
pub async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let spec = config.node_spec();
    let state = spec.build().context("failed to initialize node")?;

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(
        node = %spec.id,
        bind = %config.bind,
        advertise = %spec.advertise,
        peers = spec.peers.len(),
        n = spec.quorum.replication_factor,
        r = spec.quorum.read_quorum,
        w = spec.quorum.write_quorum,
        "listening"
    );

    server::serve(listener, state, shutdown_signal())
        .await
        .context("server failed")?;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
