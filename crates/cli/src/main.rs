//! CLI entry point for the storage node.

use clap::Parser;
use cli::{telemetry, NodeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::parse().validate()?;
    telemetry::init(&config.log_level);
    cli::run(config).await
}
