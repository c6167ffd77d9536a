//! Node configuration from flags and environment.

use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use corelib::{Node, NodeId};
use replication::{QuorumConfig, QuorumConfigError};
use server::NodeSpec;

const DEFAULT_REPLICATION_FACTOR: usize = 3;
const DEFAULT_READ_QUORUM: usize = 2;
const DEFAULT_WRITE_QUORUM: usize = 2;
const DEFAULT_VNODES: usize = 20;
const FALLBACK_NODE_ID: &str = "node-unknown";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid peer {0:?}, expected <id>=<address>")]
    InvalidPeer(String),
    #[error("peer id {0} is the local node id")]
    PeerIsSelf(NodeId),
    #[error(transparent)]
    Quorum(#[from] QuorumConfigError),
}

/// A `--peer id=address` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerArg(pub Node);

impl FromStr for PeerArg {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((id, address)) if !id.trim().is_empty() && !address.trim().is_empty() => {
                Ok(PeerArg(Node::new(id.trim(), address.trim())))
            }
            _ => Err(ConfigError::InvalidPeer(s.to_string())),
        }
    }
}

/// Storage node of a replicated key-value store.
#[derive(Debug, Clone, Parser)]
#[command(name = "dhtnode", version)]
pub struct NodeConfig {
    /// Node id; defaults to the hostname
    #[arg(long, env = "DHT_NODE_ID")]
    pub node_id: Option<String>,

    /// Address to listen on
    #[arg(long, env = "DHT_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Address other nodes use to reach this one; defaults to --bind
    #[arg(long, env = "DHT_ADVERTISE")]
    pub advertise: Option<String>,

    /// Static peer as <id>=<address>, repeatable
    #[arg(long = "peer", value_name = "ID=ADDR")]
    pub peers: Vec<PeerArg>,

    /// Replicas per key (N)
    #[arg(long, env = "DHT_REPLICATION_FACTOR", default_value_t = DEFAULT_REPLICATION_FACTOR)]
    pub replication_factor: usize,

    /// Default read quorum (R)
    #[arg(short = 'r', long = "read-quorum", default_value_t = DEFAULT_READ_QUORUM)]
    pub read_quorum: usize,

    /// Default write quorum (W)
    #[arg(short = 'w', long = "write-quorum", default_value_t = DEFAULT_WRITE_QUORUM)]
    pub write_quorum: usize,

    /// Virtual nodes per physical node
    #[arg(long, default_value_t = DEFAULT_VNODES)]
    pub vnodes: usize,

    /// Timeout of a single peer call, in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Deadline of a whole client request, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    /// Do not push resolved versions to stale replicas after reads
    #[arg(long)]
    pub no_read_repair: bool,

    /// Fail instead of writing hints past the preference list
    #[arg(long)]
    pub no_sloppy_quorum: bool,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, env = "DHT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl NodeConfig {
    /// Apply defaults and check the quorum triple.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.replication_factor == 0 {
            self.replication_factor = DEFAULT_REPLICATION_FACTOR;
        }
        if self.read_quorum == 0 {
            self.read_quorum = DEFAULT_READ_QUORUM;
        }
        if self.write_quorum == 0 {
            self.write_quorum = DEFAULT_WRITE_QUORUM;
        }
        if self.vnodes == 0 {
            self.vnodes = DEFAULT_VNODES;
        }
        if self.node_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            self.node_id = Some(default_node_id());
        }

        self.quorum().validate()?;
        let local = self.local_id();
        if let Some(PeerArg(peer)) = self.peers.iter().find(|PeerArg(peer)| peer.id == local) {
            return Err(ConfigError::PeerIsSelf(peer.id.clone()));
        }
        Ok(self)
    }

    pub fn local_id(&self) -> NodeId {
        NodeId::new(self.node_id.clone().unwrap_or_else(default_node_id))
    }

    pub fn quorum(&self) -> QuorumConfig {
        QuorumConfig {
            replication_factor: self.replication_factor,
            read_quorum: self.read_quorum,
            write_quorum: self.write_quorum,
            peer_timeout: Duration::from_millis(self.timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            read_repair: !self.no_read_repair,
            sloppy_quorum: !self.no_sloppy_quorum,
        }
    }

    pub fn node_spec(&self) -> NodeSpec {
        NodeSpec {
            id: self.local_id(),
            advertise: self.advertise.clone().unwrap_or_else(|| self.bind.clone()),
            peers: self.peers.iter().map(|PeerArg(peer)| peer.clone()).collect(),
            vnodes: self.vnodes,
            quorum: self.quorum(),
        }
    }
}

/// Hostname, or a fixed placeholder when none can be found.
fn default_node_id() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_NODE_ID.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> NodeConfig {
        NodeConfig::try_parse_from(std::iter::once("dhtnode").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--node-id", "n1"]).validate().unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.vnodes, 20);

        let quorum = config.quorum();
        assert_eq!(
            (quorum.replication_factor, quorum.read_quorum, quorum.write_quorum),
            (3, 2, 2)
        );
        assert_eq!(quorum.peer_timeout, Duration::from_secs(5));
        assert!(quorum.read_repair && quorum.sloppy_quorum);
    }

    #[test]
    fn test_quorum_above_replication_rejected() {
        let err = parse(&["--node-id", "n1", "-r", "4"]).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected replication configuration (R=4 W=2 N=3)"
        );
    }

    #[test]
    fn test_zero_values_fall_back() {
        let config = parse(&["--node-id", "n1", "--replication-factor", "0", "-w", "0"])
            .validate()
            .unwrap();
        assert_eq!(config.replication_factor, 3);
        assert_eq!(config.write_quorum, 2);
    }

    #[test]
    fn test_peers_and_advertise() {
        let config = parse(&[
            "--node-id",
            "n1",
            "--bind",
            "0.0.0.0:8080",
            "--advertise",
            "10.0.0.1:8080",
            "--peer",
            "n2=10.0.0.2:8080",
            "--peer",
            "n3=10.0.0.3:8080",
        ])
        .validate()
        .unwrap();

        let spec = config.node_spec();
        assert_eq!(spec.id, NodeId::from("n1"));
        assert_eq!(spec.advertise, "10.0.0.1:8080");
        assert_eq!(spec.peers.len(), 2);
        assert_eq!(spec.peers[1], Node::new("n3", "10.0.0.3:8080"));
    }

    #[test]
    fn test_bad_peers_rejected() {
        assert!("n2".parse::<PeerArg>().is_err());
        assert!("=addr".parse::<PeerArg>().is_err());

        let err = parse(&["--node-id", "n1", "--peer", "n1=10.0.0.1:1"])
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::PeerIsSelf(NodeId::from("n1")));
    }

    #[test]
    fn test_node_id_defaults_to_something() {
        let config = parse(&[]).validate().unwrap();
        assert!(!config.local_id().is_empty());
    }
}
