//! Consistency levels and quorum configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How many replicas must answer for a request to succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyLevel {
    One,
    /// Majority of the preference list.
    Quorum,
    /// Every replica of the preference list.
    All,
    Exactly(usize),
}

impl ConsistencyLevel {
    /// Replicas required when the preference list holds `n` nodes.
    ///
    /// Always within `[1, n]` (or 1 for an empty list).
    pub fn required(self, n: usize) -> usize {
        let wanted = match self {
            ConsistencyLevel::One => 1,
            ConsistencyLevel::Quorum => n / 2 + 1,
            ConsistencyLevel::All => n,
            ConsistencyLevel::Exactly(k) => k,
        };
        wanted.clamp(1, n.max(1))
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyLevel::One => f.write_str("one"),
            ConsistencyLevel::Quorum => f.write_str("quorum"),
            ConsistencyLevel::All => f.write_str("all"),
            ConsistencyLevel::Exactly(k) => write!(f, "{}", k),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid consistency level {0:?}, expected one, quorum, all or a positive count")]
pub struct ParseConsistencyError(String);

impl FromStr for ConsistencyLevel {
    type Err = ParseConsistencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "one" => Ok(ConsistencyLevel::One),
            "quorum" => Ok(ConsistencyLevel::Quorum),
            "all" => Ok(ConsistencyLevel::All),
            other => match other.parse::<usize>() {
                Ok(k) if k > 0 => Ok(ConsistencyLevel::Exactly(k)),
                _ => Err(ParseConsistencyError(s.to_string())),
            },
        }
    }
}

/// Replication factor, default quorums and timeouts of a coordinator.
#[derive(Debug, Clone)]
pub struct QuorumConfig {
    /// N: replicas per key.
    pub replication_factor: usize,
    /// R: default read quorum.
    pub read_quorum: usize,
    /// W: default write quorum.
    pub write_quorum: usize,
    /// Bound on a single replica call.
    pub peer_timeout: Duration,
    /// Bound on a whole client request.
    pub request_timeout: Duration,
    /// Push the resolved version to stale replicas after a read.
    pub read_repair: bool,
    /// Walk past the first N nodes when a replica is unreachable.
    pub sloppy_quorum: bool,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            replication_factor: 3,
            read_quorum: 2,
            write_quorum: 2,
            peer_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            read_repair: true,
            sloppy_quorum: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuorumConfigError {
    #[error("unexpected replication configuration (R={r} W={w} N={n})")]
    QuorumAboveReplication { r: usize, w: usize, n: usize },
    #[error("replication factor and quorums must be positive")]
    Zero,
}

impl QuorumConfig {
    pub fn validate(&self) -> Result<(), QuorumConfigError> {
        if self.replication_factor == 0 || self.read_quorum == 0 || self.write_quorum == 0 {
            return Err(QuorumConfigError::Zero);
        }
        if self.read_quorum > self.replication_factor || self.write_quorum > self.replication_factor
        {
            return Err(QuorumConfigError::QuorumAboveReplication {
                r: self.read_quorum,
                w: self.write_quorum,
                n: self.replication_factor,
            });
        }
        Ok(())
    }
}
