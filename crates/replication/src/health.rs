//! Reachability of peer nodes as seen by this coordinator.

use std::time::{Duration, Instant};

use corelib::NodeId;
use dashmap::DashMap;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

/// Nodes recently observed to be unreachable.
///
/// A failed call marks a node down, a successful one marks it up again.
/// Marks expire after the cooldown so a recovered node gets probed even if
/// nobody reports it back up.
#[derive(Debug)]
pub struct NodeHealth {
    down: DashMap<NodeId, Instant>,
    cooldown: Duration,
}

impl Default for NodeHealth {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl NodeHealth {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            down: DashMap::new(),
            cooldown,
        }
    }

    pub fn mark_down(&self, node: &NodeId) {
        if self.down.insert(node.clone(), Instant::now()).is_none() {
            tracing::warn!(%node, "marking node down");
        }
    }

    pub fn mark_up(&self, node: &NodeId) {
        if self.down.remove(node).is_some() {
            tracing::info!(%node, "node reachable again");
        }
    }

    pub fn is_down(&self, node: &NodeId) -> bool {
        let expired = match self.down.get(node) {
            None => return false,
            Some(since) => since.elapsed() >= self.cooldown,
        };
        if expired {
            self.down.remove(node);
            return false;
        }
        true
    }

    /// Currently-down nodes, expired marks excluded.
    pub fn down_nodes(&self) -> Vec<NodeId> {
        self.down
            .iter()
            .filter(|entry| entry.value().elapsed() < self.cooldown)
            .map(|entry| entry.key().clone())
            .collect()
    }
}
