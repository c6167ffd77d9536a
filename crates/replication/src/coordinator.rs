//! Request coordinator: turns a client GET/PUT/DELETE into a quorum of
//! replica operations.
//!
//! # Write path
//!
//! 1. Resolve the key's [`ReplicaPlacement`] (fails with
//!    [`CoordinatorError::RingUnavailable`] on an empty ring)
//! 2. Stamp the record: merge the client context with every version this
//!    node holds for the key and bump this node's counter. On a replica the
//!    local write happens in the same step, under the store's key lock. A
//!    node outside the preference list remembers the last version it issued
//!    per key, so its counter never repeats
//! 3. Fan out to the other nominal replicas at once; replicas known to be
//!    down are swapped for the next healthy fallback, which stores a hint
//! 4. Every failed call is replaced by the next fallback while any remain
//! 5. Return once W replicas acknowledged, or fail with
//!    [`CoordinatorError::InsufficientReplicas`]. Writes that landed are
//!    never rolled back.
//!
//! # Read path
//!
//! R = 1 with the local node among the replicas is served locally.
//! Otherwise R replicas are queried, failures are replaced by the next
//! candidate, the responses are reconciled and concurrent versions are
//! surfaced as siblings. Winning versions are pushed in the background to
//! the replicas that answered without them.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use corelib::{HashRing, Node, NodeId, VersionVector};
use dashmap::DashMap;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use storage::{HintStore, PutOutcome, ReplicaStore, StorageError, VersionedRecord};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::consistency::{ConsistencyLevel, QuorumConfig};
use crate::error::{CoordinatorError, ReplicaError, Result};
use crate::health::NodeHealth;
use crate::peer::{PeerClient, ReplicaWrite};
use crate::placement::ReplicaPlacement;
use crate::reconcile::{is_stale, merged_version, reconcile};

/// Per-request overrides of the configured quorum and deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    pub consistency: Option<ConsistencyLevel>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn with_consistency(consistency: ConsistencyLevel) -> Self {
        Self {
            consistency: Some(consistency),
            timeout: None,
        }
    }
}

/// Outcome of a coordinated read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    pub key: String,
    /// Live winning versions. More than one means concurrent writes the
    /// client has to resolve.
    pub siblings: Vec<VersionedRecord>,
    /// Merge of every winning version, tombstones included. Echoing it on
    /// the next write supersedes all siblings.
    pub context: VersionVector,
    pub found: bool,
}

impl ReadResult {
    fn from_winners(key: &str, winners: Vec<VersionedRecord>) -> Self {
        let context = merged_version(&winners);
        let siblings: Vec<VersionedRecord> =
            winners.into_iter().filter(|record| !record.tombstone).collect();
        Self {
            key: key.to_string(),
            found: !siblings.is_empty(),
            siblings,
            context,
        }
    }

    /// The value, when exactly one version survived.
    pub fn value(&self) -> Option<&[u8]> {
        match self.siblings.as_slice() {
            [only] => Some(&only.value),
            _ => None,
        }
    }

    pub fn has_siblings(&self) -> bool {
        self.siblings.len() > 1
    }

    pub fn versions(&self) -> Vec<VersionVector> {
        self.siblings.iter().map(|r| r.version.clone()).collect()
    }
}

/// Where a write goes, and for whom.
#[derive(Debug, Clone)]
struct Target {
    node: NodeId,
    hint_for: Option<NodeId>,
}

/// Everything a spawned replica call needs, cheap to clone into a task.
struct Replicas<S, C> {
    local: NodeId,
    ring: Arc<HashRing>,
    store: Arc<S>,
    peers: Arc<C>,
    hints: Arc<HintStore>,
    peer_timeout: Duration,
}

impl<S, C> Clone for Replicas<S, C> {
    fn clone(&self) -> Self {
        Self {
            local: self.local.clone(),
            ring: Arc::clone(&self.ring),
            store: Arc::clone(&self.store),
            peers: Arc::clone(&self.peers),
            hints: Arc::clone(&self.hints),
            peer_timeout: self.peer_timeout,
        }
    }
}

impl<S: ReplicaStore, C: PeerClient> Replicas<S, C> {
    fn resolve(&self, node: &NodeId) -> std::result::Result<Node, ReplicaError> {
        self.ring
            .node_address(node)
            .map(|address| Node::new(node.clone(), address))
            .ok_or_else(|| ReplicaError::UnknownNode(node.clone()))
    }

    fn apply_local(
        &self,
        key: &str,
        write: ReplicaWrite,
    ) -> std::result::Result<PutOutcome, StorageError> {
        if let Some(owner) = write.hint_for {
            tracing::debug!(key, %owner, "holding hint");
            metrics::counter!("kv_hints_received_total").increment(1);
            self.hints.record(owner, key, write.record.clone());
        }
        self.store.put_versioned(key, write.record)
    }

    async fn write(
        &self,
        node: &NodeId,
        key: &str,
        write: &ReplicaWrite,
    ) -> std::result::Result<(), ReplicaError> {
        if *node == self.local {
            self.apply_local(key, write.clone())?;
            return Ok(());
        }
        let target = self.resolve(node)?;
        tokio::time::timeout(
            self.peer_timeout,
            self.peers.put_replica(&target, key, write),
        )
        .await
        .map_err(|_| ReplicaError::Timeout(self.peer_timeout))?
    }

    async fn read(
        &self,
        node: &NodeId,
        key: &str,
    ) -> std::result::Result<Vec<VersionedRecord>, ReplicaError> {
        if *node == self.local {
            return Ok(self.store.get_versioned(key));
        }
        let target = self.resolve(node)?;
        tokio::time::timeout(self.peer_timeout, self.peers.get_replica(&target, key))
            .await
            .map_err(|_| ReplicaError::Timeout(self.peer_timeout))?
    }
}

type WriteHandle = JoinHandle<(Target, std::result::Result<(), ReplicaError>)>;
type ReadHandle = JoinHandle<(NodeId, std::result::Result<Vec<VersionedRecord>, ReplicaError>)>;

/// Quorum coordinator for one node.
///
/// Generic over the store and the peer transport so tests can run whole
/// clusters in-process.
pub struct Coordinator<S, C> {
    replicas: Replicas<S, C>,
    health: Arc<NodeHealth>,
    config: QuorumConfig,
    /// Last version issued for keys this node coordinates without holding.
    issued: DashMap<String, VersionVector>,
}

impl<S, C> std::fmt::Debug for Coordinator<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("local", &self.replicas.local)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: ReplicaStore, C: PeerClient> Coordinator<S, C> {
    pub fn new(
        local: NodeId,
        ring: Arc<HashRing>,
        store: Arc<S>,
        peers: Arc<C>,
        config: QuorumConfig,
    ) -> Self {
        Self {
            replicas: Replicas {
                local,
                ring,
                store,
                peers,
                hints: Arc::new(HintStore::new()),
                peer_timeout: config.peer_timeout,
            },
            health: Arc::new(NodeHealth::default()),
            config,
            issued: DashMap::new(),
        }
    }

    /// Share a hint store with the rest of the process.
    pub fn with_hints(mut self, hints: Arc<HintStore>) -> Self {
        self.replicas.hints = hints;
        self
    }

    pub fn with_health(mut self, health: Arc<NodeHealth>) -> Self {
        self.health = health;
        self
    }

    pub fn local_id(&self) -> &NodeId {
        &self.replicas.local
    }

    pub fn ring(&self) -> &Arc<HashRing> {
        &self.replicas.ring
    }

    pub fn store(&self) -> &Arc<S> {
        &self.replicas.store
    }

    pub fn hints(&self) -> &Arc<HintStore> {
        &self.replicas.hints
    }

    pub fn health(&self) -> &Arc<NodeHealth> {
        &self.health
    }

    pub fn config(&self) -> &QuorumConfig {
        &self.config
    }

    /// Apply a write shipped by another coordinator to the local store.
    pub fn accept_replica(
        &self,
        key: &str,
        write: ReplicaWrite,
    ) -> std::result::Result<PutOutcome, StorageError> {
        self.replicas.apply_local(key, write)
    }

    /// Write `value` under `key`, returning the version it was stored with.
    ///
    /// `context` is the version the client last read; without one the
    /// write still descends from whatever this node holds locally.
    pub async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        context: Option<VersionVector>,
        options: RequestOptions,
    ) -> Result<VersionVector> {
        validate_key(key)?;
        let placement = self.placement(key)?;
        let record = self.stamp(key, context, &placement, |version| {
            VersionedRecord::new(value, version)
        })?;
        let version = record.version.clone();
        self.replicate(key, record, &placement, options).await?;
        Ok(version)
    }

    /// Write a tombstone for `key` through the regular write path.
    pub async fn delete(
        &self,
        key: &str,
        context: Option<VersionVector>,
        options: RequestOptions,
    ) -> Result<VersionVector> {
        validate_key(key)?;
        let placement = self.placement(key)?;
        let record = self.stamp(key, context, &placement, VersionedRecord::tombstone)?;
        let version = record.version.clone();
        self.replicate(key, record, &placement, options).await?;
        Ok(version)
    }

    /// Read `key` from R replicas and reconcile what they hold.
    pub async fn get(&self, key: &str, options: RequestOptions) -> Result<ReadResult> {
        validate_key(key)?;
        let placement = self.placement(key)?;
        let required = self.required(options.consistency, self.config.read_quorum, placement.n());

        if required == 1 && placement.is_replica(&self.replicas.local) {
            let local = self.replicas.store.get_versioned(key);
            return Ok(ReadResult::from_winners(key, reconcile(local)));
        }

        // Healthy replicas first, suspected ones after, then the fallbacks.
        let (healthy, suspect): (Vec<NodeId>, Vec<NodeId>) = placement
            .nominal
            .iter()
            .cloned()
            .partition(|node| !self.health.is_down(node));
        let mut candidates: VecDeque<NodeId> = healthy.into_iter().chain(suspect).collect();
        if self.config.sloppy_quorum {
            candidates.extend(placement.fallbacks.iter().cloned());
        }

        let deadline = self.deadline(options);
        let mut futs = FuturesUnordered::new();
        for _ in 0..required {
            match candidates.pop_front() {
                Some(node) => futs.push(self.spawn_read(node, key)),
                None => break,
            }
        }

        let mut responses: Vec<(NodeId, Vec<VersionedRecord>)> = Vec::with_capacity(required);
        while responses.len() < required {
            let joined = match tokio::time::timeout_at(deadline, futs.next()).await {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(key, "read deadline reached");
                    break;
                }
            };
            match joined {
                Ok((node, Ok(held))) => {
                    self.health.mark_up(&node);
                    responses.push((node, held));
                }
                Ok((node, Err(err))) => {
                    tracing::warn!(key, %node, error = %err, "replica read failed");
                    self.note_failure(&node, &err);
                    if let Some(next) = candidates.pop_front() {
                        if !placement.is_replica(&next) {
                            metrics::counter!("kv_sloppy_extensions_total").increment(1);
                        }
                        futs.push(self.spawn_read(next, key));
                    }
                }
                Err(err) => tracing::error!(key, error = %err, "replica read task failed"),
            }
        }

        if responses.len() < required {
            metrics::counter!("kv_read_quorum_failures_total").increment(1);
            return Err(CoordinatorError::InsufficientReplicas {
                needed: required,
                got: responses.len(),
            });
        }

        let winners = reconcile(
            responses
                .iter()
                .flat_map(|(_, held)| held.iter().cloned()),
        );
        if self.config.read_repair && !winners.is_empty() {
            self.spawn_read_repair(key, &winners, &responses, &placement);
        }
        Ok(ReadResult::from_winners(key, winners))
    }

    /// Ship `record` to the nominal replicas. A local copy, when this node
    /// is one of them, was already written by [`stamp`](Self::stamp).
    async fn replicate(
        &self,
        key: &str,
        record: VersionedRecord,
        placement: &ReplicaPlacement,
        options: RequestOptions,
    ) -> Result<()> {
        let required = self.required(options.consistency, self.config.write_quorum, placement.n());
        let deadline = self.deadline(options);

        let mut fallbacks: VecDeque<NodeId> = if self.config.sloppy_quorum {
            placement.fallbacks.iter().cloned().collect()
        } else {
            VecDeque::new()
        };

        let local = &self.replicas.local;
        let mut acks = usize::from(placement.is_replica(local));
        let mut futs = FuturesUnordered::new();
        for owner in placement.nominal.iter().filter(|owner| *owner != local) {
            let mut target = Target {
                node: owner.clone(),
                hint_for: None,
            };
            if self.health.is_down(owner) {
                if let Some(substitute) = self.next_fallback(&mut fallbacks) {
                    tracing::debug!(key, %owner, %substitute, "replica down, writing hint");
                    metrics::counter!("kv_sloppy_extensions_total").increment(1);
                    target = Target {
                        node: substitute,
                        hint_for: Some(owner.clone()),
                    };
                }
            }
            futs.push(self.spawn_write(target, key, &record));
        }

        while acks < required {
            let joined = match tokio::time::timeout_at(deadline, futs.next()).await {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(key, acks, required, "write deadline reached");
                    break;
                }
            };
            match joined {
                Ok((target, Ok(()))) => {
                    self.health.mark_up(&target.node);
                    acks += 1;
                }
                Ok((target, Err(err))) => {
                    tracing::warn!(key, node = %target.node, error = %err, "replica write failed");
                    self.note_failure(&target.node, &err);
                    if let Some(substitute) = self.next_fallback(&mut fallbacks) {
                        metrics::counter!("kv_sloppy_extensions_total").increment(1);
                        let owner = target.hint_for.unwrap_or(target.node);
                        let next = Target {
                            node: substitute,
                            hint_for: Some(owner),
                        };
                        futs.push(self.spawn_write(next, key, &record));
                    }
                }
                Err(err) => tracing::error!(key, error = %err, "replica write task failed"),
            }
        }

        if acks < required {
            metrics::counter!("kv_write_quorum_failures_total").increment(1);
            return Err(CoordinatorError::InsufficientReplicas {
                needed: required,
                got: acks,
            });
        }
        Ok(())
    }

    fn placement(&self, key: &str) -> Result<ReplicaPlacement> {
        ReplicaPlacement::for_key(&self.replicas.ring, key, self.config.replication_factor)
            .map_err(|_| CoordinatorError::RingUnavailable)
    }

    fn required(&self, level: Option<ConsistencyLevel>, default: usize, n: usize) -> usize {
        match level {
            Some(level) => level.required(n),
            None => default.clamp(1, n.max(1)),
        }
    }

    fn deadline(&self, options: RequestOptions) -> Instant {
        Instant::now() + options.timeout.unwrap_or(self.config.request_timeout)
    }

    /// Build the record of a new write from `context` and every version
    /// this node knows for `key`, with this node's counter bumped.
    ///
    /// On a replica the record is also written locally, under the same key
    /// lock that guards the version derivation, so concurrent writes through
    /// this node never share a version.
    fn stamp<F>(
        &self,
        key: &str,
        context: Option<VersionVector>,
        placement: &ReplicaPlacement,
        build: F,
    ) -> Result<VersionedRecord>
    where
        F: FnOnce(VersionVector) -> VersionedRecord,
    {
        let local = &self.replicas.local;
        let mut version = context.unwrap_or_default();

        if placement.is_replica(local) {
            let record = self.replicas.store.update(key, |held| {
                version.merge_from(&merged_version(held));
                version.increment(local);
                build(version)
            })?;
            return Ok(record);
        }

        // Hinted copies may still sit in the local store.
        version.merge_from(&merged_version(&self.replicas.store.get_versioned(key)));
        let mut issued = self.issued.entry(key.to_string()).or_default();
        version.merge_from(&issued);
        version.increment(local);
        *issued = version.clone();
        drop(issued);
        Ok(build(version))
    }

    /// Next fallback not currently marked down.
    fn next_fallback(&self, fallbacks: &mut VecDeque<NodeId>) -> Option<NodeId> {
        while let Some(node) = fallbacks.pop_front() {
            if node == self.replicas.local || !self.health.is_down(&node) {
                return Some(node);
            }
        }
        None
    }

    /// Suspect `node` only when it could not be reached; a node that
    /// answered with an error is still up.
    fn note_failure(&self, node: &NodeId, err: &ReplicaError) {
        if *node != self.replicas.local && err.is_unreachable() {
            self.health.mark_down(node);
        }
    }

    fn spawn_write(&self, target: Target, key: &str, record: &VersionedRecord) -> WriteHandle {
        let replicas = self.replicas.clone();
        let key = key.to_string();
        let write = ReplicaWrite {
            record: record.clone(),
            hint_for: target.hint_for.clone(),
        };
        tokio::spawn(async move {
            let result = replicas.write(&target.node, &key, &write).await;
            (target, result)
        })
    }

    fn spawn_read(&self, node: NodeId, key: &str) -> ReadHandle {
        let replicas = self.replicas.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            let result = replicas.read(&node, &key).await;
            (node, result)
        })
    }

    /// Push every winning version to the nominal replicas that answered
    /// without it. Fire and forget.
    fn spawn_read_repair(
        &self,
        key: &str,
        winners: &[VersionedRecord],
        responses: &[(NodeId, Vec<VersionedRecord>)],
        placement: &ReplicaPlacement,
    ) {
        let repairs: Vec<(NodeId, Vec<VersionedRecord>)> = responses
            .iter()
            .filter(|(node, _)| placement.is_replica(node))
            .map(|(node, held)| {
                let missing = winners
                    .iter()
                    .filter(|winner| is_stale(held, winner))
                    .cloned()
                    .collect::<Vec<_>>();
                (node.clone(), missing)
            })
            .filter(|(_, missing)| !missing.is_empty())
            .collect();
        if repairs.is_empty() {
            return;
        }

        metrics::counter!("kv_read_repairs_total").increment(repairs.len() as u64);
        let replicas = self.replicas.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            for (node, missing) in repairs {
                for record in missing {
                    let write = ReplicaWrite {
                        record,
                        hint_for: None,
                    };
                    match replicas.write(&node, &key, &write).await {
                        Ok(()) => tracing::debug!(key = %key, %node, "read repair applied"),
                        Err(err) => {
                            tracing::debug!(key = %key, %node, error = %err, "read repair failed")
                        }
                    }
                }
            }
        });
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CoordinatorError::InvalidArgument("key cannot be empty".into()));
    }
    Ok(())
}
