/// Per-request coordination: preference-list fan-out, quorum wait,
/// reconciliation, and read-repair scheduling.
///
/// This is the heart of the node. `Coordinator` owns no long-lived
/// per-request state — every `put`/`get`/`delete` call builds its own
/// fan-out, waits on a bounded channel, and discards everything when it
/// returns, per the process-lifetime rules for coordinator state.
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::clock::VectorClock;
use crate::error::{DynamoError, DynamoResult};
use crate::metrics::{Metrics, OpKind};
use crate::peer::{PeerClient, PeerOutcome};
use crate::repair::RepairQueue;
use crate::ring::Ring;
use crate::storage::Storage;
use crate::types::{Key, NodeId, Payload, Version};

/// The outcome of dispatching one replica operation, fed into the
/// fan-out collector. Carries only what the collector needs to decide
/// quorum — payload data for gets rides along separately via `get_result`.
enum FanoutOutcome {
    Success,
    Failure,
}

/// Shared dependencies every coordinator request needs.
pub struct Coordinator {
    self_id: NodeId,
    ring: Arc<Ring>,
    storage: Arc<Storage>,
    peer_client: Arc<PeerClient>,
    repair_queue: RepairQueue,
    metrics: Arc<Metrics>,
    /// Overall per-request deadline; defaults to 2x the peer deadline.
    request_deadline: Duration,
}

impl Coordinator {
    pub fn new(
        self_id: NodeId,
        ring: Arc<Ring>,
        storage: Arc<Storage>,
        peer_client: Arc<PeerClient>,
        repair_queue: RepairQueue,
        metrics: Arc<Metrics>,
        request_deadline: Duration,
    ) -> Self {
        Self { self_id, ring, storage, peer_client, repair_queue, metrics, request_deadline }
    }

    /// Validate and clamp `n` to the ring's physical node count, then
    /// check `quorum` lies in `[1, n]`. Returns the clamped `n`.
    fn validate_params(&self, n: usize, quorum: usize, ring_size: usize) -> DynamoResult<usize> {
        if ring_size == 0 {
            return Err(DynamoError::BadRequest("ring has no nodes".to_string()));
        }
        let n = n.min(ring_size);
        if n < 1 {
            return Err(DynamoError::BadRequest("N must be at least 1".to_string()));
        }
        if quorum < 1 || quorum > n {
            return Err(DynamoError::BadRequest(format!("quorum must satisfy 1 <= q <= N ({} given, N={})", quorum, n)));
        }
        Ok(n)
    }

    fn distinct_node_count(&self) -> usize {
        // The ring's preference_list already de-duplicates by physical
        // node; probing with a sentinel key at N = usize::MAX length
        // would be wasteful, so callers pass the configured cluster size
        // instead. See `Node::ring_size`.
        self.ring.preference_list("__size_probe__", usize::MAX).len()
    }

    /// Write `value` (or a tombstone, for delete) for `key`.
    pub async fn put(
        &self,
        key: Key,
        value: Option<JsonValue>,
        n: usize,
        w: usize,
        context: Option<VectorClock>,
    ) -> DynamoResult<()> {
        let start = Instant::now();
        let ring_size = self.distinct_node_count();
        let n = self.validate_params(n, w, ring_size)?;

        let preference_list = self.ring.preference_list(&key, n);
        let base = context.unwrap_or_default();
        let clock = base.incremented(&self.self_id);
        let op_kind = if value.is_none() { OpKind::Delete } else { OpKind::Write };
        let payload = match value {
            Some(v) => Payload::Value(v),
            None => Payload::Tombstone,
        };
        let version = Version::new(payload, clock);

        let result = self.fanout_put(&preference_list, &key, version, w).await;

        self.metrics.record_op(op_kind, start.elapsed().as_secs_f64() * 1000.0);
        if result.is_err() {
            self.metrics.record_quorum_failure();
            warn!(%key, w, "put failed to reach write quorum");
        } else {
            debug!(%key, w, "put reached write quorum");
        }
        result
    }

    /// Delete is a put of a tombstone.
    pub async fn delete(&self, key: Key, n: usize, w: usize, context: Option<VectorClock>) -> DynamoResult<()> {
        self.put(key, None, n, w, context).await
    }

    async fn fanout_put(&self, preference_list: &[NodeId], key: &str, version: Version, w: usize) -> DynamoResult<()> {
        let total = preference_list.len();
        if total == 0 {
            return Err(DynamoError::BadRequest("preference list is empty".to_string()));
        }
        let (tx, mut rx) = mpsc::channel::<FanoutOutcome>(total);

        for node in preference_list {
            let tx = tx.clone();
            if *node == self.self_id {
                let storage = self.storage.clone();
                let key = key.to_string();
                let version = version.clone();
                tokio::spawn(async move {
                    storage.local_put(&key, version);
                    let _ = tx.send(FanoutOutcome::Success).await;
                });
            } else {
                let peer_client = self.peer_client.clone();
                let metrics = self.metrics.clone();
                let node = node.clone();
                let key = key.to_string();
                let version = version.clone();
                tokio::spawn(async move {
                    let outcome = peer_client.replica_put(&node, key, version, &metrics).await;
                    let result = if matches!(outcome, PeerOutcome::Ok(())) {
                        FanoutOutcome::Success
                    } else {
                        FanoutOutcome::Failure
                    };
                    let _ = tx.send(result).await;
                });
            }
        }
        drop(tx);

        wait_for_quorum(&mut rx, total, w, self.request_deadline).await
    }

    /// Read `key`, reconcile replica responses, and schedule read repair
    /// for any replica found to be stale.
    pub async fn get(&self, key: Key, n: usize, r: usize) -> DynamoResult<Vec<Version>> {
        let start = Instant::now();
        let ring_size = self.distinct_node_count();
        let n = self.validate_params(n, r, ring_size)?;
        let preference_list = self.ring.preference_list(&key, n);
        if preference_list.is_empty() {
            return Err(DynamoError::BadRequest("preference list is empty".to_string()));
        }

        let responses = match self.fanout_get(&preference_list, &key, r).await {
            Ok(responses) => responses,
            Err(e) => {
                self.metrics.record_quorum_failure();
                warn!(%key, r, "get failed to reach read quorum");
                return Err(e);
            }
        };

        let mut candidates: Vec<Version> = Vec::new();
        for (_, versions) in &responses {
            candidates.extend(versions.iter().cloned());
        }
        let survivors = reconcile(candidates);

        self.schedule_repairs(&key, &responses, &survivors);

        let non_tombstones: Vec<Version> = survivors.iter().filter(|v| !v.payload.is_tombstone()).cloned().collect();
        if non_tombstones.len() >= 2 {
            self.metrics.record_conflict_returned();
        }

        self.metrics.record_op(OpKind::Read, start.elapsed().as_secs_f64() * 1000.0);
        Ok(non_tombstones)
    }

    async fn fanout_get(
        &self,
        preference_list: &[NodeId],
        key: &str,
        r: usize,
    ) -> DynamoResult<Vec<(NodeId, Vec<Version>)>> {
        let total = preference_list.len();
        let (tx, mut rx) = mpsc::channel::<(NodeId, Option<Vec<Version>>)>(total);

        for node in preference_list {
            let tx = tx.clone();
            if *node == self.self_id {
                let storage = self.storage.clone();
                let key = key.to_string();
                let node = node.clone();
                tokio::spawn(async move {
                    let versions = storage.local_get(&key);
                    let _ = tx.send((node, Some(versions))).await;
                });
            } else {
                let peer_client = self.peer_client.clone();
                let metrics = self.metrics.clone();
                let node = node.clone();
                let key = key.to_string();
                tokio::spawn(async move {
                    let outcome = peer_client.replica_get(&node, key, &metrics).await;
                    let result = match outcome {
                        PeerOutcome::Ok(versions) => Some(versions),
                        _ => None,
                    };
                    let _ = tx.send((node, result)).await;
                });
            }
        }
        drop(tx);

        let deadline = Instant::now() + self.request_deadline;
        let mut successes = Vec::with_capacity(total);
        let mut failures = 0usize;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match timeout(remaining, rx.recv()).await {
                Ok(Some((node, Some(versions)))) => {
                    successes.push((node, versions));
                    if successes.len() >= r {
                        break;
                    }
                }
                Ok(Some((_, None))) => {
                    failures += 1;
                    if total - failures < r {
                        break;
                    }
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }

        // Quorum (or early-exit failure) reached, but stragglers may still
        // be in flight. Keep draining up to the overall deadline so a late
        // arrival is incorporated into reconciliation instead of silently
        // dropped — per spec, a replica that never gets its response
        // delivered here would never be checked for staleness either.
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match timeout(remaining, rx.recv()).await {
                Ok(Some((node, Some(versions)))) => successes.push((node, versions)),
                Ok(Some((_, None))) => {}
                Ok(None) => break,
                Err(_) => break,
            }
        }

        if successes.len() < r {
            return Err(DynamoError::QuorumFailed);
        }
        Ok(successes)
    }

    fn schedule_repairs(&self, key: &str, responses: &[(NodeId, Vec<Version>)], survivors: &[Version]) {
        for (node, versions) in responses {
            let stale = is_stale(versions, survivors);
            if stale {
                self.repair_queue.enqueue(node.clone(), key.to_string(), survivors.to_vec());
            }
        }
    }
}

/// Drive the put fan-out collector: succeed once `required` successes
/// arrive, fail early once failures make that impossible, or fail when
/// the overall deadline elapses.
async fn wait_for_quorum(
    rx: &mut mpsc::Receiver<FanoutOutcome>,
    total: usize,
    required: usize,
    overall_deadline: Duration,
) -> DynamoResult<()> {
    let deadline = Instant::now() + overall_deadline;
    let mut successes = 0usize;
    let mut failures = 0usize;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(DynamoError::QuorumFailed);
        }
        match timeout(remaining, rx.recv()).await {
            Ok(Some(FanoutOutcome::Success)) => {
                successes += 1;
                if successes >= required {
                    return Ok(());
                }
            }
            Ok(Some(FanoutOutcome::Failure)) => {
                failures += 1;
                if total - failures < required {
                    return Err(DynamoError::QuorumFailed);
                }
            }
            Ok(None) => return Err(DynamoError::QuorumFailed),
            Err(_) => return Err(DynamoError::QuorumFailed),
        }
    }
}

/// Pure reconciliation: given every candidate version collected from
/// replicas (including duplicates across replicas), return the set of
/// pairwise-concurrent survivors. Depends only on the multiset of
/// inputs, never on arrival order, so callers may flatten responses in
/// any order before calling this.
fn reconcile(candidates: Vec<Version>) -> Vec<Version> {
    let mut deduped: Vec<Version> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if !deduped.iter().any(|d: &Version| d.clock == c.clock && d.payload == c.payload) {
            deduped.push(c);
        }
    }

    deduped
        .iter()
        .filter(|c| !deduped.iter().any(|d| d.clock.dominates(&c.clock) && d.clock != c.clock))
        .cloned()
        .collect()
}

/// A replica is stale if the reconciled set dominates everything it
/// returned, or it returned nothing while reconciliation found something.
fn is_stale(replica_versions: &[Version], survivors: &[Version]) -> bool {
    if replica_versions.is_empty() {
        return !survivors.is_empty();
    }
    survivors.iter().any(|s| replica_versions.iter().all(|rv| s.clock.dominates(&rv.clock) && s.clock != rv.clock))
}
