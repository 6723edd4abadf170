/// Per-node counters, latency reservoirs, and per-peer health tracking.
///
/// Counters and per-peer health use plain atomics; the latency reservoirs
/// use a short-held mutex, per the locking guidance for histogram data.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use serde::Serialize;

use crate::types::NodeId;

const RESERVOIR_CAPACITY: usize = 512;

/// A fixed-size reservoir of recent latency samples (milliseconds), used
/// to derive min/max/mean/p95 without unbounded memory growth.
#[derive(Debug, Default)]
struct Reservoir {
    samples: Vec<f64>,
    next: usize,
}

impl Reservoir {
    fn record(&mut self, sample_ms: f64) {
        if self.samples.len() < RESERVOIR_CAPACITY {
            self.samples.push(sample_ms);
        } else {
            self.samples[self.next] = sample_ms;
            self.next = (self.next + 1) % RESERVOIR_CAPACITY;
        }
    }

    fn snapshot(&self) -> LatencySnapshot {
        if self.samples.is_empty() {
            return LatencySnapshot::default();
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let min = sorted[0];
        let max = sorted[sorted.len() - 1];
        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
        let p95_idx = ((sorted.len() as f64) * 0.95).ceil() as usize;
        let p95 = sorted[p95_idx.saturating_sub(1).min(sorted.len() - 1)];
        LatencySnapshot { min, max, mean, p95 }
    }
}

/// Latency statistics for one operation type.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySnapshot {
    /// Minimum observed latency, in milliseconds.
    pub min: f64,
    /// Maximum observed latency, in milliseconds.
    pub max: f64,
    /// Mean observed latency, in milliseconds.
    pub mean: f64,
    /// 95th percentile latency, in milliseconds.
    pub p95: f64,
}

/// The kind of operation a latency sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// A get request.
    Read,
    /// A put request.
    Write,
    /// A delete request.
    Delete,
}

/// Health counters for one peer.
#[derive(Debug, Default)]
struct PeerHealth {
    total_requests: AtomicU64,
    successes: AtomicU64,
    timeouts: AtomicU64,
}

/// A read-only snapshot of one peer's health.
#[derive(Debug, Clone, Serialize)]
pub struct PeerHealthSnapshot {
    /// Total replica calls attempted against this peer.
    pub total_requests: u64,
    /// Calls that completed successfully.
    pub successes: u64,
    /// Calls that exceeded the per-peer deadline.
    pub timeouts: u64,
    /// `successes / total_requests`, 0.0 if no requests yet.
    pub success_rate: f64,
    /// `timeouts / total_requests`, 0.0 if no requests yet.
    pub timeout_rate: f64,
}

/// All counters and health state for one node.
#[derive(Debug, Default)]
pub struct Metrics {
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    read_repairs: AtomicU64,
    read_repair_failures: AtomicU64,
    dropped_repairs: AtomicU64,
    conflicts_returned: AtomicU64,
    quorum_failures: AtomicU64,

    read_latency: Mutex<Reservoir>,
    write_latency: Mutex<Reservoir>,
    delete_latency: Mutex<Reservoir>,

    peers: DashMap<NodeId, PeerHealth>,
}

impl Metrics {
    /// Create a fresh, zeroed metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed operation, bumping its counter and latency
    /// reservoir.
    pub fn record_op(&self, kind: OpKind, latency_ms: f64) {
        let (counter, reservoir) = match kind {
            OpKind::Read => (&self.reads, &self.read_latency),
            OpKind::Write => (&self.writes, &self.write_latency),
            OpKind::Delete => (&self.deletes, &self.delete_latency),
        };
        counter.fetch_add(1, Ordering::Relaxed);
        reservoir.lock().expect("latency reservoir poisoned").record(latency_ms);
    }

    /// Increment the quorum-failure counter.
    pub fn record_quorum_failure(&self) {
        self.quorum_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment `conflicts_returned` — called once per read whose
    /// reconciled set has two or more non-tombstone siblings.
    pub fn record_conflict_returned(&self) {
        self.conflicts_returned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one read-repair push.
    pub fn record_repair_outcome(&self, succeeded: bool) {
        if succeeded {
            self.read_repairs.fetch_add(1, Ordering::Relaxed);
        } else {
            self.read_repair_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Increment the dropped-repair counter (queue overflow).
    pub fn record_dropped_repair(&self) {
        self.dropped_repairs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one peer RPC.
    pub fn record_peer_outcome(&self, peer: &NodeId, timed_out: bool, succeeded: bool) {
        let health = self.peers.entry(peer.clone()).or_default();
        health.total_requests.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            health.successes.fetch_add(1, Ordering::Relaxed);
        }
        if timed_out {
            health.timeouts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A read-only snapshot of every counter and per-peer health record.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let peers = self
            .peers
            .iter()
            .map(|entry| {
                let h = entry.value();
                let total = h.total_requests.load(Ordering::Relaxed);
                let successes = h.successes.load(Ordering::Relaxed);
                let timeouts = h.timeouts.load(Ordering::Relaxed);
                let (success_rate, timeout_rate) = if total == 0 {
                    (0.0, 0.0)
                } else {
                    (successes as f64 / total as f64, timeouts as f64 / total as f64)
                };
                (
                    entry.key().to_string(),
                    PeerHealthSnapshot { total_requests: total, successes, timeouts, success_rate, timeout_rate },
                )
            })
            .collect();

        MetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            read_repairs: self.read_repairs.load(Ordering::Relaxed),
            read_repair_failures: self.read_repair_failures.load(Ordering::Relaxed),
            dropped_repairs: self.dropped_repairs.load(Ordering::Relaxed),
            conflicts_returned: self.conflicts_returned.load(Ordering::Relaxed),
            quorum_failures: self.quorum_failures.load(Ordering::Relaxed),
            read_latency: self.read_latency.lock().expect("poisoned").snapshot(),
            write_latency: self.write_latency.lock().expect("poisoned").snapshot(),
            delete_latency: self.delete_latency.lock().expect("poisoned").snapshot(),
            peers,
        }
    }
}

/// A point-in-time, serializable view of all node metrics. Returned by
/// `GET /metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total read requests handled.
    pub reads: u64,
    /// Total write requests handled.
    pub writes: u64,
    /// Total delete requests handled.
    pub deletes: u64,
    /// Successful read-repair pushes.
    pub read_repairs: u64,
    /// Failed read-repair pushes.
    pub read_repair_failures: u64,
    /// Repair tasks dropped due to queue overflow.
    pub dropped_repairs: u64,
    /// Reads whose reconciled result had 2+ non-tombstone siblings.
    pub conflicts_returned: u64,
    /// Requests that failed to reach quorum.
    pub quorum_failures: u64,
    /// Read latency distribution.
    pub read_latency: LatencySnapshot,
    /// Write latency distribution.
    pub write_latency: LatencySnapshot,
    /// Delete latency distribution.
    pub delete_latency: LatencySnapshot,
    /// Per-peer health, keyed by the peer's `NodeId` string.
    pub peers: std::collections::HashMap<String, PeerHealthSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_metrics_are_zeroed() {
        let m = Metrics::new();
        let snap = m.snapshot();
        assert_eq!(snap.reads, 0);
        assert_eq!(snap.quorum_failures, 0);
        assert!(snap.peers.is_empty());
    }

    #[test]
    fn record_op_increments_counter_and_latency() {
        let m = Metrics::new();
        m.record_op(OpKind::Write, 5.0);
        m.record_op(OpKind::Write, 15.0);
        let snap = m.snapshot();
        assert_eq!(snap.writes, 2);
        assert_eq!(snap.write_latency.min, 5.0);
        assert_eq!(snap.write_latency.max, 15.0);
    }

    #[test]
    fn peer_health_rates_are_derived_correctly() {
        let m = Metrics::new();
        let n1 = NodeId::new("n1");
        m.record_peer_outcome(&n1, false, true);
        m.record_peer_outcome(&n1, false, true);
        m.record_peer_outcome(&n1, true, false);
        let snap = m.snapshot();
        let health = &snap.peers["n1"];
        assert_eq!(health.total_requests, 3);
        assert_eq!(health.successes, 2);
        assert_eq!(health.timeouts, 1);
        assert!((health.success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn conflicts_returned_increments_once_per_call() {
        let m = Metrics::new();
        m.record_conflict_returned();
        m.record_conflict_returned();
        assert_eq!(m.snapshot().conflicts_returned, 2);
    }
}
