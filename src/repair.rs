/// Background read-repair queue and worker pool.
///
/// A repair task pushes reconciled versions onto replicas observed to be
/// stale during a read. Repair is best-effort: storage's idempotent merge
/// (`crate::storage::Storage::local_put`) makes repeated or reordered
/// pushes harmless, so the queue can drop under load without a
/// correctness cost — a later read simply rediscovers the staleness.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::metrics::Metrics;
use crate::peer::{PeerClient, PeerOutcome};
use crate::types::{Key, NodeId, Version};

/// Bounded capacity of the repair queue; overflow drops the oldest
/// pending task and increments a counter rather than blocking callers.
const QUEUE_CAPACITY: usize = 1024;

/// One outstanding repair: push `versions` for `key` onto `peer`.
struct RepairTask {
    peer: NodeId,
    key: Key,
    versions: Vec<Version>,
}

/// The shared deque and its wake signal, behind a single handle cloned by
/// both the enqueueing side and every worker.
struct Inner {
    tasks: Mutex<VecDeque<RepairTask>>,
    notify: Notify,
}

/// Handle used by the coordinator to enqueue repair work without
/// blocking on the worker pool.
#[derive(Clone)]
pub struct RepairQueue {
    inner: Arc<Inner>,
    metrics: Arc<Metrics>,
}

impl RepairQueue {
    /// Spawn `workers` background tasks draining a bounded deque, and
    /// return a handle for enqueueing work.
    pub fn spawn(workers: usize, peer_client: Arc<PeerClient>, metrics: Arc<Metrics>) -> Self {
        let inner = Arc::new(Inner { tasks: Mutex::new(VecDeque::with_capacity(QUEUE_CAPACITY)), notify: Notify::new() });

        for _ in 0..workers.max(1) {
            let inner = inner.clone();
            let peer_client = peer_client.clone();
            let metrics = metrics.clone();
            tokio::spawn(async move {
                loop {
                    let task = { inner.tasks.lock().expect("repair queue poisoned").pop_front() };
                    match task {
                        Some(task) => run_task(task, &peer_client, &metrics).await,
                        None => inner.notify.notified().await,
                    }
                }
            });
        }

        Self { inner, metrics }
    }

    /// Enqueue repair of `key` on `peer` with the given reconciled
    /// versions. Never blocks on the worker pool: if the queue is already
    /// at capacity, the oldest pending task is evicted to make room for
    /// this one, and the drop is counted.
    pub fn enqueue(&self, peer: NodeId, key: Key, versions: Vec<Version>) {
        let task = RepairTask { peer, key, versions };
        {
            let mut tasks = self.inner.tasks.lock().expect("repair queue poisoned");
            if tasks.len() >= QUEUE_CAPACITY {
                tasks.pop_front();
                self.metrics.record_dropped_repair();
                debug!("read-repair queue full, dropping oldest task");
            }
            tasks.push_back(task);
        }
        self.inner.notify.notify_one();
    }
}

async fn run_task(task: RepairTask, peer_client: &PeerClient, metrics: &Metrics) {
    for version in task.versions {
        let outcome = peer_client.replica_put(&task.peer, task.key.clone(), version, metrics).await;
        let succeeded = matches!(outcome, PeerOutcome::Ok(()));
        metrics.record_repair_outcome(succeeded);
        if !succeeded {
            warn!(peer = %task.peer, key = %task.key, "read repair push failed");
        }
    }
}
