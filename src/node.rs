/// Node: wires the ring, storage, metrics, repair queue, and peer client
/// together into the dependencies one running replica needs. The HTTP
/// server (`crate::http`) is the only thing that actually talks to the
/// network — replication happens over the internal HTTP API (§6.2), so
/// there is no separate listener here.
use std::sync::Arc;
use std::time::Duration;

use crate::coordinator::Coordinator;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::peer::PeerClient;
use crate::repair::RepairQueue;
use crate::ring::Ring;
use crate::storage::Storage;
use crate::types::NodeId;

/// Cluster-wide defaults and this node's identity, gathered at startup.
pub struct NodeConfig {
    pub self_id: NodeId,
    pub nodes: Vec<NodeId>,
    pub vnodes: usize,
    pub default_n: usize,
    pub default_w: usize,
    pub default_r: usize,
    pub peer_timeout: Duration,
    pub request_timeout: Duration,
    pub repair_workers: usize,
}

/// A single running replica: owns storage, the ring, metrics, and the
/// coordinator that ties them together for one node's lifetime.
pub struct Node {
    config: NodeConfig,
    storage: Arc<Storage>,
    metrics: Arc<Metrics>,
    coordinator: Arc<Coordinator>,
}

impl Node {
    /// Build a node from its configuration.
    pub fn new(config: NodeConfig) -> Self {
        let ring = Arc::new(Ring::new(&config.nodes, config.vnodes));
        let storage = Arc::new(Storage::new());
        let metrics = Arc::new(Metrics::new());
        let peer_client = Arc::new(PeerClient::new(config.peer_timeout));
        let repair_queue = RepairQueue::spawn(config.repair_workers, peer_client.clone(), metrics.clone());

        let coordinator = Arc::new(Coordinator::new(
            config.self_id.clone(),
            ring,
            storage.clone(),
            peer_client,
            repair_queue,
            metrics.clone(),
            config.request_timeout,
        ));

        Self { config, storage, metrics, coordinator }
    }

    /// This node's own address, as it appears in the peer list.
    pub fn self_id(&self) -> &NodeId {
        &self.config.self_id
    }

    /// The coordinator, shared by every HTTP handler.
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Direct storage access, used only by the internal replica
    /// handlers — client-facing requests always go through the
    /// coordinator.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// A point-in-time snapshot of every counter, exposed by `GET
    /// /metrics`.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Cluster-wide `(N, W, R)` defaults, used when a request omits them.
    pub fn defaults(&self) -> (usize, usize, usize) {
        (self.config.default_n, self.config.default_w, self.config.default_r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_for(nodes: Vec<&str>, self_addr: &str) -> NodeConfig {
        NodeConfig {
            self_id: NodeId::new(self_addr),
            nodes: nodes.into_iter().map(NodeId::new).collect(),
            vnodes: 64,
            default_n: 1,
            default_w: 1,
            default_r: 1,
            peer_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_millis(400),
            repair_workers: 1,
        }
    }

    #[tokio::test]
    async fn single_node_put_then_get_round_trips() {
        let node = Node::new(config_for(vec!["127.0.0.1:9"], "127.0.0.1:9"));
        let coordinator = node.coordinator();
        coordinator.put("k".to_string(), Some(json!("v")), 1, 1, None).await.unwrap();
        let got = coordinator.get("k".to_string(), 1, 1).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].payload.as_value().unwrap(), &json!("v"));
    }

    #[tokio::test]
    async fn delete_is_counted_as_a_delete_not_a_write() {
        let node = Node::new(config_for(vec!["127.0.0.1:9"], "127.0.0.1:9"));
        let coordinator = node.coordinator();
        coordinator.put("k".to_string(), Some(json!("v")), 1, 1, None).await.unwrap();
        coordinator.delete("k".to_string(), 1, 1, None).await.unwrap();

        let snap = node.metrics_snapshot();
        assert_eq!(snap.writes, 1);
        assert_eq!(snap.deletes, 1);
    }

    #[test]
    fn defaults_reflect_configuration() {
        let mut cfg = config_for(vec!["127.0.0.1:9"], "127.0.0.1:9");
        cfg.default_n = 3;
        cfg.default_w = 2;
        cfg.default_r = 2;
        let node = Node::new(cfg);
        assert_eq!(node.defaults(), (3, 2, 2));
    }
}
