/// Peer client: bounded-deadline replica RPCs over the internal HTTP API
/// (§6.2), with outcome classification fed straight into
/// `crate::metrics`.
use std::time::Duration;

use reqwest::Client;

use crate::metrics::Metrics;
use crate::types::{Key, NodeId, Version};
use crate::wire::{ReplicaGetResponse, ReplicaPutRequest, ReplicaPutResponse};

/// The outcome of one replica RPC, coarse enough to drive health counters
/// and retry/quorum-impossibility decisions without leaking transport
/// internals to the coordinator.
#[derive(Debug)]
pub enum PeerOutcome<T> {
    /// The peer responded successfully within the deadline.
    Ok(T),
    /// The deadline elapsed before the peer responded.
    Timeout,
    /// The connection could not be established or was lost mid-request.
    Connection(String),
    /// The peer responded with a non-success status or malformed body.
    Remote(String),
}

/// A client for issuing replica RPCs to any peer, under a per-call
/// deadline.
pub struct PeerClient {
    http: Client,
    deadline: Duration,
}

impl PeerClient {
    /// Build a client that bounds every call to `deadline`.
    pub fn new(deadline: Duration) -> Self {
        Self { http: Client::new(), deadline }
    }

    /// Replicate `version` for `key` onto `peer` via `POST
    /// /_replica/put`.
    pub async fn replica_put(&self, peer: &NodeId, key: Key, version: Version, metrics: &Metrics) -> PeerOutcome<()> {
        let url = format!("http://{}/_replica/put", peer.as_str());
        let body = ReplicaPutRequest::new(key, &version);

        let response = self.http.post(&url).timeout(self.deadline).json(&body).send().await;

        match response {
            Err(e) if e.is_timeout() => {
                metrics.record_peer_outcome(peer, true, false);
                PeerOutcome::Timeout
            }
            Err(e) => {
                metrics.record_peer_outcome(peer, false, false);
                PeerOutcome::Connection(e.to_string())
            }
            Ok(resp) if resp.status().is_success() => match resp.json::<ReplicaPutResponse>().await {
                Ok(body) if body.ok => {
                    metrics.record_peer_outcome(peer, false, true);
                    PeerOutcome::Ok(())
                }
                Ok(_) => {
                    metrics.record_peer_outcome(peer, false, false);
                    PeerOutcome::Remote("peer reported failure".to_string())
                }
                Err(e) => {
                    metrics.record_peer_outcome(peer, false, false);
                    PeerOutcome::Remote(format!("malformed response: {}", e))
                }
            },
            Ok(resp) => {
                metrics.record_peer_outcome(peer, false, false);
                PeerOutcome::Remote(format!("peer returned {}", resp.status()))
            }
        }
    }

    /// Fetch the full version set for `key` from `peer` via `GET
    /// /_replica/get`.
    pub async fn replica_get(&self, peer: &NodeId, key: Key, metrics: &Metrics) -> PeerOutcome<Vec<Version>> {
        let url = format!("http://{}/_replica/get", peer.as_str());

        let response = self.http.get(&url).timeout(self.deadline).query(&[("key", key.as_str())]).send().await;

        match response {
            Err(e) if e.is_timeout() => {
                metrics.record_peer_outcome(peer, true, false);
                PeerOutcome::Timeout
            }
            Err(e) => {
                metrics.record_peer_outcome(peer, false, false);
                PeerOutcome::Connection(e.to_string())
            }
            Ok(resp) if resp.status().is_success() => match resp.json::<ReplicaGetResponse>().await {
                Ok(body) => {
                    metrics.record_peer_outcome(peer, false, true);
                    PeerOutcome::Ok(body.versions.into_iter().map(Into::into).collect())
                }
                Err(e) => {
                    metrics.record_peer_outcome(peer, false, false);
                    PeerOutcome::Remote(format!("malformed response: {}", e))
                }
            },
            Ok(resp) => {
                metrics.record_peer_outcome(peer, false, false);
                PeerOutcome::Remote(format!("peer returned {}", resp.status()))
            }
        }
    }
}
