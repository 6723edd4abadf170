//! # dynamite-kv
//!
//! A leaderless, replicated key-value store in the Dynamo lineage.
//! Keys are distributed across a fixed set of peer nodes via consistent
//! hashing with virtual nodes, replicated to `N` nodes, with tunable
//! per-request read (`R`) and write (`W`) quorums. Values carry vector
//! clocks so concurrent updates are preserved as sibling versions rather
//! than silently overwritten, and a read-repair mechanism opportunistically
//! converges replicas whose versions are dominated by a newer one.
//!
//! ## Layout
//!
//! - [`clock`] — vector clocks and the dominance/concurrency relation
//! - [`types`] — shared value types (`NodeId`, `Key`, `Payload`, `Version`)
//! - [`ring`] — consistent hash ring with virtual nodes
//! - [`storage`] — local per-key version-set storage
//! - [`peer`] — bounded-deadline replica RPC client
//! - [`wire`] — JSON wire DTOs for the internal replica API
//! - [`coordinator`] — per-request fan-out, quorum wait, reconciliation
//! - [`repair`] — background read-repair queue and workers
//! - [`metrics`] — counters, latency reservoirs, per-peer health
//! - [`node`] — wires the above into one running replica
//! - [`http`] — the client-facing and internal HTTP APIs
//! - [`config`] — command-line configuration
//! - [`error`] — the node-wide error taxonomy

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod metrics;
pub mod node;
pub mod peer;
pub mod repair;
pub mod ring;
pub mod storage;
pub mod types;
pub mod wire;

pub use clock::VectorClock;
pub use coordinator::Coordinator;
pub use error::{DynamoError, DynamoResult};
pub use node::{Node, NodeConfig};
pub use types::{Key, NodeId, Payload, Version};
