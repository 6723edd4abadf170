/// Startup configuration, parsed from the command line.
use std::time::Duration;

use clap::Parser;

use crate::error::{DynamoError, DynamoResult};
use crate::node::NodeConfig;
use crate::types::NodeId;

/// A replicated key-value node.
#[derive(Debug, Parser)]
#[command(name = "dynamite-node", version, about)]
pub struct Config {
    /// This node's own `host:port`, as it appears in `--peers`.
    #[arg(long)]
    pub self_addr: String,

    /// Comma-separated `host:port` list of every node in the cluster,
    /// including this one. Every node must be given the same list.
    #[arg(long, value_delimiter = ',')]
    pub peers: Vec<String>,

    /// HTTP API port.
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Virtual nodes contributed per physical node to the hash ring.
    #[arg(long, default_value_t = 128)]
    pub vnodes: usize,

    /// Default replication factor when a request omits `N`.
    #[arg(long = "default-n", default_value_t = 3)]
    pub default_n: usize,

    /// Default write quorum when a request omits `W`.
    #[arg(long = "default-w", default_value_t = 2)]
    pub default_w: usize,

    /// Default read quorum when a request omits `R`.
    #[arg(long = "default-r", default_value_t = 2)]
    pub default_r: usize,

    /// Per-peer RPC deadline, in milliseconds.
    #[arg(long = "peer-timeout-ms", default_value_t = 1000)]
    pub peer_timeout_ms: u64,

    /// Overall per-request deadline, in milliseconds. Defaults to 2x the
    /// peer timeout if not given explicitly.
    #[arg(long = "request-timeout-ms")]
    pub request_timeout_ms: Option<u64>,

    /// Number of background read-repair workers.
    #[arg(long = "repair-workers", default_value_t = 4)]
    pub repair_workers: usize,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    /// Validate the peer list and this node's membership in it, then
    /// build the ring/coordinator configuration.
    pub fn into_node_config(self) -> DynamoResult<NodeConfig> {
        if self.peers.is_empty() {
            return Err(DynamoError::BadRequest("--peers must name at least one node".to_string()));
        }
        let nodes: Vec<NodeId> = self.peers.iter().map(|s| NodeId::new(s.trim())).collect();
        let self_id = NodeId::new(self.self_addr.trim());
        if !nodes.contains(&self_id) {
            return Err(DynamoError::BadRequest(format!(
                "--self-addr {} must appear in --peers",
                self_id
            )));
        }

        let peer_timeout = Duration::from_millis(self.peer_timeout_ms);
        let request_timeout =
            self.request_timeout_ms.map(Duration::from_millis).unwrap_or_else(|| peer_timeout * 2);

        if self.default_w < 1 || self.default_w > self.default_n {
            return Err(DynamoError::BadRequest("--default-w must satisfy 1 <= W <= N".to_string()));
        }
        if self.default_r < 1 || self.default_r > self.default_n {
            return Err(DynamoError::BadRequest("--default-r must satisfy 1 <= R <= N".to_string()));
        }

        Ok(NodeConfig {
            self_id,
            nodes,
            vnodes: self.vnodes,
            default_n: self.default_n,
            default_w: self.default_w,
            default_r: self.default_r,
            peer_timeout,
            request_timeout,
            repair_workers: self.repair_workers,
        })
    }

    /// The tracing filter directive implied by `-v` count: 0 => info,
    /// 1 => debug, 2+ => trace.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
