/// Entry point: parse configuration, build a node, and serve its HTTP API
/// until interrupted.
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dynamite_kv::config::Config;
use dynamite_kv::node::Node;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let port = config.port;
    let node_config = match config.into_node_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid startup configuration");
            return ExitCode::FAILURE;
        }
    };

    let self_id = node_config.self_id.clone();
    let node = Arc::new(Node::new(node_config));
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!(%self_id, %addr, "starting dynamite-node");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };

    match dynamite_kv::http::serve(node, &addr, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server exited with error");
            ExitCode::FAILURE
        }
    }
}
