/// Integration tests for the client-facing HTTP API: request validation,
/// context-based causal writes, and the not-found/empty-versions shape.
use dynamite_kv::node::{Node, NodeConfig};
use dynamite_kv::NodeId;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn spawn_single_node() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let config = NodeConfig {
        self_id: NodeId::new(addr.clone()),
        nodes: vec![NodeId::new(addr.clone())],
        vnodes: 32,
        default_n: 1,
        default_w: 1,
        default_r: 1,
        peer_timeout: Duration::from_millis(200),
        request_timeout: Duration::from_millis(400),
        repair_workers: 1,
    };
    let node = Arc::new(Node::new(config));
    let router = dynamite_kv::http::build_router(node);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn get_on_missing_key_returns_empty_versions_not_an_error() {
    let addr = spawn_single_node().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("http://{}/kv/never-written", addr)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["versions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn put_with_w_greater_than_n_is_bad_request() {
    let addr = spawn_single_node().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("http://{}/kv/k", addr))
        .json(&json!({"value": "v", "N": 1, "W": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn put_with_zero_w_is_bad_request() {
    let addr = spawn_single_node().await;
    let client = reqwest::Client::new();

    let resp = client
        .put(format!("http://{}/kv/k", addr))
        .json(&json!({"value": "v", "N": 1, "W": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn get_with_r_greater_than_n_is_bad_request() {
    let addr = spawn_single_node().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("http://{}/kv/k?N=1&R=2", addr)).send().await.unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn request_missing_value_field_is_rejected_by_deserialization() {
    let addr = spawn_single_node().await;
    let client = reqwest::Client::new();

    let resp = client.put(format!("http://{}/kv/k", addr)).json(&json!({"N": 1, "W": 1})).send().await.unwrap();
    // Axum's Json extractor rejects a body missing a required field
    // before the handler ever runs.
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn write_using_prior_read_context_advances_the_same_causal_line() {
    let addr = spawn_single_node().await;
    let client = reqwest::Client::new();

    client.put(format!("http://{}/kv/k", addr)).json(&json!({"value": "v1", "N": 1, "W": 1})).send().await.unwrap();

    let resp = client.get(format!("http://{}/kv/k?N=1&R=1", addr)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    let context = body["versions"][0]["vector_clock"].clone();

    let resp = client
        .put(format!("http://{}/kv/k", addr))
        .json(&json!({"value": "v2", "N": 1, "W": 1, "context": context}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(format!("http://{}/kv/k?N=1&R=1", addr)).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    let versions = body["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 1, "a write carrying the latest context should not fork a sibling");
    assert_eq!(versions[0]["value"], json!("v2"));
}

#[tokio::test]
async fn metrics_snapshot_is_exposed_as_json() {
    let addr = spawn_single_node().await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("http://{}/metrics", addr)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body.get("reads").is_some());
    assert!(body.get("peers").is_some());
}
