/// HTTP API: the client-facing key-value interface (§6.1) and the
/// internal replica protocol (§6.2), served from the same Axum router so
/// every node is reachable at one address for both purposes.
///
/// # API Endpoints
///
/// ## Key-value operations
/// - `GET /kv/:key?R=<int>&N=<int>` — read, returns the reconciled sibling set
/// - `PUT /kv/:key` — write `{"value", "N"?, "W"?, "context"?}`
/// - `DELETE /kv/:key` — tombstone write, same body shape minus `value`
///
/// ## Internal replica API
/// - `POST /_replica/put` — push one version directly into local storage
/// - `GET /_replica/get?key=...` — fetch the full local version set
///
/// ## Observability
/// - `GET /metrics` — a point-in-time snapshot of node counters
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::clock::VectorClock;
use crate::error::DynamoError;
use crate::node::Node;
use crate::types::Version;
use crate::wire::{ReplicaGetResponse, ReplicaPutRequest, ReplicaPutResponse, WireVersion};

/// Build the Axum router for one node.
pub fn build_router(node: Arc<Node>) -> Router {
    Router::new()
        .route("/kv/:key", get(handle_get))
        .route("/kv/:key", put(handle_put))
        .route("/kv/:key", delete(handle_delete))
        .route("/metrics", get(handle_metrics))
        .route("/_replica/put", post(handle_replica_put))
        .route("/_replica/get", get(handle_replica_get))
        .with_state(node)
}

/// Start serving `node`'s HTTP API on `addr` until `shutdown` resolves.
pub async fn serve(
    node: Arc<Node>,
    addr: &str,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> crate::error::DynamoResult<()> {
    let app = build_router(node);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DynamoError::Internal(format!("bind {} failed: {}", addr, e)))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| DynamoError::Internal(format!("server error: {}", e)))
}

// ---- request/response bodies -------------------------------------------

#[derive(Debug, Deserialize)]
struct PutBody {
    value: JsonValue,
    #[serde(rename = "N")]
    n: Option<usize>,
    #[serde(rename = "W")]
    w: Option<usize>,
    context: Option<VectorClock>,
}

#[derive(Debug, Deserialize)]
struct DeleteBody {
    #[serde(rename = "N")]
    n: Option<usize>,
    #[serde(rename = "W")]
    w: Option<usize>,
    context: Option<VectorClock>,
}

#[derive(Debug, Deserialize)]
struct GetQuery {
    #[serde(rename = "R")]
    r: Option<usize>,
    #[serde(rename = "N")]
    n: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
struct QuorumFailureResponse {
    success: bool,
    reason: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct VersionsResponse {
    versions: Vec<ClientVersion>,
}

#[derive(Debug, Serialize)]
struct ClientVersion {
    value: JsonValue,
    vector_clock: VectorClock,
}

// ---- client-facing handlers ---------------------------------------------

async fn handle_put(
    State(node): State<Arc<Node>>,
    axum::extract::Path(key): axum::extract::Path<String>,
    Json(body): Json<PutBody>,
) -> impl axum::response::IntoResponse {
    let (default_n, default_w, _) = node.defaults();
    let n = body.n.unwrap_or(default_n);
    let w = body.w.unwrap_or(default_w);

    match node.coordinator().put(key, Some(body.value), n, w, body.context).await {
        Ok(()) => (StatusCode::OK, Json(SuccessResponse { success: true })).into_response(),
        Err(DynamoError::QuorumFailed) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(QuorumFailureResponse { success: false, reason: "quorum" }))
                .into_response()
        }
        Err(DynamoError::BadRequest(msg)) => (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg })).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })).into_response(),
    }
}

async fn handle_delete(
    State(node): State<Arc<Node>>,
    axum::extract::Path(key): axum::extract::Path<String>,
    Json(body): Json<DeleteBody>,
) -> impl axum::response::IntoResponse {
    let (default_n, default_w, _) = node.defaults();
    let n = body.n.unwrap_or(default_n);
    let w = body.w.unwrap_or(default_w);

    match node.coordinator().delete(key, n, w, body.context).await {
        Ok(()) => (StatusCode::OK, Json(SuccessResponse { success: true })).into_response(),
        Err(DynamoError::QuorumFailed) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(QuorumFailureResponse { success: false, reason: "quorum" }))
                .into_response()
        }
        Err(DynamoError::BadRequest(msg)) => (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg })).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })).into_response(),
    }
}

async fn handle_get(
    State(node): State<Arc<Node>>,
    axum::extract::Path(key): axum::extract::Path<String>,
    Query(query): Query<GetQuery>,
) -> impl axum::response::IntoResponse {
    let (default_n, _, default_r) = node.defaults();
    let n = query.n.unwrap_or(default_n);
    let r = query.r.unwrap_or(default_r);

    match node.coordinator().get(key, n, r).await {
        Ok(versions) => {
            let versions = versions
                .into_iter()
                .map(|v| ClientVersion { value: v.payload.as_value().cloned().unwrap_or(JsonValue::Null), vector_clock: v.clock })
                .collect();
            (StatusCode::OK, Json(VersionsResponse { versions })).into_response()
        }
        Err(DynamoError::QuorumFailed) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorResponse { error: "quorum".to_string() })).into_response()
        }
        Err(DynamoError::BadRequest(msg)) => (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg })).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })).into_response(),
    }
}

async fn handle_metrics(State(node): State<Arc<Node>>) -> impl axum::response::IntoResponse {
    Json(node.metrics_snapshot())
}

// ---- internal replica handlers -------------------------------------------

async fn handle_replica_put(
    State(node): State<Arc<Node>>,
    Json(body): Json<ReplicaPutRequest>,
) -> impl axum::response::IntoResponse {
    let key = body.key.clone();
    let version = body.into_version();
    node.storage().local_put(&key, version);
    (StatusCode::OK, Json(ReplicaPutResponse { ok: true }))
}

#[derive(Debug, Deserialize)]
struct ReplicaGetQuery {
    key: String,
}

async fn handle_replica_get(
    State(node): State<Arc<Node>>,
    Query(query): Query<ReplicaGetQuery>,
) -> impl axum::response::IntoResponse {
    let versions: Vec<Version> = node.storage().local_get(&query.key);
    let versions: Vec<WireVersion> = versions.iter().map(WireVersion::from).collect();
    Json(ReplicaGetResponse { versions })
}
