/// Error types for dynamite-kv.
///
/// Replica-level failures (`PEER_TIMEOUT`/`PEER_ERROR` in spec terms) never
/// take this shape at all: `crate::peer::PeerOutcome` classifies them and
/// the coordinator absorbs them straight into a replica's health counters,
/// so this enum only ever holds errors a client (or an internal invariant
/// check) can actually observe.
use thiserror::Error;

/// The result type used throughout the crate.
pub type DynamoResult<T> = Result<T, DynamoError>;

/// Main error type returned by coordinator and storage operations.
#[derive(Error, Debug)]
pub enum DynamoError {
    /// Invalid N/W/R, missing value, or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Fewer than the required quorum of replicas responded before the
    /// overall deadline.
    #[error("quorum not reached")]
    QuorumFailed,

    /// Serialization error converting to/from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unexpected invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}
