/// Common types shared across the coordinator, storage, ring, and network
/// layers.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::clock::VectorClock;

/// Stable identity of a peer, of the form `host:port`. Identical across
/// every node's configuration — the ring's determinism depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Build a node id from a `host:port` string.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// Borrow the underlying `host:port` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An opaque key, treated as a byte sequence for hashing. Never empty.
pub type Key = String;

/// The payload a client writes, or the internal tombstone marker.
///
/// A tombstone occupies a version slot exactly like a normal value — it
/// participates in vector-clock comparison and replication identically —
/// but is filtered out of client-visible read results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Payload {
    /// A normal client-supplied value.
    Value(JsonValue),
    /// A deletion marker.
    Tombstone,
}

impl Payload {
    /// Whether this payload is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Payload::Tombstone)
    }

    /// The underlying JSON value, or `None` for a tombstone.
    pub fn as_value(&self) -> Option<&JsonValue> {
        match self {
            Payload::Value(v) => Some(v),
            Payload::Tombstone => None,
        }
    }
}

/// A single version: a payload tagged with its causal clock.
///
/// Two versions are siblings when their clocks are concurrent; a
/// `StoredEntry` (see `crate::storage`) holds a set of pairwise-concurrent
/// versions for a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// The stored payload (value or tombstone).
    pub payload: Payload,
    /// The causal clock attached to this write.
    pub clock: VectorClock,
}

impl Version {
    /// Construct a version from a value and clock.
    pub fn new(payload: Payload, clock: VectorClock) -> Self {
        Self { payload, clock }
    }

    /// Construct a tombstone version with the given clock.
    pub fn tombstone(clock: VectorClock) -> Self {
        Self { payload: Payload::Tombstone, clock }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display_roundtrips() {
        let id = NodeId::new("127.0.0.1:5001");
        assert_eq!(format!("{}", id), "127.0.0.1:5001");
        assert_eq!(id.as_str(), "127.0.0.1:5001");
    }

    #[test]
    fn tombstone_has_no_value() {
        let v = Version::tombstone(VectorClock::new());
        assert!(v.payload.is_tombstone());
        assert_eq!(v.payload.as_value(), None);
    }
}
