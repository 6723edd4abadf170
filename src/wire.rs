/// Wire-format DTOs for the internal replica API (§6.2): the JSON shape
/// exchanged between nodes over HTTP, independent of the internal
/// `Version`/`Payload` representation used by storage and the
/// coordinator.
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::clock::VectorClock;
use crate::types::{Payload, Version};

/// One version as it travels over the wire: a value (or `null` for a
/// tombstone) tagged with its vector clock and an explicit tombstone
/// flag, since a `null` value is itself a valid client payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireVersion {
    pub value: JsonValue,
    pub vector_clock: VectorClock,
    #[serde(default)]
    pub tombstone: bool,
}

impl From<&Version> for WireVersion {
    fn from(v: &Version) -> Self {
        match &v.payload {
            Payload::Value(value) => WireVersion { value: value.clone(), vector_clock: v.clock.clone(), tombstone: false },
            Payload::Tombstone => WireVersion { value: JsonValue::Null, vector_clock: v.clock.clone(), tombstone: true },
        }
    }
}

impl From<WireVersion> for Version {
    fn from(w: WireVersion) -> Self {
        if w.tombstone {
            Version::tombstone(w.vector_clock)
        } else {
            Version::new(Payload::Value(w.value), w.vector_clock)
        }
    }
}

/// Body of `POST /_replica/put`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicaPutRequest {
    pub key: String,
    pub value: JsonValue,
    pub vector_clock: VectorClock,
    #[serde(default)]
    pub tombstone: bool,
}

impl ReplicaPutRequest {
    pub fn new(key: String, version: &Version) -> Self {
        let wire = WireVersion::from(version);
        Self { key, value: wire.value, vector_clock: wire.vector_clock, tombstone: wire.tombstone }
    }

    pub fn into_version(self) -> Version {
        WireVersion { value: self.value, vector_clock: self.vector_clock, tombstone: self.tombstone }.into()
    }
}

/// Response of `POST /_replica/put`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicaPutResponse {
    pub ok: bool,
}

/// Response of `GET /_replica/get`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplicaGetResponse {
    pub versions: Vec<WireVersion>,
}
