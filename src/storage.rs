/// Local per-key version-set storage.
///
/// This is a pure local abstraction: it has no knowledge of N/R/W or
/// replication, only the dominance-based merge rule that keeps each key's
/// stored set pairwise-concurrent. Replication is the coordinator's job
/// (see `crate::coordinator`).
///
/// Per-key mutual exclusion is provided by `DashMap`'s internal sharding —
/// each key's entry is independently locked, so writes to different keys
/// never contend and reads see a consistent snapshot of one key's set.
use dashmap::DashMap;

use crate::types::{Key, Version};

/// In-memory mapping from key to its set of pairwise-concurrent versions.
#[derive(Debug, Default)]
pub struct Storage {
    entries: DashMap<Key, Vec<Version>>,
}

impl Storage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Return the current version set for `key` (possibly empty). Never
    /// allocates beyond copying the stored versions.
    pub fn local_get(&self, key: &str) -> Vec<Version> {
        self.entries.get(key).map(|e| e.clone()).unwrap_or_default()
    }

    /// Integrate `incoming` into the stored set for `key`.
    ///
    /// 1. If any existing version dominates `incoming`, it is obsolete —
    ///    no change.
    /// 2. Otherwise, drop every existing version `incoming` dominates.
    /// 3. Collapse any existing version whose clock equals `incoming`'s to
    ///    a single copy (incoming's value wins).
    /// 4. Insert `incoming` if not already present.
    ///
    /// Post-condition: the stored set holds only pairwise-concurrent
    /// versions.
    pub fn local_put(&self, key: &str, incoming: Version) {
        let mut entry = self.entries.entry(key.to_string()).or_default();

        if entry.iter().any(|v| v.clock.dominates(&incoming.clock) && v.clock != incoming.clock) {
            return;
        }

        entry.retain(|v| !incoming.clock.dominates(&v.clock) || v.clock == incoming.clock);

        if let Some(slot) = entry.iter_mut().find(|v| v.clock == incoming.clock) {
            *slot = incoming;
        } else {
            entry.push(incoming);
        }
    }

    /// Equivalent to `local_put` with a tombstone payload — deletion is
    /// just a write that occupies a version slot like any other.
    pub fn local_delete(&self, key: &str, tombstone: Version) {
        self.local_put(key, tombstone);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VectorClock;
    use crate::types::{NodeId, Payload};
    use serde_json::json;

    fn v(value: &str, clock: VectorClock) -> Version {
        Version::new(Payload::Value(json!(value)), clock)
    }

    #[test]
    fn get_on_missing_key_is_empty() {
        let s = Storage::new();
        assert!(s.local_get("missing").is_empty());
    }

    #[test]
    fn first_write_is_stored() {
        let s = Storage::new();
        let n1 = NodeId::new("n1");
        let clock = VectorClock::new().incremented(&n1);
        s.local_put("k", v("a", clock.clone()));
        let got = s.local_get("k");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].clock, clock);
    }

    #[test]
    fn dominating_write_replaces_dominated_version() {
        let s = Storage::new();
        let n1 = NodeId::new("n1");
        let c1 = VectorClock::new().incremented(&n1);
        let c2 = c1.incremented(&n1);
        s.local_put("k", v("a", c1));
        s.local_put("k", v("b", c2.clone()));
        let got = s.local_get("k");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].clock, c2);
        assert_eq!(got[0].payload.as_value().unwrap(), &json!("b"));
    }

    #[test]
    fn obsolete_write_is_dropped() {
        let s = Storage::new();
        let n1 = NodeId::new("n1");
        let c1 = VectorClock::new().incremented(&n1);
        let c2 = c1.incremented(&n1);
        s.local_put("k", v("new", c2.clone()));
        s.local_put("k", v("stale", c1)); // dominated by c2, must be ignored
        let got = s.local_get("k");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].payload.as_value().unwrap(), &json!("new"));
    }

    #[test]
    fn concurrent_writes_are_preserved_as_siblings() {
        let s = Storage::new();
        let n1 = NodeId::new("n1");
        let n2 = NodeId::new("n2");
        let base = VectorClock::new();
        s.local_put("k", v("a", base.incremented(&n1)));
        s.local_put("k", v("b", base.incremented(&n2)));
        let got = s.local_get("k");
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn equal_clock_write_collapses_to_one_and_latest_wins() {
        let s = Storage::new();
        let n1 = NodeId::new("n1");
        let c = VectorClock::new().incremented(&n1);
        s.local_put("k", v("first", c.clone()));
        s.local_put("k", v("second", c.clone()));
        let got = s.local_get("k");
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].payload.as_value().unwrap(), &json!("second"));
    }

    #[test]
    fn repeated_push_of_same_version_is_idempotent() {
        let s = Storage::new();
        let n1 = NodeId::new("n1");
        let c = VectorClock::new().incremented(&n1);
        for _ in 0..5 {
            s.local_put("k", v("same", c.clone()));
        }
        assert_eq!(s.local_get("k").len(), 1);
    }

    #[test]
    fn delete_writes_a_tombstone_version() {
        let s = Storage::new();
        let n1 = NodeId::new("n1");
        let c = VectorClock::new().incremented(&n1);
        s.local_put("k", v("a", c.clone()));
        s.local_delete("k", Version::tombstone(c.incremented(&n1)));
        let got = s.local_get("k");
        assert_eq!(got.len(), 1);
        assert!(got[0].payload.is_tombstone());
    }

    #[test]
    fn stored_set_stays_pairwise_concurrent_under_three_way_conflict() {
        let s = Storage::new();
        let n1 = NodeId::new("n1");
        let n2 = NodeId::new("n2");
        let n3 = NodeId::new("n3");
        let base = VectorClock::new();
        s.local_put("k", v("a", base.incremented(&n1)));
        s.local_put("k", v("b", base.incremented(&n2)));
        s.local_put("k", v("c", base.incremented(&n3)));

        let got = s.local_get("k");
        assert_eq!(got.len(), 3);
        for i in 0..got.len() {
            for j in 0..got.len() {
                if i != j {
                    assert!(got[i].clock.is_concurrent_with(&got[j].clock));
                }
            }
        }
    }
}
