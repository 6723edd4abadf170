/// Vector clocks for causal ordering.
///
/// A vector clock tracks the happens-before relationship between writes
/// across the replica set. Each coordinating node maintains a monotonic
/// counter in the clock; a missing entry means 0. Comparison is pointwise
/// over the union of keys present in either clock.
use std::collections::HashMap;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Result of comparing two vector clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// The clocks are identical.
    Equal,
    /// The left clock causally dominates the right.
    Dominates,
    /// The right clock causally dominates the left.
    Dominated,
    /// Neither dominates; the clocks are concurrent (siblings).
    Concurrent,
}

/// A vector clock: NodeId -> logical counter.
///
/// `transparent` so the clock serializes directly as `{"host:port": n,
/// ...}` on the wire (§6.1/§6.2), with no enclosing `counters` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock {
    counters: HashMap<NodeId, u64>,
}

impl VectorClock {
    /// An empty clock (all counters implicitly 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh clock with a single node at counter 1. Used when a write
    /// arrives with no client-supplied context.
    pub fn rooted_at(node: &NodeId) -> Self {
        let mut counters = HashMap::new();
        counters.insert(node.clone(), 1);
        Self { counters }
    }

    /// Return a new clock with `node`'s counter incremented by one, all
    /// other counters preserved.
    pub fn incremented(&self, node: &NodeId) -> Self {
        let mut counters = self.counters.clone();
        *counters.entry(node.clone()).or_insert(0) += 1;
        Self { counters }
    }

    /// Counter for a given node (0 if absent).
    pub fn counter(&self, node: &NodeId) -> u64 {
        self.counters.get(node).copied().unwrap_or(0)
    }

    /// Whether every counter is zero (equivalent to the empty clock).
    pub fn is_zero(&self) -> bool {
        self.counters.values().all(|&c| c == 0)
    }

    /// Pointwise comparison over the union of both clocks' keys.
    pub fn compare(&self, other: &Self) -> Comparison {
        let keys: HashSet<&NodeId> = self.counters.keys().chain(other.counters.keys()).collect();

        let mut less = false;
        let mut greater = false;
        for node in keys {
            let a = self.counter(node);
            let b = other.counter(node);
            match a.cmp(&b) {
                std::cmp::Ordering::Less => less = true,
                std::cmp::Ordering::Greater => greater = true,
                std::cmp::Ordering::Equal => {}
            }
        }

        match (less, greater) {
            (false, false) => Comparison::Equal,
            (false, true) => Comparison::Dominates,
            (true, false) => Comparison::Dominated,
            (true, true) => Comparison::Concurrent,
        }
    }

    /// True if `self` dominates `other`, or they are equal.
    pub fn dominates(&self, other: &Self) -> bool {
        matches!(self.compare(other), Comparison::Dominates | Comparison::Equal)
    }

    /// True if `self` is strictly dominated by `other`.
    pub fn is_dominated_by(&self, other: &Self) -> bool {
        matches!(self.compare(other), Comparison::Dominated)
    }

    /// True if the clocks are concurrent (siblings).
    pub fn is_concurrent_with(&self, other: &Self) -> bool {
        matches!(self.compare(other), Comparison::Concurrent)
    }

    /// Pointwise maximum over the union of both clocks' keys. Associative
    /// and commutative.
    pub fn merge(&self, other: &Self) -> Self {
        let mut counters = self.counters.clone();
        for (node, &value) in &other.counters {
            let entry = counters.entry(node.clone()).or_insert(0);
            *entry = (*entry).max(value);
        }
        Self { counters }
    }
}
