/// Consistent hash ring with virtual nodes.
///
/// Membership is fixed at startup (see spec: no dynamic membership in this
/// core), so the ring is built once and never locked. Every node builds
/// the ring from the same `NodeId` list and the same `V`, so two nodes
/// with identical configuration produce bit-identical preference lists —
/// the ring is just a sorted `Vec`, not a `BTreeMap`, since it is never
/// mutated after construction.
use crate::types::NodeId;

/// One virtual position on the ring.
#[derive(Debug, Clone)]
struct RingEntry {
    position: u64,
    node: NodeId,
}

/// An immutable consistent hash ring.
pub struct Ring {
    /// Positions sorted ascending; ties broken by `NodeId` lex order at
    /// construction time.
    entries: Vec<RingEntry>,
}

impl Ring {
    /// Build a ring from the fixed node set, contributing `vnodes` virtual
    /// positions per physical node.
    ///
    /// Hashes `"{node_id}:{i}"` for `i` in `[0, vnodes)` using a stable,
    /// uniform 64-bit hash (blake3, truncated) — the same function every
    /// node must use so preference lists agree cluster-wide.
    pub fn new(nodes: &[NodeId], vnodes: usize) -> Self {
        let mut entries: Vec<RingEntry> = Vec::with_capacity(nodes.len() * vnodes);
        for node in nodes {
            for i in 0..vnodes {
                let vnode_key = format!("{}:{}", node.as_str(), i);
                entries.push(RingEntry { position: hash_position(vnode_key.as_bytes()), node: node.clone() });
            }
        }
        // Sort by position, tie-broken by NodeId lex order, so construction
        // is fully deterministic regardless of input order or hash ties.
        entries.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.node.cmp(&b.node)));
        Self { entries }
    }

    /// Number of distinct physical nodes backing this ring.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compute the ordered preference list of up to `n` distinct NodeIDs
    /// for `key`: walk clockwise from the key's hash position, collecting
    /// distinct node IDs until `n` are found or the walk wraps back to the
    /// start.
    pub fn preference_list(&self, key: &str, n: usize) -> Vec<NodeId> {
        if self.entries.is_empty() || n == 0 {
            return Vec::new();
        }

        let target = hash_position(key.as_bytes());
        let start = match self.entries.binary_search_by(|e| e.position.cmp(&target)) {
            Ok(idx) => idx,
            Err(idx) => idx % self.entries.len(),
        };

        let mut result = Vec::with_capacity(n);
        let mut seen = std::collections::HashSet::with_capacity(n);
        for offset in 0..self.entries.len() {
            let idx = (start + offset) % self.entries.len();
            let node = &self.entries[idx].node;
            if seen.insert(node.clone()) {
                result.push(node.clone());
                if result.len() == n {
                    break;
                }
            }
        }
        result
    }
}

/// Hash bytes to a stable 64-bit ring position. Any uniform, stable hash
/// is conformant as long as every node agrees on it; blake3 is already a
/// dependency of this crate.
fn hash_position(bytes: &[u8]) -> u64 {
    let digest = blake3::hash(bytes);
    let b = digest.as_bytes();
    u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}
