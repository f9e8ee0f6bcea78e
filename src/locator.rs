//! Consistent-hash routing table.
//!
//! The underlying memcached client library this core plugs into normally
//! owns key hashing and the consistent-hash ring; this crate still needs a
//! concrete, testable `locate()` so it supplies a minimal ketama-style ring.

use crate::node::NodeHandle;
use std::hash::Hasher;
use std::sync::Arc;
use twox_hash::XxHash64;

/// Virtual nodes placed per physical node. Higher spreads load more evenly
/// across a small node count at the cost of a larger ring.
const REPLICAS_PER_NODE: usize = 160;

/// Consistent-hash mapping from keys to the alive node handles it was built
/// from. Built afresh on every membership change; never mutated in place.
pub struct RoutingTable {
    ring: Vec<(u64, Arc<dyn NodeHandle>)>,
}

impl RoutingTable {
    /// Build a table over exactly the handles passed in. Callers are
    /// responsible for passing only alive handles — this type has no
    /// opinion on liveness, it just hashes what it's given.
    pub fn new(handles: Vec<Arc<dyn NodeHandle>>) -> Self {
        let mut ring: Vec<(u64, Arc<dyn NodeHandle>)> = Vec::with_capacity(handles.len() * REPLICAS_PER_NODE);
        for handle in handles {
            let base = handle.endpoint().to_string();
            for replica in 0..REPLICAS_PER_NODE {
                let point = hash_point(&base, replica);
                ring.push((point, handle.clone()));
            }
        }
        ring.sort_by_key(|(point, _)| *point);
        Self { ring }
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of distinct physical nodes backing this table.
    pub fn node_count(&self) -> usize {
        self.ring.len() / REPLICAS_PER_NODE.max(1)
    }

    pub fn locate(&self, key: &[u8]) -> Option<Arc<dyn NodeHandle>> {
        if self.ring.is_empty() {
            return None;
        }
        let target = hash_key(key);
        let idx = self.ring.partition_point(|(point, _)| *point < target);
        let idx = if idx == self.ring.len() { 0 } else { idx };
        Some(self.ring[idx].1.clone())
    }

    pub fn nodes(&self) -> Vec<Arc<dyn NodeHandle>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for (_, handle) in &self.ring {
            let key = handle.endpoint().to_string();
            if seen.insert(key) {
                out.push(handle.clone());
            }
        }
        out
    }
}

fn hash_point(endpoint: &str, replica: usize) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(endpoint.as_bytes());
    hasher.write_usize(replica);
    hasher.finish()
}

fn hash_key(key: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(key);
    hasher.finish()
}
