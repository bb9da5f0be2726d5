use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use taskmill_core::NodeId;

/// Registry of all nodes that have sent `Init`, keyed by identity with
/// the monotonic time of last contact.
///
/// The only state shared across connection handlers and the liveness
/// sweep; every access goes through the internal lock.
pub struct NodeRegistry {
    nodes: RwLock<HashMap<NodeId, Instant>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        NodeRegistry {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    /// Record a node's first contact. A repeated `Init` from a known
    /// node is tolerated and does not reset its timestamp.
    pub fn register(&self, node_id: &NodeId) {
        let mut nodes = self.nodes.write();
        nodes.entry(node_id.clone()).or_insert_with(Instant::now);
    }

    /// Refresh a node's last-seen time. Returns false for an unknown
    /// identity.
    pub fn touch(&self, node_id: &NodeId) -> bool {
        let mut nodes = self.nodes.write();
        if let Some(last_seen) = nodes.get_mut(node_id) {
            *last_seen = Instant::now();
            true
        } else {
            false
        }
    }

    pub fn is_known(&self, node_id: &NodeId) -> bool {
        let nodes = self.nodes.read();
        nodes.contains_key(node_id)
    }

    /// Snapshot of every node whose last contact is older than the
    /// timeout (strict greater-than). The lock is released before the
    /// caller invokes any timeout hook.
    pub fn stale_nodes(&self, timeout: Duration) -> Vec<NodeId> {
        let nodes = self.nodes.read();
        nodes
            .iter()
            .filter(|(_, last_seen)| last_seen.elapsed() > timeout)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        let nodes = self.nodes.read();
        nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
