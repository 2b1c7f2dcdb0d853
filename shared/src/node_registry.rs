use std::collections::HashMap;

use log::warn;
use thiserror::Error;

use crate::{node::Node, types::RefId};

/// Errors that can occur during registry lookups
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Node was not found, either never registered or already evicted
    #[error("Node {ref_id} not found in registry")]
    NotFound { ref_id: RefId },
}

/// Receives eviction notifications before the registry forgets a node, so
/// removal subscribers always observe a still-valid previous state.
pub trait EvictionListener {
    fn node_evicted(&mut self, ref_id: RefId, node: &Node);
}

/// Listener for decoder paths with nothing subscribed.
pub struct NullListener;

impl EvictionListener for NullListener {
    fn node_evicted(&mut self, _ref_id: RefId, _node: &Node) {}
}

struct RegistryEntry {
    node: Node,
    count: u32,
}

/// Registry mapping a stable id to a live graph node, owning node lifetime
/// via reference counting.
///
/// Every id reachable from the root holds a count of at least 1. When a
/// count drops to 0 the entry is evicted: the listener is notified first,
/// then any node-valued entries of the evicted node are released in turn.
pub struct NodeRegistry {
    entries: HashMap<RefId, RegistryEntry>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a node under `ref_id` with a count of 1. Re-registering an
    /// id replaces the node but keeps the count the Decoder accumulated.
    pub fn register(&mut self, ref_id: RefId, node: Node) {
        match self.entries.get_mut(&ref_id) {
            Some(entry) => {
                entry.node = node;
            }
            None => {
                self.entries.insert(ref_id, RegistryEntry { node, count: 1 });
            }
        }
    }

    pub fn get(&self, ref_id: RefId) -> Result<&Node, RegistryError> {
        self.entries
            .get(&ref_id)
            .map(|entry| &entry.node)
            .ok_or(RegistryError::NotFound { ref_id })
    }

    pub fn contains(&self, ref_id: RefId) -> bool {
        self.entries.contains_key(&ref_id)
    }

    pub fn count(&self, ref_id: RefId) -> Option<u32> {
        self.entries.get(&ref_id).map(|entry| entry.count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retain(&mut self, ref_id: RefId) {
        let Some(entry) = self.entries.get_mut(&ref_id) else {
            warn!("retain on unknown ref {}", ref_id);
            return;
        };
        entry.count += 1;
    }

    /// Decrement the count for `ref_id`. At 0 the entry is evicted: the
    /// listener sees the node while it is still whole, then references held
    /// by the node's own entries are released, cascading depth-first.
    pub fn release(&mut self, ref_id: RefId, listener: &mut dyn EvictionListener) {
        let Some(entry) = self.entries.get_mut(&ref_id) else {
            warn!("release on unknown ref {}", ref_id);
            return;
        };
        entry.count = entry.count.saturating_sub(1);
        if entry.count > 0 {
            return;
        }

        // entry must leave the map before cascading, otherwise a release
        // cycle through a stale child reference could revisit it
        let Some(entry) = self.entries.remove(&ref_id) else {
            return;
        };
        listener.node_evicted(ref_id, &entry.node);
        for child in entry.node.child_refs() {
            self.release(child, listener);
        }
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
