//! Placement strategy for new files
//!
//! Deterministic: candidates are the active nodes in ascending id order, and a
//! file goes to the first `replicas` of them that accept the write. No load
//! balancing, no randomization.

use crate::common::{Error, Result};
use crate::coordinator::registry::{Node, NodeRegistry};

/// PlacementManager picks the nodes that receive a new file.
pub struct PlacementManager {
    /// Number of replicas per file
    replicas: usize,
}

impl PlacementManager {
    pub fn new(replicas: usize) -> Self {
        Self { replicas }
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Nodes to try, in order.
    pub fn scan_order<'a>(&self, registry: &'a NodeRegistry) -> impl Iterator<Item = &'a Node> {
        registry.iter().filter(|n| n.is_active())
    }

    /// Is a replica set of `placed` nodes complete?
    pub fn is_complete(&self, placed: usize) -> bool {
        placed >= self.replicas
    }

    /// Fail unless `placed` reaches the replication factor.
    pub fn ensure_complete(&self, placed: usize) -> Result<()> {
        if !self.is_complete(placed) {
            return Err(Error::InsufficientReplicas {
                needed: self.replicas,
                available: placed,
            });
        }
        Ok(())
    }
}
