//! Node registry
//!
//! Fixed pool of nodes created at startup. Ids are 1-based and never change;
//! only the liveness state is toggled by fail/recover.

use crate::common::{Error, NodeState, Result};
use crate::volume::{NodeRef, ObjectStore};
use serde::Serialize;

/// A storage node
#[derive(Debug, Clone)]
pub struct Node {
    id: u32,
    state: NodeState,
    location: NodeRef,
}

impl Node {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn location(&self) -> &NodeRef {
        &self.location
    }
}

/// Point-in-time view of a node, for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    pub id: u32,
    pub state: NodeState,
    pub location: String,
}

/// NodeRegistry holds every node, indexed by `id - 1`.
pub struct NodeRegistry {
    nodes: Vec<Node>,
}

impl NodeRegistry {
    /// Create `count` active nodes with ids `1..=count`, attaching each to its storage.
    pub fn initialize(count: u32, replicas: usize, store: &dyn ObjectStore) -> Result<Self> {
        if (count as usize) < replicas {
            return Err(Error::InvalidConfig(format!(
                "node count {} is below replication factor {}",
                count, replicas
            )));
        }

        let mut nodes = Vec::with_capacity(count as usize);
        for id in 1..=count {
            let location = store.attach(id).map_err(|e| Error::ReplicationIo {
                node: id,
                reason: e.to_string(),
            })?;
            tracing::debug!("Node {} attached at {}", id, location.path.display());
            nodes.push(Node {
                id,
                state: NodeState::Active,
                location,
            });
        }

        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by id
    pub fn get(&self, id: u32) -> Result<&Node> {
        id.checked_sub(1)
            .and_then(|idx| self.nodes.get(idx as usize))
            .ok_or(Error::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: u32) -> Result<&mut Node> {
        id.checked_sub(1)
            .and_then(|idx| self.nodes.get_mut(idx as usize))
            .ok_or(Error::NodeNotFound(id))
    }

    /// Mark a node failed. Failing a failed node is a no-op.
    pub fn mark_failed(&mut self, id: u32) -> Result<()> {
        self.get_mut(id)?.state = NodeState::Failed;
        Ok(())
    }

    /// Mark a node active again. Recovering an active node is a no-op.
    pub fn mark_recovered(&mut self, id: u32) -> Result<()> {
        self.get_mut(id)?.state = NodeState::Active;
        Ok(())
    }

    /// Unknown ids count as inactive.
    pub fn is_active(&self, id: u32) -> bool {
        self.get(id).map(Node::is_active).unwrap_or(false)
    }

    /// Ids of active nodes, ascending
    pub fn active_node_ids(&self) -> Vec<u32> {
        self.nodes
            .iter()
            .filter(|n| n.is_active())
            .map(Node::id)
            .collect()
    }

    /// Iterate nodes in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn all(&self) -> Vec<NodeStatus> {
        self.nodes
            .iter()
            .map(|n| NodeStatus {
                id: n.id,
                state: n.state,
                location: n.location.path.display().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::MemStore;

    fn registry(count: u32) -> NodeRegistry {
        NodeRegistry::initialize(count, 3, &MemStore::new()).unwrap()
    }

    #[test]
    fn test_initialize() {
        let reg = registry(4);
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.active_node_ids(), vec![1, 2, 3, 4]);
        assert_eq!(reg.get(4).unwrap().location().node_id, 4);
    }

    #[test]
    fn test_initialize_rejects_small_cluster() {
        let result = NodeRegistry::initialize(2, 3, &MemStore::new());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_fail_and_recover() {
        let mut reg = registry(4);
        reg.mark_failed(2).unwrap();
        assert!(!reg.is_active(2));
        assert_eq!(reg.active_node_ids(), vec![1, 3, 4]);

        reg.mark_recovered(2).unwrap();
        assert!(reg.is_active(2));
    }

    #[test]
    fn test_idempotent_toggles() {
        let mut reg = registry(4);
        reg.mark_failed(3).unwrap();
        reg.mark_failed(3).unwrap();
        assert!(!reg.is_active(3));

        reg.mark_recovered(3).unwrap();
        reg.mark_recovered(3).unwrap();
        assert!(reg.is_active(3));
    }

    #[test]
    fn test_out_of_range() {
        let mut reg = registry(4);
        assert!(matches!(reg.mark_failed(0), Err(Error::NodeNotFound(0))));
        assert!(matches!(reg.mark_recovered(5), Err(Error::NodeNotFound(5))));
        assert!(!reg.is_active(9));
    }

    #[test]
    fn test_all_snapshot() {
        let mut reg = registry(3);
        reg.mark_failed(1).unwrap();
        let all = reg.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].state, NodeState::Failed);
        assert_eq!(all[1].state, NodeState::Active);
        assert_eq!(all[2].location, "mem://node_3");
    }
}
