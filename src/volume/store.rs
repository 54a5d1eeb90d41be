//! Object storage backends for nodes
//!
//! Every node owns one storage location. The coordinator only ever talks to
//! nodes through the `ObjectStore` trait:
//! - `DirStore`: one directory per node (`<root>/node_<id>/<encoded key>`)
//! - `MemStore`: in-memory, with per-node fault injection for tests

use crate::common::encode_key;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Failure reported by a storage backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object '{key}' not found on node {node}")]
    NotFound { node: u32, key: String },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Handle to the storage location backing one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub node_id: u32,
    pub path: PathBuf,
}

/// Trait for node storage backends
pub trait ObjectStore {
    /// Prepare the storage location for a node.
    fn attach(&self, node_id: u32) -> StoreResult<NodeRef>;

    fn store_object_at(&self, node: &NodeRef, key: &str, bytes: &[u8]) -> StoreResult<()>;

    fn fetch_object_from(&self, node: &NodeRef, key: &str) -> StoreResult<Vec<u8>>;

    fn remove_object_from(&self, node: &NodeRef, key: &str) -> StoreResult<()>;
}

/// Directory-backed store: each node is a local directory standing in for a remote disk
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(node: &NodeRef, key: &str) -> PathBuf {
        node.path.join(encode_key(key))
    }
}

impl ObjectStore for DirStore {
    fn attach(&self, node_id: u32) -> StoreResult<NodeRef> {
        let path = self.root.join(format!("node_{}", node_id));
        fs::create_dir_all(&path)?;
        Ok(NodeRef { node_id, path })
    }

    fn store_object_at(&self, node: &NodeRef, key: &str, bytes: &[u8]) -> StoreResult<()> {
        fs::write(Self::object_path(node, key), bytes)?;
        Ok(())
    }

    fn fetch_object_from(&self, node: &NodeRef, key: &str) -> StoreResult<Vec<u8>> {
        match fs::read(Self::object_path(node, key)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                node: node.node_id,
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_object_from(&self, node: &NodeRef, key: &str) -> StoreResult<()> {
        match fs::remove_file(Self::object_path(node, key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                node: node.node_id,
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Which operation a `MemStore` fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Store,
    Fetch,
    Remove,
}

/// In-memory store
#[derive(Default)]
pub struct MemStore {
    objects: Mutex<HashMap<(u32, String), Vec<u8>>>,
    faults: Mutex<HashSet<(u32, Fault)>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` on `node_id` fail with an I/O error until cleared.
    pub fn inject_fault(&self, node_id: u32, op: Fault) {
        lock(&self.faults).insert((node_id, op));
    }

    pub fn clear_faults(&self) {
        lock(&self.faults).clear();
    }

    /// Does `node_id` physically hold `key`?
    pub fn contains(&self, node_id: u32, key: &str) -> bool {
        lock(&self.objects).contains_key(&(node_id, key.to_string()))
    }

    /// Overwrite a stored object in place, bypassing faults.
    pub fn corrupt(&self, node_id: u32, key: &str, bytes: &[u8]) {
        if let Some(stored) = lock(&self.objects).get_mut(&(node_id, key.to_string())) {
            *stored = bytes.to_vec();
        }
    }

    /// Number of objects held by `node_id`
    pub fn object_count(&self, node_id: u32) -> usize {
        lock(&self.objects)
            .keys()
            .filter(|(node, _)| *node == node_id)
            .count()
    }

    fn check(&self, node: &NodeRef, op: Fault) -> StoreResult<()> {
        if lock(&self.faults).contains(&(node.node_id, op)) {
            return Err(StoreError::Io(std::io::Error::new(
                ErrorKind::Other,
                format!("injected {:?} fault on node {}", op, node.node_id),
            )));
        }
        Ok(())
    }
}

impl ObjectStore for MemStore {
    fn attach(&self, node_id: u32) -> StoreResult<NodeRef> {
        Ok(NodeRef {
            node_id,
            path: PathBuf::from(format!("mem://node_{}", node_id)),
        })
    }

    fn store_object_at(&self, node: &NodeRef, key: &str, bytes: &[u8]) -> StoreResult<()> {
        self.check(node, Fault::Store)?;
        lock(&self.objects).insert((node.node_id, key.to_string()), bytes.to_vec());
        Ok(())
    }

    fn fetch_object_from(&self, node: &NodeRef, key: &str) -> StoreResult<Vec<u8>> {
        self.check(node, Fault::Fetch)?;
        lock(&self.objects)
            .get(&(node.node_id, key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                node: node.node_id,
                key: key.to_string(),
            })
    }

    fn remove_object_from(&self, node: &NodeRef, key: &str) -> StoreResult<()> {
        self.check(node, Fault::Remove)?;
        lock(&self.objects)
            .remove(&(node.node_id, key.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                node: node.node_id,
                key: key.to_string(),
            })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
