//! Replica directory
//!
//! Stores, per file key:
//! - the replica set (node ids in placement order)
//! - size, blake3 digest and creation time of the uploaded bytes
//!
//! Kept in memory only; nothing survives a restart. Keys iterate in sorted order.

use crate::common::{Error, Result};
use crate::coordinator::registry::NodeRegistry;
use serde::Serialize;
use std::collections::BTreeMap;

/// File metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub key: String,
    /// Node ids in the order they were written at upload time
    pub replicas: Vec<u32>,
    pub size: u64,
    pub blake3: String,
    pub created_at: u64,
}

/// ReplicaDirectory maps file keys to their replica sets
#[derive(Debug, Default)]
pub struct ReplicaDirectory {
    entries: BTreeMap<String, FileMetadata>,
}

impl ReplicaDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite the entry for `meta.key`.
    ///
    /// Every replica id must name a registered node, with no duplicates.
    /// Returns the replaced entry, if any.
    pub fn put(
        &mut self,
        meta: FileMetadata,
        registry: &NodeRegistry,
    ) -> Result<Option<FileMetadata>> {
        for (i, id) in meta.replicas.iter().enumerate() {
            registry.get(*id)?;
            if meta.replicas[..i].contains(id) {
                return Err(Error::Other(format!(
                    "duplicate node {} in replica set of '{}'",
                    id, meta.key
                )));
            }
        }

        Ok(self.entries.insert(meta.key.clone(), meta))
    }

    pub fn get(&self, key: &str) -> Result<&FileMetadata> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    pub fn remove(&mut self, key: &str) -> Result<FileMetadata> {
        self.entries
            .remove(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All entries, sorted by key
    pub fn iter(&self) -> impl Iterator<Item = &FileMetadata> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::MemStore;

    fn meta(key: &str, replicas: Vec<u32>) -> FileMetadata {
        FileMetadata {
            key: key.to_string(),
            replicas,
            size: 5,
            blake3: "abc123".to_string(),
            created_at: 1234567890,
        }
    }

    fn registry() -> NodeRegistry {
        NodeRegistry::initialize(4, 3, &MemStore::new()).unwrap()
    }

    #[test]
    fn test_put_get_remove() {
        let reg = registry();
        let mut dir = ReplicaDirectory::new();

        assert!(dir.put(meta("a.txt", vec![2, 1, 3]), &reg).unwrap().is_none());
        assert_eq!(dir.get("a.txt").unwrap().replicas, vec![2, 1, 3]);

        let removed = dir.remove("a.txt").unwrap();
        assert_eq!(removed.key, "a.txt");
        assert!(matches!(dir.get("a.txt"), Err(Error::NotFound(_))));
        assert!(matches!(dir.remove("a.txt"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_overwrite_returns_previous() {
        let reg = registry();
        let mut dir = ReplicaDirectory::new();
        dir.put(meta("a.txt", vec![1, 2, 3]), &reg).unwrap();

        let previous = dir.put(meta("a.txt", vec![2, 3, 4]), &reg).unwrap();
        assert_eq!(previous.unwrap().replicas, vec![1, 2, 3]);
        assert_eq!(dir.get("a.txt").unwrap().replicas, vec![2, 3, 4]);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_rejects_unknown_or_duplicate_nodes() {
        let reg = registry();
        let mut dir = ReplicaDirectory::new();

        assert!(matches!(
            dir.put(meta("a.txt", vec![1, 5, 2]), &reg),
            Err(Error::NodeNotFound(5))
        ));
        assert!(dir.put(meta("a.txt", vec![1, 1, 2]), &reg).is_err());
        assert!(dir.is_empty());
    }

    #[test]
    fn test_keys_sorted() {
        let reg = registry();
        let mut dir = ReplicaDirectory::new();
        for key in ["zeta", "alpha", "mid"] {
            dir.put(meta(key, vec![1, 2, 3]), &reg).unwrap();
        }

        let keys: Vec<&str> = dir.keys().collect();
        assert_eq!(keys, vec!["alpha", "mid", "zeta"]);
    }
}
