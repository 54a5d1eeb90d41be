//! Replication coordinator
//!
//! Owns the node registry and the replica directory, and drives the storage
//! backend for upload, download and delete. Operations run to completion one
//! at a time; callers that share a coordinator across threads must wrap it in
//! a single lock.

use crate::common::{blake3_hex, timestamp_now, validate_key, ClusterConfig, Error, Result};
use crate::coordinator::health::{check_replica_health, HealthReport};
use crate::coordinator::metadata::{FileMetadata, ReplicaDirectory};
use crate::coordinator::placement::PlacementManager;
use crate::coordinator::registry::{NodeRegistry, NodeStatus};
use crate::volume::{DirStore, ObjectStore, StoreError};
use std::path::Path;

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub key: String,
    pub replicas: Vec<u32>,
    /// Replica set of the entry this upload replaced
    pub replaced: Option<Vec<u32>>,
}

/// Bytes read back from one replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub key: String,
    pub node_id: u32,
    pub bytes: Vec<u8>,
}

pub struct Coordinator<S: ObjectStore = DirStore> {
    config: ClusterConfig,
    store: S,
    registry: NodeRegistry,
    directory: ReplicaDirectory,
    placement: PlacementManager,
}

impl Coordinator<DirStore> {
    /// Coordinator over `node_<id>` directories under `config.storage_root`.
    pub fn open(config: ClusterConfig) -> Result<Self> {
        let store = DirStore::new(config.storage_root.clone());
        Self::new(config, store)
    }
}

impl<S: ObjectStore> Coordinator<S> {
    pub fn new(config: ClusterConfig, store: S) -> Result<Self> {
        config.validate()?;

        let registry = NodeRegistry::initialize(config.nodes, config.replicas, &store)?;
        let placement = PlacementManager::new(config.replicas);

        tracing::info!("[DFS] Initialized with {} nodes.", config.nodes);
        tracing::info!("  Replicas: {}", config.replicas);
        tracing::info!("  Storage root: {}", config.storage_root.display());

        Ok(Self {
            config,
            store,
            registry,
            directory: ReplicaDirectory::new(),
            placement,
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn directory(&self) -> &ReplicaDirectory {
        &self.directory
    }

    /// Upload the local file at `source` under `key`.
    pub fn upload_file(&mut self, key: &str, source: &Path) -> Result<UploadOutcome> {
        if !source.is_file() {
            return Err(Error::SourceNotFound(source.to_path_buf()));
        }
        let bytes = std::fs::read(source)?;
        self.upload(key, &bytes)
    }

    /// Replicate `bytes` to the first `replicas` active nodes in id order.
    ///
    /// All-or-nothing: on a store failure or when too few nodes are active,
    /// copies written by this call are undone and the directory is unchanged.
    /// A node holding the current version is only overwritten once its copy
    /// has been staged, so an aborted overwrite can put it back.
    pub fn upload(&mut self, key: &str, bytes: &[u8]) -> Result<UploadOutcome> {
        validate_key(key)?;

        let old_replicas: Vec<u32> = self
            .directory
            .get(key)
            .map(|m| m.replicas.clone())
            .unwrap_or_default();

        // (node, copy it held before this upload)
        let mut written: Vec<(u32, Option<Vec<u8>>)> =
            Vec::with_capacity(self.placement.replicas());
        for node in self.placement.scan_order(&self.registry) {
            if self.placement.is_complete(written.len()) {
                break;
            }

            let prior = if old_replicas.contains(&node.id()) {
                match self.store.fetch_object_from(node.location(), key) {
                    Ok(old) => Some(old),
                    Err(StoreError::NotFound { .. }) => None,
                    Err(e) => {
                        tracing::error!(
                            "Cannot stage current copy of '{}' on node {}: {}",
                            key,
                            node.id(),
                            e
                        );
                        self.undo_upload(key, &written);
                        return Err(replication_error(node.id(), e));
                    }
                }
            } else {
                None
            };

            match self.store.store_object_at(node.location(), key, bytes) {
                Ok(()) => {
                    tracing::debug!("Stored '{}' on node {}", key, node.id());
                    written.push((node.id(), prior));
                }
                Err(e) => {
                    tracing::error!("Error during file replication to node {}: {}", node.id(), e);
                    self.undo_upload(key, &written);
                    return Err(replication_error(node.id(), e));
                }
            }
        }

        if let Err(e) = self.placement.ensure_complete(written.len()) {
            tracing::error!("Not enough active nodes for '{}': {}", key, e);
            self.undo_upload(key, &written);
            return Err(e);
        }

        let placed: Vec<u32> = written.iter().map(|(id, _)| *id).collect();
        let meta = FileMetadata {
            key: key.to_string(),
            replicas: placed.clone(),
            size: bytes.len() as u64,
            blake3: blake3_hex(bytes),
            created_at: timestamp_now(),
        };
        let replaced = self.directory.put(meta, &self.registry)?;

        if let Some(old) = &replaced {
            self.purge_stale(key, &old.replicas, &placed);
        }

        tracing::info!("[UPLOAD SUCCESS] '{}' replicated to nodes {:?}", key, placed);

        Ok(UploadOutcome {
            key: key.to_string(),
            replicas: placed,
            replaced: replaced.map(|m| m.replicas),
        })
    }

    /// Compensate for an aborted upload: put staged copies back, remove new ones.
    fn undo_upload(&self, key: &str, written: &[(u32, Option<Vec<u8>>)]) {
        for (id, prior) in written {
            let Ok(node) = self.registry.get(*id) else {
                continue;
            };

            let result = match prior {
                Some(old) => self.store.store_object_at(node.location(), key, old),
                None => self.store.remove_object_from(node.location(), key),
            };
            if let Err(e) = result {
                tracing::warn!("Could not undo upload of '{}' on node {}: {}", key, id, e);
            }
        }
    }

    /// Remove copies left on nodes that are no longer in the replica set.
    fn purge_stale(&self, key: &str, old: &[u32], new: &[u32]) {
        for id in old.iter().filter(|id| !new.contains(id)) {
            let Ok(node) = self.registry.get(*id) else {
                continue;
            };
            match self.store.remove_object_from(node.location(), key) {
                Ok(()) | Err(StoreError::NotFound { .. }) => {
                    tracing::debug!("Purged stale copy of '{}' from node {}", key, id)
                }
                Err(e) => tracing::warn!("Stale copy of '{}' left on node {}: {}", key, id, e),
            }
        }
    }

    /// Read `key` from the earliest-recorded replica that is active and readable.
    ///
    /// With `read_fallback` a failed read moves on to the next replica;
    /// without it the first failed read aborts the download. Bytes are only
    /// compared against the recorded digest when `verify_reads` is set.
    pub fn download(&self, key: &str) -> Result<Download> {
        let meta = self.directory.get(key)?;

        for id in &meta.replicas {
            let node = self.registry.get(*id)?;
            if !node.is_active() {
                tracing::debug!("Skipping inactive node {} for '{}'", id, key);
                continue;
            }

            let failure = match self.store.fetch_object_from(node.location(), key) {
                Ok(bytes) if !self.config.verify_reads || blake3_hex(&bytes) == meta.blake3 => {
                    tracing::info!("[DOWNLOAD SUCCESS] '{}' read from node {}", key, id);
                    return Ok(Download {
                        key: key.to_string(),
                        node_id: *id,
                        bytes,
                    });
                }
                Ok(_) => Error::ReplicationIo {
                    node: *id,
                    reason: format!("checksum mismatch for '{}'", key),
                },
                Err(e) => replication_error(*id, e),
            };

            if !self.config.read_fallback {
                tracing::error!("Error during download: {}", failure);
                return Err(failure);
            }
            tracing::warn!("Replica read failed, trying next: {}", failure);
        }

        tracing::error!("All replicas of '{}' are unavailable", key);
        Err(Error::AllReplicasUnavailable(key.to_string()))
    }

    /// Remove every copy of `key`, then forget the key.
    ///
    /// Copies are staged first; if any removal fails the copies already
    /// removed are written back and the entry is kept.
    pub fn delete(&mut self, key: &str) -> Result<FileMetadata> {
        let meta = self.directory.get(key)?.clone();

        let mut staged: Vec<(u32, Vec<u8>)> = Vec::with_capacity(meta.replicas.len());
        for id in &meta.replicas {
            let node = self.registry.get(*id)?;
            match self.store.fetch_object_from(node.location(), key) {
                Ok(bytes) => staged.push((*id, bytes)),
                Err(StoreError::NotFound { .. }) => {
                    tracing::debug!("No copy of '{}' on node {}", key, id)
                }
                Err(e) => {
                    tracing::error!("Error during deletion: {}", e);
                    return Err(replication_error(*id, e));
                }
            }
        }

        let mut removed: Vec<&(u32, Vec<u8>)> = Vec::with_capacity(staged.len());
        for entry in &staged {
            let node = self.registry.get(entry.0)?;
            match self.store.remove_object_from(node.location(), key) {
                Ok(()) | Err(StoreError::NotFound { .. }) => removed.push(entry),
                Err(e) => {
                    tracing::error!("Error during deletion on node {}: {}", entry.0, e);
                    for (id, bytes) in removed {
                        let restored = self
                            .registry
                            .get(*id)
                            .map_err(|e| e.to_string())
                            .and_then(|n| {
                                self.store
                                    .store_object_at(n.location(), key, bytes)
                                    .map_err(|e| e.to_string())
                            });
                        if let Err(reason) = restored {
                            tracing::warn!("Could not restore '{}' on node {}: {}", key, id, reason);
                        }
                    }
                    return Err(replication_error(entry.0, e));
                }
            }
        }

        let meta = self.directory.remove(key)?;
        tracing::info!("[DELETE SUCCESS] '{}' removed from nodes {:?}", key, meta.replicas);
        Ok(meta)
    }

    /// Mark a node failed and re-audit replica health.
    pub fn fail_node(&mut self, id: u32) -> Result<HealthReport> {
        self.registry.mark_failed(id)?;
        tracing::info!("[NODE FAILED] Node {} is inactive.", id);
        Ok(self.check_replica_health())
    }

    /// Mark a node active and re-audit replica health.
    pub fn recover_node(&mut self, id: u32) -> Result<HealthReport> {
        self.registry.mark_recovered(id)?;
        tracing::info!("[NODE RECOVERED] Node {} is active.", id);
        Ok(self.check_replica_health())
    }

    pub fn check_replica_health(&self) -> HealthReport {
        check_replica_health(
            &self.directory,
            &self.registry,
            self.config.min_healthy_replicas,
        )
    }

    /// Stored files, sorted by key
    pub fn list_files(&self) -> impl Iterator<Item = &FileMetadata> {
        self.directory.iter()
    }

    pub fn nodes(&self) -> Vec<NodeStatus> {
        self.registry.all()
    }
}

fn replication_error(node: u32, e: StoreError) -> Error {
    Error::ReplicationIo {
        node,
        reason: e.to_string(),
    }
}
