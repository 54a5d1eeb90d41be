//! Replica health audit
//!
//! A full read-only pass over the directory, re-run after every node failure
//! or recovery. Cost is O(files x replication factor).

use crate::coordinator::metadata::ReplicaDirectory;
use crate::coordinator::registry::NodeRegistry;
use serde::Serialize;

/// A file whose active replica count dropped below the threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowReplicaWarning {
    pub key: String,
    pub active_count: usize,
    pub replicas: usize,
}

impl std::fmt::Display for LowReplicaWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "File '{}' has only {} active replicas! Data loss risk!",
            self.key, self.active_count
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub files_checked: usize,
    pub warnings: Vec<LowReplicaWarning>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn warning_for(&self, key: &str) -> Option<&LowReplicaWarning> {
        self.warnings.iter().find(|w| w.key == key)
    }
}

/// Warn for every file with fewer than `threshold` active replicas.
pub fn check_replica_health(
    directory: &ReplicaDirectory,
    registry: &NodeRegistry,
    threshold: usize,
) -> HealthReport {
    let mut report = HealthReport::default();

    for meta in directory.iter() {
        report.files_checked += 1;

        let active_count = meta
            .replicas
            .iter()
            .filter(|id| registry.is_active(**id))
            .count();

        if active_count < threshold {
            let warning = LowReplicaWarning {
                key: meta.key.clone(),
                active_count,
                replicas: meta.replicas.len(),
            };
            tracing::warn!("{}", warning);
            report.warnings.push(warning);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::metadata::FileMetadata;
    use crate::volume::MemStore;

    fn setup() -> (ReplicaDirectory, NodeRegistry) {
        let registry = NodeRegistry::initialize(4, 3, &MemStore::new()).unwrap();
        let mut directory = ReplicaDirectory::new();
        directory
            .put(
                FileMetadata {
                    key: "a.txt".into(),
                    replicas: vec![1, 2, 3],
                    size: 1,
                    blake3: String::new(),
                    created_at: 0,
                },
                &registry,
            )
            .unwrap();
        (directory, registry)
    }

    #[test]
    fn test_one_failure_no_warning() {
        let (directory, mut registry) = setup();
        registry.mark_failed(1).unwrap();

        let report = check_replica_health(&directory, &registry, 2);
        assert_eq!(report.files_checked, 1);
        assert!(report.is_healthy());
    }

    #[test]
    fn test_two_failures_warn() {
        let (directory, mut registry) = setup();
        registry.mark_failed(1).unwrap();
        registry.mark_failed(3).unwrap();

        let report = check_replica_health(&directory, &registry, 2);
        let warning = report.warning_for("a.txt").unwrap();
        assert_eq!(warning.active_count, 1);
        assert_eq!(warning.replicas, 3);
    }

    #[test]
    fn test_failure_outside_replica_set_ignored() {
        let (directory, mut registry) = setup();
        registry.mark_failed(4).unwrap();
        registry.mark_failed(1).unwrap();

        assert!(check_replica_health(&directory, &registry, 2).is_healthy());
    }

    #[test]
    fn test_empty_directory() {
        let registry = NodeRegistry::initialize(4, 3, &MemStore::new()).unwrap();
        let report = check_replica_health(&ReplicaDirectory::new(), &registry, 2);
        assert_eq!(report, HealthReport::default());
    }
}
