//! Replication coordinator
//!
//! The coordinator is responsible for:
//! - Node liveness (fixed pool, fail/recover)
//! - Metadata management (key → replica set mapping)
//! - Placement decisions (ascending id scan over active nodes)
//! - Upload / download / delete orchestration against node storage
//! - Replica health auditing after topology changes

pub mod health;
pub mod metadata;
pub mod placement;
pub mod registry;
pub mod server;

pub use health::{HealthReport, LowReplicaWarning};
pub use metadata::{FileMetadata, ReplicaDirectory};
pub use registry::{Node, NodeRegistry, NodeStatus};
pub use server::{Coordinator, Download, UploadOutcome};
