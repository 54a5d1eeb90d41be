//! # minidfs
//!
//! A single-process simulation of a replicated file store:
//! - A fixed pool of storage nodes, each backed by a local directory
//! - Whole-file replication to a target replica count on upload
//! - Reads served from the first live replica
//! - Node failure/recovery with replica health warnings
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           Command shell                 │
//! └───────────┬─────────────────────────────┘
//!             │
//! ┌───────────▼─────────────────────────────┐
//! │        Replication coordinator          │
//! │  - NodeRegistry (liveness)              │
//! │  - ReplicaDirectory (key → nodes)       │
//! └───────────┬─────────────────────────────┘
//!             │ ObjectStore
//!   ┌─────────┴──────────┬──────────────┐
//!   │                    │              │
//! ┌─▼──────────┐   ┌─────▼──────┐   ┌──▼───────────┐
//! │ node_1/    │   │ node_2/    │   │ node_N/      │
//! └────────────┘   └────────────┘   └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! minidfs --nodes 4 --replicas 3 --root ./cluster
//! DFS> upload ./report.txt
//! DFS> fail 1
//! DFS> download report.txt
//! ```

pub mod common;
pub mod coordinator;
pub mod shell;
pub mod volume;

// Re-export commonly used types
pub use common::{ClusterConfig, Error, Result};
pub use coordinator::Coordinator;
pub use shell::Shell;

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
