//! Node-side storage
//!
//! Nodes hold whole-file replicas addressed by key. Backends:
//! - Directory per node (the simulated remote disk)
//! - In-memory map with fault injection

pub mod store;

pub use store::{DirStore, Fault, MemStore, NodeRef, ObjectStore, StoreError, StoreResult};
