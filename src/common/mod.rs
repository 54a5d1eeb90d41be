//! Common utilities and types shared across minidfs

pub mod config;
pub mod error;
pub mod utils;

pub use config::ClusterConfig;
pub use error::{Error, Result};
pub use utils::{blake3_hex, encode_key, format_bytes, timestamp_now, validate_key, NodeState};
