//! Error types for minidfs

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Replication I/O error on node {node}: {reason}")]
    ReplicationIo { node: u32, reason: String },

    // === Lookup Errors ===
    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("File not found in DFS: {0}")]
    NotFound(String),

    #[error("Invalid node ID {0}")]
    NodeNotFound(u32),

    // === Placement Errors ===
    #[error("Insufficient replicas: need {needed}, have {available}")]
    InsufficientReplicas { needed: usize, available: usize },

    #[error("All replicas of '{0}' are unavailable")]
    AllReplicasUnavailable(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // === Shell Errors ===
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Is this a retryable error?
    ///
    /// The coordinator never retries on its own; this is for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_) | Error::ReplicationIo { .. })
    }

    /// Did the operation fail because of cluster topology rather than input?
    pub fn is_availability(&self) -> bool {
        matches!(
            self,
            Error::InsufficientReplicas { .. } | Error::AllReplicasUnavailable(_)
        )
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
