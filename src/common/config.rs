//! Configuration for the minidfs cluster

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "minidfs.toml";

/// Environment variable prefix (`MINIDFS_NODES`, `MINIDFS_REPLICAS`, ...)
pub const ENV_PREFIX: &str = "MINIDFS";

/// Cluster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Total number of storage nodes
    #[serde(default = "default_nodes")]
    pub nodes: u32,

    /// Replication factor
    #[serde(default = "default_replicas")]
    pub replicas: usize,

    /// Directory holding the `node_<id>` directories
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// Health audit warns when fewer replicas than this are active
    #[serde(default = "default_min_healthy_replicas")]
    pub min_healthy_replicas: usize,

    /// On a replica read failure, try the next replica instead of aborting
    #[serde(default = "default_read_fallback")]
    pub read_fallback: bool,

    /// Reject replica reads whose blake3 digest differs from the recorded one
    #[serde(default)]
    pub verify_reads: bool,

    /// Where the shell writes downloaded files
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_nodes() -> u32 {
    4
}
fn default_replicas() -> usize {
    3
}
fn default_storage_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_min_healthy_replicas() -> usize {
    2
}
fn default_read_fallback() -> bool {
    true
}
fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            replicas: default_replicas(),
            storage_root: default_storage_root(),
            min_healthy_replicas: default_min_healthy_replicas(),
            read_fallback: default_read_fallback(),
            verify_reads: false,
            download_dir: default_download_dir(),
            log_level: default_log_level(),
        }
    }
}

impl ClusterConfig {
    /// Load from `minidfs.toml` (if present) and `MINIDFS_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the given file (optional) layered under the environment.
    ///
    /// Not validated here: callers may still override fields.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(false))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Reject configurations the coordinator cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.replicas == 0 {
            return Err(Error::InvalidConfig(
                "replication factor must be at least 1".into(),
            ));
        }
        if (self.nodes as usize) < self.replicas {
            return Err(Error::InvalidConfig(format!(
                "node count {} is below replication factor {}",
                self.nodes, self.replicas
            )));
        }
        if self.min_healthy_replicas == 0 {
            return Err(Error::InvalidConfig(
                "min_healthy_replicas must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
