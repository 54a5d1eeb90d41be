//! Interactive shell over a simulated replicated file store

use clap::Parser;
use minidfs::{ClusterConfig, Coordinator, Shell};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "minidfs")]
#[command(about = "Replicated file store simulation with an operator shell")]
#[command(version)]
struct Cli {
    /// Config file (TOML); missing file means defaults
    #[arg(long, default_value = minidfs::common::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Total number of storage nodes
    #[arg(long)]
    nodes: Option<u32>,

    /// Replication factor
    #[arg(long)]
    replicas: Option<usize>,

    /// Directory holding the node_<id> directories
    #[arg(long)]
    root: Option<PathBuf>,

    /// Directory for downloaded files
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Abort a download on the first failed replica read
    #[arg(long)]
    strict_reads: bool,

    /// Check each replica read against the recorded blake3 digest
    #[arg(long)]
    verify_reads: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // CLI arguments take priority over file and environment
    let mut config = ClusterConfig::load_from(&cli.config)?;
    if let Some(nodes) = cli.nodes {
        config.nodes = nodes;
    }
    if let Some(replicas) = cli.replicas {
        config.replicas = replicas;
    }
    if let Some(root) = cli.root {
        config.storage_root = root;
    }
    if let Some(dir) = cli.download_dir {
        config.download_dir = dir;
    }
    if cli.strict_reads {
        config.read_fallback = false;
    }
    if cli.verify_reads {
        config.verify_reads = true;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut coordinator = Coordinator::open(config)?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    Shell::new(&mut coordinator).run(stdin.lock(), &mut stdout)?;

    Ok(())
}
