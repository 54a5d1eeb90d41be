//! Operator command shell
//!
//! Line-oriented: one command per line, read until `exit` or end of input.
//! Coordinator errors are printed and the loop keeps going.

use crate::common::{encode_key, format_bytes, Error, Result};
use crate::coordinator::{Coordinator, HealthReport};
use crate::volume::ObjectStore;
use crate::VERSION;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const PROMPT: &str = "DFS> ";

const HELP: &str = "Commands: upload <path>, download <key>, delete <key>, list, fail <node>, recover <node>, nodes, help, exit";

/// A parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    Download(String),
    Delete(String),
    List,
    Fail(u32),
    Recover(u32),
    Nodes,
    Help,
    Exit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let verb = parts
            .next()
            .ok_or_else(|| Error::InvalidCommand("empty line".into()))?;
        let mut arg = |what: &str| {
            parts
                .next()
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidCommand(format!("{} requires {}", verb, what)))
        };

        let command = match verb {
            "upload" => Command::Upload(PathBuf::from(arg("a file path")?)),
            "download" => Command::Download(arg("a file key")?),
            "delete" => Command::Delete(arg("a file key")?),
            "list" => Command::List,
            "fail" => Command::Fail(parse_node_id(&arg("a node id")?)?),
            "recover" => Command::Recover(parse_node_id(&arg("a node id")?)?),
            "nodes" => Command::Nodes,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            other => return Err(Error::InvalidCommand(other.to_string())),
        };

        Ok(command)
    }
}

fn parse_node_id(s: &str) -> Result<u32> {
    s.parse()
        .map_err(|_| Error::InvalidCommand(format!("'{}' is not a node id", s)))
}

/// Whether the read loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell<'a, S: ObjectStore> {
    coordinator: &'a mut Coordinator<S>,
    download_dir: PathBuf,
}

impl<'a, S: ObjectStore> Shell<'a, S> {
    pub fn new(coordinator: &'a mut Coordinator<S>) -> Self {
        let download_dir = coordinator.config().download_dir.clone();
        Self {
            coordinator,
            download_dir,
        }
    }

    /// Read and execute commands until `exit` or end of input.
    ///
    /// Lines that are not valid UTF-8 are decoded lossily and rejected by the parser.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, out: &mut W) -> Result<()> {
        writeln!(out, "\n=== DISTRIBUTED FILE SYSTEM (minidfs {}) ===", VERSION)?;
        writeln!(out, "{}\n", HELP)?;

        let mut buf = Vec::new();
        loop {
            write!(out, "{}", PROMPT)?;
            out.flush()?;

            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                writeln!(out)?;
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            if line.trim().is_empty() {
                continue;
            }

            let flow = match line.parse::<Command>() {
                Ok(command) => self.execute(command, out)?,
                Err(e) => {
                    writeln!(out, "Error: {}", e)?;
                    Flow::Continue
                }
            };
            if flow == Flow::Exit {
                break;
            }
        }

        tracing::info!("Shell exited; cluster state discarded");
        Ok(())
    }

    /// Run one command. Coordinator errors are printed, output errors returned.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<Flow> {
        if command == Command::Exit {
            return Ok(Flow::Exit);
        }
        if let Err(e) = self.dispatch(command, out) {
            if let Error::Io(io) = &e {
                if io.kind() == std::io::ErrorKind::BrokenPipe {
                    return Err(e);
                }
            }
            writeln!(out, "Error: {}", e)?;
            if e.is_availability() {
                writeln!(out, "Hint: too few active nodes; check `nodes` and `recover <id>`.")?;
            } else if e.is_retryable() {
                writeln!(out, "Hint: storage I/O failed; the command can be retried.")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn dispatch<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::Upload(path) => {
                let key = key_for(&path)?;
                let outcome = self.coordinator.upload_file(&key, &path)?;
                writeln!(
                    out,
                    "[UPLOAD SUCCESS] File replicated to nodes: {}\n",
                    join_ids(&outcome.replicas)
                )?;
            }
            Command::Download(key) => {
                let download = self.coordinator.download(&key)?;
                let dest = self
                    .download_dir
                    .join(format!("downloaded_{}", encode_key(&key)));
                std::fs::write(&dest, &download.bytes)?;
                writeln!(
                    out,
                    "[DOWNLOAD SUCCESS] File downloaded from Node {} to {}",
                    download.node_id,
                    dest.display()
                )?;
            }
            Command::Delete(key) => {
                self.coordinator.delete(&key)?;
                writeln!(out, "[DELETE SUCCESS] File removed from DFS.\n")?;
            }
            Command::List => {
                let mut files = self.coordinator.list_files().peekable();
                if files.peek().is_none() {
                    writeln!(out, "(Empty) No files stored.\n")?;
                    return Ok(());
                }
                writeln!(out, "\nFILES IN DFS:")?;
                for meta in files {
                    writeln!(
                        out,
                        " - {} → Nodes: {} ({})",
                        meta.key,
                        join_ids(&meta.replicas),
                        format_bytes(meta.size)
                    )?;
                }
                writeln!(out)?;
            }
            Command::Fail(id) => {
                let report = self.coordinator.fail_node(id)?;
                writeln!(out, "[NODE FAILED] Node {} is inactive.", id)?;
                write_report(&report, out)?;
            }
            Command::Recover(id) => {
                let report = self.coordinator.recover_node(id)?;
                writeln!(out, "[NODE RECOVERED] Node {} is active.", id)?;
                write_report(&report, out)?;
            }
            Command::Nodes => {
                writeln!(out, "\nNODE STATUS:")?;
                for node in self.coordinator.nodes() {
                    writeln!(out, "Node {}: {}", node.id, node.state)?;
                }
                writeln!(out)?;
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Exit => {}
        }
        Ok(())
    }
}

/// Files are stored under their file name.
fn key_for(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::SourceNotFound(path.to_path_buf()))
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_report<W: Write>(report: &HealthReport, out: &mut W) -> Result<()> {
    for warning in &report.warnings {
        writeln!(out, "WARNING: {}", warning)?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ClusterConfig;
    use crate::volume::{Fault, MemStore};
    use tempfile::TempDir;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "upload ./a.txt".parse::<Command>().unwrap(),
            Command::Upload(PathBuf::from("./a.txt"))
        );
        assert_eq!(
            "download a.txt".parse::<Command>().unwrap(),
            Command::Download("a.txt".into())
        );
        assert_eq!("  fail 2 ".parse::<Command>().unwrap(), Command::Fail(2));
        assert_eq!("recover 3".parse::<Command>().unwrap(), Command::Recover(3));
        assert_eq!("list".parse::<Command>().unwrap(), Command::List);
        assert_eq!("nodes".parse::<Command>().unwrap(), Command::Nodes);
        assert_eq!("quit".parse::<Command>().unwrap(), Command::Exit);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "fail abc".parse::<Command>(),
            Err(Error::InvalidCommand(_))
        ));
        assert!(matches!(
            "delete".parse::<Command>(),
            Err(Error::InvalidCommand(_))
        ));
        assert!(matches!(
            "frobnicate".parse::<Command>(),
            Err(Error::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_session() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.txt");
        std::fs::write(&source, b"hello").unwrap();

        let config = ClusterConfig {
            download_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let mut coord = Coordinator::new(config, MemStore::new()).unwrap();

        let script = format!(
            "upload {}\nlist\nfail 1\nfail 2\ndownload a.txt\nnodes\nbogus\nfail 9\nexit\nlist\n",
            source.display()
        );
        let mut out = Vec::new();
        Shell::new(&mut coord)
            .run(script.as_bytes(), &mut out)
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("[UPLOAD SUCCESS] File replicated to nodes: 1 2 3"));
        assert!(out.contains(" - a.txt → Nodes: 1 2 3"));
        assert!(out.contains("WARNING: File 'a.txt' has only 1 active replicas!"));
        assert!(out.contains("[DOWNLOAD SUCCESS] File downloaded from Node 3"));
        assert!(out.contains("Node 2: Failed"));
        assert!(out.contains("Error: Invalid command: bogus"));
        assert!(out.contains("Error: Invalid node ID 9"));
        // Nothing runs after exit.
        assert_eq!(out.matches("FILES IN DFS").count(), 1);

        let downloaded = std::fs::read(dir.path().join("downloaded_a.txt")).unwrap();
        assert_eq!(downloaded, b"hello");
    }

    #[test]
    fn test_invalid_utf8_line_does_not_end_session() {
        let mut coord = Coordinator::new(ClusterConfig::default(), MemStore::new()).unwrap();
        let input: &[u8] = b"nodes\n\xff\xfe\nnodes\n";
        let mut out = Vec::new();

        Shell::new(&mut coord).run(input, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("NODE STATUS:").count(), 2);
        assert!(out.contains("Error: Invalid command"));
    }

    #[test]
    fn test_availability_error_prints_hint() {
        let mut coord = Coordinator::new(ClusterConfig::default(), MemStore::new()).unwrap();
        coord.upload("a.txt", b"hello").unwrap();
        for id in 1..=3 {
            coord.fail_node(id).unwrap();
        }
        let mut out = Vec::new();

        Shell::new(&mut coord)
            .execute(Command::Download("a.txt".into()), &mut out)
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Error: All replicas of 'a.txt' are unavailable"));
        assert!(out.contains("Hint: too few active nodes"));
    }

    #[test]
    fn test_io_error_prints_retry_hint() {
        let config = ClusterConfig {
            read_fallback: false,
            ..Default::default()
        };
        let mut coord = Coordinator::new(config, MemStore::new()).unwrap();
        coord.upload("a.txt", b"hello").unwrap();
        coord.store().inject_fault(1, Fault::Fetch);
        let mut out = Vec::new();

        Shell::new(&mut coord)
            .execute(Command::Download("a.txt".into()), &mut out)
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Error: Replication I/O error on node 1"));
        assert!(out.contains("Hint: storage I/O failed"));
    }

    #[test]
    fn test_banner_shows_version() {
        let mut coord = Coordinator::new(ClusterConfig::default(), MemStore::new()).unwrap();
        let mut out = Vec::new();

        Shell::new(&mut coord).run(&b"exit\n"[..], &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(&format!("minidfs {}", crate::VERSION)));
    }

    #[test]
    fn test_upload_missing_source() {
        let dir = TempDir::new().unwrap();
        let mut coord = Coordinator::new(ClusterConfig::default(), MemStore::new()).unwrap();
        let mut out = Vec::new();

        let missing = dir.path().join("missing.txt");
        Shell::new(&mut coord)
            .execute(Command::Upload(missing), &mut out)
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Error: Source file not found"));
        assert!(coord.directory().is_empty());
    }

    #[test]
    fn test_empty_list() {
        let mut coord = Coordinator::new(ClusterConfig::default(), MemStore::new()).unwrap();
        let mut out = Vec::new();
        Shell::new(&mut coord)
            .execute(Command::List, &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "(Empty) No files stored.\n\n");
    }
}
