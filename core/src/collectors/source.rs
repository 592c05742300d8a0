//! Where vendor documents are read from.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::FetchError;

/// One vendor document: the snapshot file it is exported to, and the command that
/// produces it live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub snapshot: String,
    pub program: String,
    pub args: Vec<String>,
}

impl Query {
    pub fn new(snapshot: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            snapshot: snapshot.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends `flag value` only when a value is present.
    pub fn opt(self, flag: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.arg(flag).arg(value),
            None => self,
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch(&self, query: &Query) -> Result<Vec<u8>, FetchError>;
}

/// A directory of previously exported documents, one file per query.
#[derive(Debug, Clone)]
pub struct SnapshotDir {
    root: PathBuf,
}

impl SnapshotDir {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl DocumentSource for SnapshotDir {
    async fn fetch(&self, query: &Query) -> Result<Vec<u8>, FetchError> {
        let path = self.root.join(&query.snapshot);
        debug!("reading snapshot {}", path.display());
        tokio::fs::read(&path)
            .await
            .map_err(|source| FetchError::Read { path, source })
    }
}

/// Runs the vendor's own command-line tool and captures stdout.
#[derive(Debug, Clone, Default)]
pub struct VendorCli;

impl VendorCli {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentSource for VendorCli {
    async fn fetch(&self, query: &Query) -> Result<Vec<u8>, FetchError> {
        debug!("running {}", query.command_line());
        let output = Command::new(&query.program)
            .args(&query.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| FetchError::Spawn {
                program: query.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(FetchError::Command {
                program: query.command_line(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
