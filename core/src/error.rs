//! Error taxonomy of the core.
//!
//! [`ScanError`] is fatal and aborts a sweep before any worker starts.
//! [`CollectError`] is soft: the caller logs it and treats the provider as empty.

use std::path::PathBuf;

use discovr_common::error::{PortError, RangeError};
use discovr_common::model::Origin;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("malformed range: {0}")]
    Range(#[from] RangeError),
    #[error("malformed port list: {0}")]
    Ports(#[from] PortError),
    #[error("worker count must be at least 1")]
    NoWorkers,
}

/// A document source could not produce a vendor document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("running `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    Command {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("{provider}: fetching {document} failed: {source}")]
    Fetch {
        provider: Origin,
        document: &'static str,
        #[source]
        source: FetchError,
    },
    #[error("{provider}: {document} is malformed: {source}")]
    Decode {
        provider: Origin,
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{provider}: {reason}")]
    Config { provider: Origin, reason: String },
}

impl CollectError {
    pub fn provider(&self) -> Origin {
        match self {
            CollectError::Fetch { provider, .. }
            | CollectError::Decode { provider, .. }
            | CollectError::Config { provider, .. } => *provider,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serializing assets: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown export format '{0}', expected csv or json")]
    UnknownFormat(String),
}
