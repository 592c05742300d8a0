//! Inventory collectors for cloud providers and directory services.
//!
//! Every provider is one [`Collector`]: it reads the vendor's own documents through
//! a [`DocumentSource`] and translates them into [`AssetRecord`]s. Attributes that do
//! not fit the canonical record go into its extension map.
//!
//! A failing collector never takes the run down. [`collect_all`] logs the error and
//! counts the provider as having produced nothing.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use discovr_common::model::{AssetRecord, Origin, reconcile};
use discovr_common::{info, success};

use crate::error::CollectError;

pub mod aws;
pub mod azure;
pub mod directory;
pub mod gcp;
pub mod source;

pub use source::{DocumentSource, Query, SnapshotDir, VendorCli};

#[async_trait]
pub trait Collector: Send + Sync {
    fn origin(&self) -> Origin;

    async fn collect(&self) -> Result<Vec<AssetRecord>, CollectError>;
}

/// Where provider documents come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Run the vendor's CLI.
    Live,
    /// Read previously exported documents from a directory.
    Snapshot(PathBuf),
}

impl SourceConfig {
    fn open(&self) -> Arc<dyn DocumentSource> {
        match self {
            SourceConfig::Live => Arc::new(VendorCli::new()),
            SourceConfig::Snapshot(dir) => Arc::new(SnapshotDir::new(dir)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    Aws {
        profile: Option<String>,
        region: Option<String>,
        source: SourceConfig,
    },
    Azure {
        subscription: String,
        source: SourceConfig,
    },
    Gcp {
        project: String,
        zone: Option<String>,
        source: SourceConfig,
    },
    ActiveDirectory {
        domain: String,
        user: Option<String>,
        password: Option<String>,
        resolve: bool,
        source: SourceConfig,
    },
}

impl ProviderConfig {
    pub fn origin(&self) -> Origin {
        match self {
            ProviderConfig::Aws { .. } => Origin::Aws,
            ProviderConfig::Azure { .. } => Origin::Azure,
            ProviderConfig::Gcp { .. } => Origin::Gcp,
            ProviderConfig::ActiveDirectory { .. } => Origin::ActiveDirectory,
        }
    }

    /// Builds the collector for this provider.
    pub fn collector(&self) -> Box<dyn Collector> {
        match self {
            ProviderConfig::Aws { profile, region, source } => Box::new(aws::AwsCollector::new(
                source.open(),
                profile.clone(),
                region.as_deref(),
            )),
            ProviderConfig::Azure { subscription, source } => Box::new(
                azure::AzureCollector::new(source.open(), subscription.clone()),
            ),
            ProviderConfig::Gcp { project, zone, source } => Box::new(gcp::GcpCollector::new(
                source.open(),
                project.clone(),
                zone.clone(),
            )),
            ProviderConfig::ActiveDirectory {
                domain,
                user,
                password,
                resolve,
                source,
            } => {
                let collector = directory::DirectoryCollector::new(
                    source.open(),
                    domain.clone(),
                    user.clone(),
                    password.clone(),
                );
                if *resolve {
                    Box::new(collector)
                } else {
                    Box::new(collector.without_resolution())
                }
            }
        }
    }
}

/// Runs one provider. Failure is logged and yields no assets.
pub async fn collect(collector: &dyn Collector) -> Vec<AssetRecord> {
    let origin = collector.origin();
    info!("Collecting {origin} inventory...");
    match collector.collect().await {
        Ok(records) => {
            let records = reconcile(records);
            success!("{origin}: {} assets collected", records.len());
            records
        }
        Err(e) => {
            error!("{origin} collection failed: {e}");
            Vec::new()
        }
    }
}

/// Runs every provider in turn. Records are reconciled per provider, never across.
pub async fn collect_all(collectors: &[Box<dyn Collector>]) -> Vec<AssetRecord> {
    let mut records: Vec<AssetRecord> = Vec::new();
    for collector in collectors {
        records.extend(collect(collector.as_ref()).await);
    }
    records
}

/// Fetches and decodes one vendor document.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    source: &dyn DocumentSource,
    provider: Origin,
    document: &'static str,
    query: &Query,
) -> Result<T, CollectError> {
    let bytes = source
        .fetch(query)
        .await
        .map_err(|source| CollectError::Fetch {
            provider,
            document,
            source,
        })?;
    debug!("{provider}: {document} is {} bytes", bytes.len());
    serde_json::from_slice(&bytes).map_err(|source| CollectError::Decode {
        provider,
        document,
        source,
    })
}

/// Like [`fetch_json`], for documents the provider can do without.
pub(crate) async fn fetch_optional<T: DeserializeOwned + Default>(
    source: &dyn DocumentSource,
    provider: Origin,
    document: &'static str,
    query: &Query,
) -> T {
    match fetch_json(source, provider, document, query).await {
        Ok(value) => value,
        Err(e) => {
            discovr_common::warn!("{e}, continuing without it");
            T::default()
        }
    }
}

/// Per-resource enrichment: failure is expected (missing permission, feature never
/// configured) and only logged at debug level. Empty output decodes as the default.
pub(crate) async fn fetch_detail<T: DeserializeOwned + Default>(
    source: &dyn DocumentSource,
    provider: Origin,
    document: &'static str,
    query: &Query,
) -> Option<T> {
    let bytes = match source.fetch(query).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("{provider}: {document}: {e}");
            return None;
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Some(T::default());
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("{provider}: {document} is malformed: {e}");
            None
        }
    }
}

/// Last path segment of a provider resource id or URL.
pub(crate) fn last_segment(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
