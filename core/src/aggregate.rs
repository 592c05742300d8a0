//! Grouping of assessed assets by partition, and the boundary to whatever renders them.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use discovr_common::model::{Kind, Risk};

use crate::assess::AssessedAsset;

pub const UNASSIGNED: &str = "unassigned";
pub const NO_ASSETS: &str = "no assets discovered";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionSummary {
    pub total: usize,
    pub by_kind: BTreeMap<Kind, usize>,
    pub high: usize,
    pub critical: usize,
}

impl PartitionSummary {
    fn count(&mut self, asset: &AssessedAsset) {
        self.total += 1;
        *self.by_kind.entry(asset.record.kind).or_default() += 1;
        match asset.risk {
            Risk::High => self.high += 1,
            Risk::Critical => self.critical += 1,
            Risk::Low | Risk::Medium => {}
        }
    }

    fn absorb(&mut self, other: &PartitionSummary) {
        self.total += other.total;
        self.high += other.high;
        self.critical += other.critical;
        for (kind, count) in &other.by_kind {
            *self.by_kind.entry(*kind).or_default() += count;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partition {
    pub key: String,
    pub assets: Vec<AssessedAsset>,
    pub summary: PartitionSummary,
}

/// Partitions keyed by their normalized name, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Grouping {
    partitions: BTreeMap<String, Partition>,
}

impl Grouping {
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn get(&self, key: &str) -> Option<&Partition> {
        self.partitions.get(&partition_key(key))
    }

    pub fn partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.values()
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssessedAsset> {
        self.partitions.values().flat_map(|p| p.assets.iter())
    }

    /// Summary over every partition.
    pub fn totals(&self) -> PartitionSummary {
        let mut totals = PartitionSummary::default();
        for partition in self.partitions.values() {
            totals.absorb(&partition.summary);
        }
        totals
    }
}

/// Trimmed and lowercased. Blank partitions share [`UNASSIGNED`].
pub fn partition_key(raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        UNASSIGNED.to_string()
    } else {
        key
    }
}

/// Every asset lands in exactly one partition. Records are moved, never altered.
pub fn group(assets: Vec<AssessedAsset>) -> Grouping {
    let mut partitions: BTreeMap<String, Partition> = BTreeMap::new();
    for asset in assets {
        let key = partition_key(&asset.record.partition);
        let partition = partitions.entry(key.clone()).or_insert_with(|| Partition {
            key,
            assets: Vec::new(),
            summary: PartitionSummary::default(),
        });
        partition.summary.count(&asset);
        partition.assets.push(asset);
    }
    Grouping { partitions }
}

/// Run-level facts handed to the presenter after the last partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub feature: String,
    pub attempted: Option<usize>,
    pub elapsed: Duration,
    pub totals: PartitionSummary,
}

/// Renders a grouping. Implemented by the terminal front end and by tests.
pub trait Presenter {
    fn no_assets(&mut self, message: &str);
    fn partition(&mut self, partition: &Partition);
    fn finish(&mut self, stats: &RunStats);
}

/// An empty grouping produces only [`Presenter::no_assets`].
pub fn present<P: Presenter + ?Sized>(grouping: &Grouping, stats: &RunStats, presenter: &mut P) {
    if grouping.is_empty() {
        presenter.no_assets(NO_ASSETS);
        return;
    }
    for partition in grouping.partitions() {
        presenter.partition(partition);
    }
    presenter.finish(stats);
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
