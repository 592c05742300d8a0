//! Discovery and assessment engine.
//!
//! Records come from [`scanner`] or [`collectors`], are labelled by [`classify`] and
//! [`risk`] (together in [`assess`]), grouped by [`aggregate`] and written by [`export`].

pub mod aggregate;
pub mod assess;
pub mod classify;
pub mod collectors;
pub mod error;
pub mod export;
pub mod risk;
pub mod scanner;

pub use aggregate::{Grouping, Partition, PartitionSummary, Presenter, RunStats, group, present};
pub use assess::{AssessedAsset, assess};
pub use classify::classify;
pub use scanner::{HostProber, ProbeMode, ProbeReport, ScanControl, ScanOutcome, ScanRequest, Scanner};
