//! Labels derived from an [`AssetRecord`](super::AssetRecord) on every run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse role of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tag {
    Workstation,
    Server,
    Mobile,
    Tablet,
    Printer,
    IoT,
    Network,
    WebHost,
    Unknown,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tag::Workstation => "Workstation",
            Tag::Server => "Server",
            Tag::Mobile => "Mobile",
            Tag::Tablet => "Tablet",
            Tag::Printer => "Printer",
            Tag::IoT => "IoT",
            Tag::Network => "Network",
            Tag::WebHost => "WebHost",
            Tag::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Exposure severity. Variant order is severity order: `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Risk {
    Low,
    Medium,
    High,
    Critical,
}

impl Risk {
    pub fn is_elevated(&self) -> bool {
        matches!(self, Risk::High | Risk::Critical)
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Risk::Low => "Low",
            Risk::Medium => "Medium",
            Risk::High => "High",
            Risk::Critical => "Critical",
        };
        f.write_str(label)
    }
}
