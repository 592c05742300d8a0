//! Tags and scores a whole result set in parallel.

use rayon::prelude::*;
use serde::Serialize;

use discovr_common::model::{AssetRecord, Risk, Tag};

use crate::{classify, risk};

/// A record with the labels derived for this run. The record itself is untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessedAsset {
    #[serde(flatten)]
    pub record: AssetRecord,
    pub tag: Tag,
    pub risk: Risk,
}

impl AssessedAsset {
    pub fn new(record: AssetRecord) -> Self {
        let tag = classify::classify(&record);
        let risk = risk::assess(&record, tag);
        Self { record, tag, risk }
    }
}

/// Input order is preserved.
pub fn assess(records: Vec<AssetRecord>) -> Vec<AssessedAsset> {
    records.into_par_iter().map(AssessedAsset::new).collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use discovr_common::model::{Kind, Origin};

    #[test]
    fn labels_every_record_in_order() {
        let records: Vec<AssetRecord> = (0..500)
            .map(|i| {
                let name = if i % 2 == 0 { "iot-camera" } else { "HR-PC01" };
                let os = if i % 2 == 0 { "Unknown" } else { "Windows 10 Pro" };
                AssetRecord::new(Kind::Host, Origin::Network)
                    .with_name(format!("{name}-{i}"))
                    .with_os(os)
            })
            .collect();

        let assessed = assess(records.clone());
        assert_eq!(assessed.len(), records.len());
        for (i, asset) in assessed.iter().enumerate() {
            assert_eq!(asset.record, records[i]);
            if i % 2 == 0 {
                assert_eq!((asset.tag, asset.risk), (Tag::IoT, Risk::High));
            } else {
                assert_eq!((asset.tag, asset.risk), (Tag::Workstation, Risk::Medium));
            }
        }
    }

    #[test]
    fn empty_input() {
        assert!(assess(Vec::new()).is_empty());
    }
}
