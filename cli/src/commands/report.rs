use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;

use discovr_common::config::Config;
use discovr_common::model::AssetRecord;
use discovr_common::success;
use discovr_core::collectors::{self, ProviderConfig};
use discovr_core::export::{self, ExportFormat};
use discovr_core::{AssessedAsset, RunStats, ScanOutcome, assess, group, present};

use crate::terminal::{presenter::TerminalPresenter, spinner::SpinnerHandle};

/// What one feature produced, before assessment.
pub struct Inventory {
    pub records: Vec<AssetRecord>,
    pub attempted: Option<usize>,
    pub elapsed: Duration,
}

impl From<ScanOutcome> for Inventory {
    fn from(outcome: ScanOutcome) -> Self {
        Self {
            records: outcome.assets,
            attempted: Some(outcome.attempted),
            elapsed: outcome.elapsed,
        }
    }
}

pub struct ReportOptions {
    pub formats: Vec<ExportFormat>,
    pub out_dir: PathBuf,
    pub timestamp: String,
}

/// Runs one provider collector behind a spinner.
pub async fn collect(config: ProviderConfig, cfg: &Config) -> Inventory {
    let spinner = SpinnerHandle::start(cfg.quiet >= 2, false);
    spinner.set_message(format!("Collecting {} inventory...", config.origin()));

    let started = Instant::now();
    let collector = config.collector();
    let records = collectors::collect(collector.as_ref()).await;
    spinner.finish_and_clear();

    Inventory {
        records,
        attempted: None,
        elapsed: started.elapsed(),
    }
}

/// Assess, group, present and export. Only export failures are errors here.
pub fn report(
    feature: &str,
    title: &str,
    inventory: Inventory,
    opts: &ReportOptions,
    cfg: &Config,
) -> anyhow::Result<()> {
    let grouping = group(assess(inventory.records));
    let stats = RunStats {
        feature: feature.to_string(),
        attempted: inventory.attempted,
        elapsed: inventory.elapsed,
        totals: grouping.totals(),
    };

    let mut presenter = TerminalPresenter::new(title, cfg.quiet);
    present(&grouping, &stats, &mut presenter);

    if grouping.is_empty() || opts.formats.is_empty() {
        return Ok(());
    }

    let assets: Vec<AssessedAsset> = grouping.assets().cloned().collect();
    for format in &opts.formats {
        let path = export::export_path(&opts.out_dir, feature, &opts.timestamp, *format);
        export::export(&assets, *format, &path)
            .with_context(|| format!("{format} export failed"))?;
        success!("Exported {} assets to {}", assets.len(), path.display());
    }
    Ok(())
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

    fn options(dir: &std::path::Path) -> ReportOptions {
        ReportOptions {
            formats: vec![ExportFormat::Csv, ExportFormat::Json],
            out_dir: dir.to_path_buf(),
            timestamp: String::from("20261016_101500"),
        }
    }

    #[test]
    fn exports_every_requested_format() {
        let dir = tempfile::tempdir().unwrap();
        let inventory = Inventory {
            records: vec![
                AssetRecord::new(Kind::Host, Origin::Network)
                    .with_address("192.168.1.10".parse().unwrap())
                    .with_name("HR-PC01")
                    .with_os("Windows 10 Pro")
                    .in_partition("192.168.1.0/24"),
            ],
            attempted: Some(254),
            elapsed: Duration::from_secs(3),
        };
        let cfg = Config {
            quiet: 2,
            ..Config::default()
        };

        report("scan", "network scan", inventory, &options(dir.path()), &cfg).unwrap();

        assert!(dir.path().join("discovr_scan_20261016_101500.csv").exists());
        assert!(dir.path().join("discovr_scan_20261016_101500.json").exists());
    }

    #[test]
    fn nothing_found_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let inventory = Inventory {
            records: Vec::new(),
            attempted: Some(2),
            elapsed: Duration::ZERO,
        };

        report("scan", "network scan", inventory, &options(dir.path()), &Config::default()).unwrap();

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
