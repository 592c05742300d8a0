use colored::*;

use discovr_common::success;
use discovr_core::{Partition, PartitionSummary, Presenter, RunStats};

use crate::terminal::{colors, format, format::Detail, print};

/// Renders a grouping as partition headers followed by one tree per asset.
///
/// `-q` drops headers and the banner-style summary, `-qq` drops the trees as well.
pub struct TerminalPresenter {
    title: String,
    quiet: u8,
    partitions_shown: usize,
}

impl TerminalPresenter {
    pub fn new(title: impl Into<String>, quiet: u8) -> Self {
        Self {
            title: title.into(),
            quiet,
            partitions_shown: 0,
        }
    }
}

impl Presenter for TerminalPresenter {
    fn no_assets(&mut self, message: &str) {
        print::section("zero assets detected", self.quiet);
        if self.quiet == 0 {
            print::no_results();
        }
        discovr_common::info!("{message}");
    }

    fn partition(&mut self, partition: &Partition) {
        if self.partitions_shown == 0 {
            print::section(&self.title, self.quiet);
        } else {
            print::blank();
        }
        self.partitions_shown += 1;
        print::partition_bar(&partition.key, &summary_line(&partition.summary));

        if self.quiet >= 2 {
            return;
        }
        for (idx, asset) in partition.assets.iter().enumerate() {
            print::asset_tree(idx, &format::asset_title(asset), &format::asset_details(asset));
        }
    }

    fn finish(&mut self, stats: &RunStats) {
        let totals = &stats.totals;
        let assets: ColoredString = format!("{} assets", totals.total).bold().green();
        let elapsed: ColoredString = format!("{:.2}s", stats.elapsed.as_secs_f64()).bold().yellow();
        let output: ColoredString = format!("Discovery Complete: {assets} identified in {elapsed}")
            .color(colors::TEXT_DEFAULT);

        print::blank();
        if self.quiet > 0 {
            success!("{} ({})", output, summary_line(totals));
            return;
        }

        let mut rows: Vec<Detail> = vec![(
            String::from("Partitions"),
            self.partitions_shown.to_string().normal(),
        )];
        if let Some(attempted) = stats.attempted {
            rows.push((String::from("Probed"), attempted.to_string().normal()));
        }
        rows.extend(
            totals
                .by_kind
                .iter()
                .map(|(kind, count)| (kind.to_string(), count.to_string().normal())),
        );
        rows.push((String::from("High"), totals.high.to_string().color(colors::RISK_HIGH)));
        rows.push((
            String::from("Critical"),
            totals.critical.to_string().color(colors::RISK_CRITICAL),
        ));
        print::summary_table(&rows);
        print::closing_rule();
        print::centered(&output.to_string());
    }
}

fn summary_line(summary: &PartitionSummary) -> String {
    format!(
        "{} assets, {} high, {} critical",
        summary.total, summary.high, summary.critical
    )
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

    #[test]
    fn summary_counts() {
        let summary = PartitionSummary {
            total: 4,
            high: 1,
            critical: 2,
            ..Default::default()
        };
        assert_eq!(summary_line(&summary), "4 assets, 1 high, 2 critical");
    }
}
