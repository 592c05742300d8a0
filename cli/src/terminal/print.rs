use colored::*;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::format::Detail;
use crate::terminal::{colors, logging::PRINT_TARGET};

pub const TOTAL_WIDTH: usize = 64;

/// Presentation line. Goes to the console only, never to the log file.
pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn blank() {
    print("");
}

pub fn banner(no_banner: bool, q_level: u8) {
    if no_banner || q_level > 0 {
        return;
    }

    let title = format!("⟦ DISCOVR v{} ⟧", env!("CARGO_PKG_VERSION"));
    let pad = "═".repeat(TOTAL_WIDTH.saturating_sub(title.width()) / 2);
    print(&format!(
        "{}{}{}",
        pad.color(colors::SEPARATOR),
        title.color(colors::PRIMARY).bold(),
        pad.color(colors::SEPARATOR)
    ));
    centered(&"asset discovery and exposure triage".color(colors::SEPARATOR).to_string());
}

/// `──── ⟦ TITLE ⟧ ────`, hidden from `-q` on.
pub fn section(title: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }

    let label = format!("⟦ {} ⟧", title.to_uppercase());
    let fill = TOTAL_WIDTH.saturating_sub(label.width());
    let left = "─".repeat(fill / 2);
    let right = "─".repeat(fill - fill / 2);
    print(&format!(
        "{}{}{}",
        left.color(colors::SEPARATOR),
        label.color(colors::PRIMARY),
        right.color(colors::SEPARATOR)
    ));
}

/// Partition header: a bar, the partition key and its counts.
pub fn partition_bar(key: &str, counts: &str) {
    print(&format!(
        "{} {} {}",
        "▌".color(colors::PRIMARY),
        key.color(colors::PRIMARY).bold(),
        counts.color(colors::SEPARATOR)
    ));
}

/// One asset as `[idx] title` followed by its details as a one-level tree.
pub fn asset_tree(idx: usize, title: &str, details: &[Detail]) {
    print(&format!(
        "{}{}{} {}",
        "[".color(colors::SEPARATOR),
        idx.to_string().color(colors::ACCENT),
        "]".color(colors::SEPARATOR),
        title.color(colors::PRIMARY)
    ));

    let key_width = details.iter().map(|(key, _)| key.width()).max().unwrap_or(0);
    for (i, (key, value)) in details.iter().enumerate() {
        let branch = if i + 1 == details.len() { "└─" } else { "├─" };
        print(&format!(
            " {} {}{}{} {}",
            branch.color(colors::SEPARATOR),
            key.color(colors::TEXT_DEFAULT),
            dots(key, key_width).color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        ));
    }
}

/// `> key.....: value` rows, dots aligned on the widest key.
pub fn summary_table(rows: &[Detail]) {
    let key_width = rows.iter().map(|(key, _)| key.width()).max().unwrap_or(0);
    for (key, value) in rows {
        print(&format!(
            "{} {}{}{} {}",
            ">".color(colors::SEPARATOR),
            key.color(colors::PRIMARY),
            dots(key, key_width + 1).color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        ));
    }
}

/// Leader that pads `key` to `width` display columns.
fn dots(key: &str, width: usize) -> String {
    ".".repeat(width.saturating_sub(key.width()))
}

pub fn centered(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{space}{msg}"));
}

pub fn no_results() {
    let inner = TOTAL_WIDTH - 2;
    let text = "nothing answered, nothing collected";
    let pad = inner.saturating_sub(text.width());
    let edge = "│".color(colors::SEPARATOR);

    print(&format!("╭{}╮", "─".repeat(inner)).color(colors::SEPARATOR).to_string());
    print(&format!(
        "{edge}{}{}{}{edge}",
        " ".repeat(pad / 2),
        text.red().bold(),
        " ".repeat(pad - pad / 2)
    ));
    print(&format!("╰{}╯", "─".repeat(inner)).color(colors::SEPARATOR).to_string());
}

pub fn closing_rule() {
    print(&"═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR).to_string());
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
