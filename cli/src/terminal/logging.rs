use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use colored::*;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::{EnvFilter, filter_fn};
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use discovr_common::config::Config;

use crate::terminal::spinner::SpinnerWriter;

/// Target of presentation lines. The console renders them verbatim, the log file skips them.
pub const PRINT_TARGET: &str = "discovr::print";

const CRATES: &[&str] = &["discovr_cli", "discovr_core", "discovr_common"];

#[derive(Debug, Default)]
struct EventFields {
    message: Option<String>,
    raw_msg: Option<String>,
    status: Option<String>,
    extra: Vec<String>,
}

impl EventFields {
    fn line(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        parts.extend(self.extra.iter().cloned());
        parts.join(" ")
    }

    fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "raw_msg" => self.raw_msg = Some(value.to_string()),
            "status" => self.status = Some(value.to_string()),
            name => self.extra.push(format!("{name}={value}")),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{value:?}")),
            "raw_msg" => self.raw_msg = Some(format!("{value:?}")),
            "status" => self.status = Some(format!("{value:?}")),
            name => self.extra.push(format!("{name}={value:?}")),
        }
    }
}

pub struct DiscovrFormatter;

impl<S, N> FormatEvent<S, N> for DiscovrFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let mut fields = EventFields::default();
        event.record(&mut fields);

        if meta.target() == PRINT_TARGET {
            return writeln!(writer, "{}", fields.raw_msg.unwrap_or_default());
        }

        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) = match *meta.level() {
            Level::TRACE => ("[ ]", |s| s.dimmed()),
            Level::DEBUG => ("[?]", |s| s.blue()),
            Level::INFO => ("[+]", |s| s.green().bold()),
            Level::WARN => ("[*]", |s| s.yellow().bold()),
            Level::ERROR => ("[-]", |s| s.red().bold()),
        };

        write!(writer, "{} ", color_func(symbol.into()))?;

        if fields.is_success() {
            writeln!(writer, "{}", fields.line().green())
        } else {
            writeln!(writer, "{}", fields.line())
        }
    }
}

/// Subscriber for one run: colored console output above the spinner plus a plain log file.
///
/// Dropping the session reports where the log went.
pub struct LogSession {
    path: Option<PathBuf>,
}

impl LogSession {
    pub fn start(cfg: &Config, feature: &str, timestamp: &str) -> anyhow::Result<Self> {
        let level = if cfg.verbose { "debug" } else { "info" };
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
            EnvFilter::new(format!("info,{}", directives.join(",")))
        });

        let console_layer = tracing_subscriber::fmt::layer()
            .event_format(DiscovrFormatter)
            .with_writer(|| SpinnerWriter);

        let (file_layer, path, file_error) = match open_log_file(&cfg.log_dir, feature, timestamp) {
            Ok((file, path)) => {
                let layer = tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(filter_fn(|meta| meta.target() != PRINT_TARGET));
                (Some(layer), Some(path), None)
            }
            Err(e) => (None, None, Some(e)),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .context("failed to install the log subscriber")?;

        if let Some(e) = file_error {
            discovr_common::warn!("Logging to console only: {e:#}");
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            discovr_common::info!("Log written to {}", path.display());
        }
    }
}

pub fn log_file_path(dir: &Path, feature: &str, timestamp: &str) -> PathBuf {
    dir.join(format!("discovr_{feature}_{timestamp}.log"))
}

fn open_log_file(dir: &Path, feature: &str, timestamp: &str) -> anyhow::Result<(File, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let path = log_file_path(dir, feature, timestamp);
    let file = File::create(&path).with_context(|| format!("cannot create {}", path.display()))?;
    Ok((file, path))
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
    fn log_file_is_named_after_feature_and_time() {
        let path = log_file_path(Path::new("/tmp/logs"), "scan", "20261016_101500");
        assert_eq!(path, PathBuf::from("/tmp/logs/discovr_scan_20261016_101500.log"));
    }

    #[test]
    fn line_joins_message_and_extra_fields() {
        let fields = EventFields {
            message: Some(String::from("probe failed")),
            raw_msg: None,
            status: Some(String::from("success")),
            extra: vec![String::from("host=10.0.0.1")],
        };
        assert_eq!(fields.line(), "probe failed host=10.0.0.1");
        assert!(fields.is_success());
        assert!(!EventFields::default().is_success());
    }

    #[test]
    fn log_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs");
        let (_file, path) = open_log_file(&nested, "cloud_aws", "20261016_101500").unwrap();
        assert!(path.exists());
    }
}
