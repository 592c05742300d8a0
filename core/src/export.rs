//! CSV and JSON export of assessed assets.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::assess::AssessedAsset;
use crate::error::ExportError;

const CSV_HEADER: [&str; 9] = [
    "Address", "Name", "OS", "Ports", "Kind", "Origin", "Partition", "Tag", "Risk",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// Parses `csv,json` style lists. Duplicates collapse.
    pub fn parse_list(s: &str) -> Result<Vec<ExportFormat>, ExportError> {
        let mut formats: Vec<ExportFormat> = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let format = part.parse()?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// `<dir>/discovr_<feature>_<timestamp>.<ext>`
pub fn export_path(dir: &Path, feature: &str, timestamp: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!("discovr_{feature}_{timestamp}.{}", format.extension()))
}

/// Writes `assets` to `path`, creating parent directories.
pub fn export(assets: &[AssessedAsset], format: ExportFormat, path: &Path) -> Result<(), ExportError> {
    let contents = match format {
        ExportFormat::Csv => to_csv(assets),
        ExportFormat::Json => to_json(assets)?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn to_json(assets: &[AssessedAsset]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(assets)?)
}

pub fn to_csv(assets: &[AssessedAsset]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));
    for asset in assets {
        let record = &asset.record;
        push_row(
            &mut out,
            [
                record.address.map(|a| a.to_string()).unwrap_or_default(),
                record.name.clone(),
                record.operating_system.clone(),
                record.ports.to_string(),
                record.kind.to_string(),
                record.origin.to_string(),
                record.partition.clone(),
                asset.tag.to_string(),
                asset.risk.to_string(),
            ],
        );
    }
    out
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let row: Vec<String> = fields.into_iter().map(|f| escape(&f)).collect();
    out.push_str(&row.join(","));
    out.push_str("\r\n");
}

/// RFC 4180: quote fields holding separators, quotes or line breaks; double inner quotes.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
