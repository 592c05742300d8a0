use std::net::IpAddr;
use std::path::PathBuf;

const REPORT_DIR: &str = "discovr_reports";

pub struct Config {
    pub no_banner: bool,
    /// Disables reverse DNS lookups for scanned hosts.
    ///
    /// Names reported by the probing backend itself are still used.
    pub no_dns: bool,
    pub quiet: u8,
    /// Stops the key listener from putting the terminal into raw mode.
    pub disable_input: bool,
    /// Resolver used for PTR lookups. Falls back to the system resolver.
    pub dns_server: Option<IpAddr>,
    pub log_dir: PathBuf,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            no_banner: false,
            no_dns: false,
            quiet: 0,
            disable_input: false,
            dns_server: None,
            log_dir: default_report_dir().join("logs"),
            verbose: false,
        }
    }
}

/// `~/Documents/discovr_reports`, or `./discovr_reports` when no home directory is known.
pub fn default_report_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join("Documents").join(REPORT_DIR))
        .unwrap_or_else(|| PathBuf::from(REPORT_DIR))
}
