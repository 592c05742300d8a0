//! Probing through an external `nmap` binary.
//!
//! nmap runs once per host with grepable output on stdout, which is parsed into a
//! [`ProbeReport`]. A host nmap reports as down, or does not mention, is absent.

use std::net::IpAddr;
use std::process::Stdio;

use anyhow::{Context, ensure};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use discovr_common::model::{PortSet, PortSpec};

use super::{HostProber, ProbeMode, ProbeReport};

const NMAP: &str = "nmap";

/// How nmap resolves host names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameLookup {
    #[default]
    System,
    Disabled,
    Server(IpAddr),
}

pub struct NmapProber {
    program: String,
    lookup: NameLookup,
}

impl Default for NmapProber {
    fn default() -> Self {
        Self::new()
    }
}

impl NmapProber {
    pub fn new() -> Self {
        Self::with_program(NMAP)
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            lookup: NameLookup::System,
        }
    }

    pub fn with_lookup(mut self, lookup: NameLookup) -> Self {
        self.lookup = lookup;
        self
    }

    /// Whether the binary can be started at all.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|status| status.success())
    }
}

#[async_trait]
impl HostProber for NmapProber {
    async fn probe(&self, addr: IpAddr, mode: &ProbeMode) -> anyhow::Result<Option<ProbeReport>> {
        let args = nmap_args(addr, mode, self.lookup);
        debug!("running {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("starting {}", self.program))?;

        ensure!(
            output.status.success(),
            "{} exited with {}: {}",
            self.program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_grepable(&stdout, addr))
    }

    fn name(&self) -> &'static str {
        NMAP
    }
}

fn nmap_args(addr: IpAddr, mode: &ProbeMode, lookup: NameLookup) -> Vec<String> {
    let mut args: Vec<String> = vec!["-oG".into(), "-".into(), "-T4".into()];
    if addr.is_ipv6() {
        args.push("-6".into());
    }
    match lookup {
        NameLookup::System => {}
        NameLookup::Disabled => args.push("-n".into()),
        NameLookup::Server(server) => {
            args.push("--dns-servers".into());
            args.push(server.to_string());
        }
    }
    match mode {
        ProbeMode::Connect(ports) => {
            args.push("-sT".into());
            args.push("-p".into());
            args.push(port_argument(ports));
        }
        ProbeMode::Fingerprint => args.push("-O".into()),
    }
    args.push(addr.to_string());
    args
}

fn port_argument(ports: &PortSet) -> String {
    if ports.iter().any(PortSpec::is_unrestricted) {
        return String::from("1-65535");
    }
    ports
        .iter()
        .map(|spec| match spec {
            PortSpec::Single(port) => port.to_string(),
            PortSpec::Range { start, end } => format!("{start}-{end}"),
            PortSpec::Any => String::from("1-65535"),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses `nmap -oG` output, keeping only lines about `addr`.
///
/// nmap splits one host over several `Host:` lines (status, ports, OS), so facts
/// are merged across them.
pub fn parse_grepable(output: &str, addr: IpAddr) -> Option<ProbeReport> {
    let mut report = ProbeReport::new(addr);
    let mut seen = false;

    for line in output.lines() {
        let Some(rest) = line.strip_prefix("Host:") else {
            continue;
        };
        let mut fields = rest.split('\t');
        let Some(head) = fields.next() else {
            continue;
        };
        let (host_ip, hostname) = split_host_field(head);
        if host_ip.parse::<IpAddr>().ok() != Some(addr) {
            continue;
        }
        if report.hostname.is_none() {
            report.hostname = hostname;
        }

        for field in fields {
            let field = field.trim();
            if let Some(status) = field.strip_prefix("Status:") {
                if status.trim().eq_ignore_ascii_case("down") {
                    return None;
                }
                seen = true;
            } else if let Some(ports) = field.strip_prefix("Ports:") {
                seen = true;
                report.open_ports.extend(open_tcp_ports(ports));
            } else if let Some(os) = field.strip_prefix("OS:") {
                seen = true;
                if let Some(best) = os.split(" | ").map(str::trim).find(|m| !m.is_empty()) {
                    report.os_match = Some(best.to_string());
                }
            }
        }
    }

    seen.then_some(report)
}

fn split_host_field(head: &str) -> (&str, Option<String>) {
    let head = head.trim();
    match head.split_once(' ') {
        Some((ip, name)) => {
            let name = name.trim().trim_start_matches('(').trim_end_matches(')').trim();
            (ip, (!name.is_empty()).then(|| name.to_string()))
        }
        None => (head, None),
    }
}

fn open_tcp_ports(entries: &str) -> impl Iterator<Item = u16> + '_ {
    entries.split(',').filter_map(|entry| {
        let mut parts = entry.trim().split('/');
        let port: u16 = parts.next()?.trim().parse().ok()?;
        let state = parts.next()?;
        let protocol = parts.next()?;
        (state == "open" && protocol == "tcp").then_some(port)
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
