//! Active Directory computers, read as LDIF from `ldapsearch`.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::debug;

use discovr_common::model::{AssetRecord, Kind, Origin};

use super::{Collector, DocumentSource, Query};
use crate::error::CollectError;

const LDAPSEARCH: &str = "ldapsearch";
const COMPUTER_FILTER: &str = "(objectClass=computer)";
const ATTRIBUTES: &[&str] = &["cn", "dNSHostName", "operatingSystem", "operatingSystemVersion"];
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

pub struct DirectoryCollector {
    source: Arc<dyn DocumentSource>,
    domain: String,
    user: Option<String>,
    password: Option<String>,
    resolve: bool,
}

impl DirectoryCollector {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        domain: String,
        user: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            source,
            domain,
            user,
            password,
            resolve: true,
        }
    }

    /// Skips the DNS lookup of each computer's address.
    pub fn without_resolution(mut self) -> Self {
        self.resolve = false;
        self
    }

    fn query(&self) -> Query {
        Query::new("ad_computers.ldif", LDAPSEARCH)
            .args(["-LLL", "-x", "-H"])
            .arg(format!("ldap://{}", self.domain))
            .opt("-D", self.user.as_deref())
            .opt("-w", self.password.as_deref())
            .arg("-b")
            .arg(base_dn(&self.domain))
            .arg(COMPUTER_FILTER)
            .args(ATTRIBUTES.iter().copied())
    }
}

#[async_trait]
impl Collector for DirectoryCollector {
    fn origin(&self) -> Origin {
        Origin::ActiveDirectory
    }

    async fn collect(&self) -> Result<Vec<AssetRecord>, CollectError> {
        if self.domain.trim().is_empty() {
            return Err(CollectError::Config {
                provider: Origin::ActiveDirectory,
                reason: String::from("a domain is required"),
            });
        }

        let bytes = self
            .source
            .fetch(&self.query())
            .await
            .map_err(|source| CollectError::Fetch {
                provider: Origin::ActiveDirectory,
                document: "computer objects",
                source,
            })?;
        let text = String::from_utf8_lossy(&bytes);

        let computers: Vec<Computer> = parse_ldif(&text)
            .iter()
            .filter_map(Computer::from_entry)
            .collect();

        let addresses = if self.resolve {
            resolve_all(&computers).await
        } else {
            vec![None; computers.len()]
        };

        Ok(computers
            .into_iter()
            .zip(addresses)
            .map(|(computer, address)| computer.into_record(&self.domain, address))
            .collect())
    }
}

struct Computer {
    hostname: String,
    os: String,
}

impl Computer {
    fn from_entry(entry: &BTreeMap<String, String>) -> Option<Self> {
        let hostname = entry
            .get("dnshostname")
            .or_else(|| entry.get("cn"))
            .filter(|name| !name.trim().is_empty())?
            .trim()
            .to_string();
        let os = [entry.get("operatingsystem"), entry.get("operatingsystemversion")]
            .into_iter()
            .flatten()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Some(Self { hostname, os })
    }

    fn into_record(self, domain: &str, address: Option<IpAddr>) -> AssetRecord {
        let mut record = AssetRecord::new(Kind::DirectoryComputer, Origin::ActiveDirectory)
            .with_name(self.hostname)
            .with_os(self.os)
            .in_partition(domain);
        if let Some(address) = address {
            record = record.with_address(address);
        }
        record
    }
}

/// Looks every computer up concurrently. Failures and timeouts leave the address empty.
async fn resolve_all(computers: &[Computer]) -> Vec<Option<IpAddr>> {
    let mut addresses: Vec<Option<IpAddr>> = vec![None; computers.len()];
    let mut set: JoinSet<(usize, Option<IpAddr>)> = JoinSet::new();
    for (index, computer) in computers.iter().enumerate() {
        let hostname = computer.hostname.clone();
        set.spawn(async move { (index, lookup(&hostname).await) });
    }
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, address)) => addresses[index] = address,
            Err(e) => debug!("lookup task failed: {e}"),
        }
    }
    addresses
}

async fn lookup(hostname: &str) -> Option<IpAddr> {
    match timeout(LOOKUP_TIMEOUT, tokio::net::lookup_host((hostname, 0))).await {
        Ok(Ok(mut addrs)) => addrs.next().map(|addr| addr.ip()),
        Ok(Err(e)) => {
            debug!("{hostname} did not resolve: {e}");
            None
        }
        Err(_elapsed) => {
            debug!("{hostname} lookup timed out");
            None
        }
    }
}

/// `corp.example.com` → `DC=corp,DC=example,DC=com`.
pub fn base_dn(domain: &str) -> String {
    domain
        .trim()
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| format!("DC={part}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Minimal LDIF reader: blank-line separated entries, folded continuation lines,
/// attribute names lowercased, first value wins. Base64 values are skipped.
pub fn parse_ldif(text: &str) -> Vec<BTreeMap<String, String>> {
    let mut entries: Vec<BTreeMap<String, String>> = Vec::new();
    let mut current: BTreeMap<String, String> = BTreeMap::new();
    let mut logical: Vec<String> = Vec::new();

    for line in text.lines() {
        if let Some(folded) = line.strip_prefix(' ') {
            if let Some(last) = logical.last_mut() {
                last.push_str(folded);
            }
            continue;
        }
        if line.trim().is_empty() {
            flush(&mut logical, &mut current);
            if !current.is_empty() {
                entries.push(std::mem::take(&mut current));
            }
            continue;
        }
        logical.push(line.to_string());
    }
    flush(&mut logical, &mut current);
    if !current.is_empty() {
        entries.push(current);
    }
    entries
}

fn flush(lines: &mut Vec<String>, entry: &mut BTreeMap<String, String>) {
    for line in lines.drain(..) {
        if line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if value.starts_with(':') || value.starts_with('<') {
            debug!("skipping encoded LDIF value for {name}");
            continue;
        }
        entry
            .entry(name.trim().to_ascii_lowercase())
            .or_insert_with(|| value.trim().to_string());
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
