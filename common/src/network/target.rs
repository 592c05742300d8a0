//! # Scan Target Model
//!
//! Defines the range expressions a sweep accepts.
//!
//! A target can be:
//! * A single IP address (host).
//! * An IPv4 range (e.g., `192.168.1.1-100`).
//! * A CIDR block (e.g., `192.168.1.0/24`), host bits allowed.
//! * A comma-separated list of any of the above.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::error::RangeError;
use crate::network::range::{self, IpCollection, Ipv4Range};

/// Represents a distinct target to be scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Scan a single specific host.
    Host { target_addr: IpAddr },
    /// Scan a range of IPv4 addresses.
    Range { ipv4_range: Ipv4Range },
    /// Holds a list of different targets
    Multi { targets: Vec<Target> },
}

impl FromStr for Target {
    type Err = RangeError;

    /// Parses a string into a `Target`.
    ///
    /// Supported formats:
    /// * **Host**: Single IPv4/IPv6 address (e.g., "192.168.1.5").
    /// * **Range**: "Start-End" (e.g., "192.168.1.1-50", "192.168.1.1-192.168.1.50").
    /// * **CIDR**: "Network/Prefix" (e.g., "192.168.1.0/24").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RangeError::Empty);
        }

        if s.contains(',') {
            return parse_commas(s);
        }

        if let Some(target) = parse_host(s) {
            return Ok(target);
        }

        if let Some(target) = parse_ip_range(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_cidr_range(s)? {
            return Ok(target);
        }

        Err(RangeError::Unrecognized(s.to_string()))
    }
}

impl Target {
    /// Expands the target into the concrete address set.
    pub fn to_collection(&self) -> IpCollection {
        let mut collection = IpCollection::new();
        resolve_target(self, &mut collection);
        collection
    }
}

/// This prevents code duplication between single-target and multi-target expansion.
fn resolve_target(target: &Target, collection: &mut IpCollection) {
    match target {
        Target::Host { target_addr } => collection.add_single(*target_addr),
        Target::Range { ipv4_range } => collection.add_range(*ipv4_range),
        Target::Multi { targets } => {
            for target in targets {
                resolve_target(target, collection);
            }
        }
    }
}

/// Parses a comma-separated list of targets (e.g., "192.168.1.5, 10.0.0.1-50").
pub fn parse_commas(s: &str) -> Result<Target, RangeError> {
    let mut targets = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        targets.push(Target::from_str(part)?);
    }

    if targets.is_empty() {
        return Err(RangeError::Empty);
    }

    Ok(Target::Multi { targets })
}

/// Parses a single IP address.
fn parse_host(s: &str) -> Option<Target> {
    s.parse::<IpAddr>()
        .ok()
        .map(|target_addr| Target::Host { target_addr })
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
fn parse_ip_range(s: &str) -> Result<Option<Target>, RangeError> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start_addr = start_str
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| RangeError::Address(start_str.to_string()))?;

    let end_addr = parse_range_end_addr(end_str.trim(), &start_addr)?;

    if u32::from(start_addr) > u32::from(end_addr) {
        return Err(RangeError::Reversed {
            start: start_addr,
            end: end_addr,
        });
    }

    let ipv4_range = Ipv4Range::new(start_addr, end_addr);
    Ok(Some(Target::Range { ipv4_range }))
}

/// Helper to parse the end address of a range.
///
/// Handles abbreviated forms like "192.168.1.1-50" (implies 192.168.1.50)
/// and full forms like "192.168.1.1-192.168.1.255".
fn parse_range_end_addr(end_str: &str, start_addr: &Ipv4Addr) -> Result<Ipv4Addr, RangeError> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    let range_end = |reason: &str| RangeError::RangeEnd {
        input: end_str.to_string(),
        reason: reason.to_string(),
    };

    if end_str.is_empty() {
        return Err(range_end("end of range cannot be empty"));
    }

    let mut end_octets = start_addr.octets();
    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| range_end(&e.to_string()))?;

    if partial_octets.len() > 4 {
        return Err(range_end("too many octets"));
    }

    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses CIDR notation like "192.168.1.0/24".
fn parse_cidr_range(s: &str) -> Result<Option<Target>, RangeError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let ipv4_addr = ip_str
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| RangeError::Address(ip_str.to_string()))?;

    let prefix = prefix_str
        .trim()
        .parse::<u8>()
        .map_err(|_| RangeError::Prefix(prefix_str.to_string()))?;

    let ipv4_range = range::cidr_range(ipv4_addr, prefix)?;

    Ok(Some(Target::Range { ipv4_range }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
