//! Port specifications as reported by scanners and firewall rule sets.
//!
//! A scanner only ever reports single ports, cloud rules also use ranges
//! (`1000-2000`) and wildcards (`*`, `Any`, protocol `-1`).

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PortError;

const WILDCARDS: &[&str] = &["*", "any", "all", "-1"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortSpec {
    Single(u16),
    Range { start: u16, end: u16 },
    Any,
}

impl PortSpec {
    /// Builds a range, collapsing `n-n` into a single port.
    pub fn range(start: u16, end: u16) -> Self {
        let (start, end) = (start.min(end), start.max(end));
        if start == end {
            PortSpec::Single(start)
        } else {
            PortSpec::Range { start, end }
        }
    }

    pub fn bounds(&self) -> (u16, u16) {
        match *self {
            PortSpec::Single(port) => (port, port),
            PortSpec::Range { start, end } => (start, end),
            PortSpec::Any => (0, u16::MAX),
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        let (start, end) = self.bounds();
        (start..=end).contains(&port)
    }

    pub fn intersects(&self, ports: &[u16]) -> bool {
        ports.iter().any(|port| self.contains(*port))
    }

    /// True for wildcards and for ranges spanning the whole port space.
    pub fn is_unrestricted(&self) -> bool {
        match *self {
            PortSpec::Any => true,
            PortSpec::Range { start, end } => start <= 1 && end == u16::MAX,
            PortSpec::Single(_) => false,
        }
    }

    fn sort_key(&self) -> (bool, u16, u16, u8) {
        let (start, end) = self.bounds();
        let rank = match self {
            PortSpec::Single(_) => 0,
            PortSpec::Range { .. } => 1,
            PortSpec::Any => 2,
        };
        (matches!(self, PortSpec::Any), start, end, rank)
    }
}

impl Ord for PortSpec {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for PortSpec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSpec::Single(port) => write!(f, "{port}"),
            PortSpec::Range { start, end } => write!(f, "{start}-{end}"),
            PortSpec::Any => write!(f, "*"),
        }
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();

        if WILDCARDS.contains(&lower.as_str()) {
            return Ok(PortSpec::Any);
        }

        if let Some((start_str, end_str)) = trimmed.split_once('-') {
            let start = parse_port(start_str)?;
            let end = parse_port(end_str)?;
            if start > end {
                return Err(PortError::Reversed(trimmed.to_string()));
            }
            return Ok(PortSpec::range(start, end));
        }

        parse_port(trimmed).map(PortSpec::Single)
    }
}

fn parse_port(s: &str) -> Result<u16, PortError> {
    s.trim()
        .parse::<u16>()
        .map_err(|_| PortError::Invalid(s.trim().to_string()))
}

impl Serialize for PortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PortSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered set of open ports (or exposed port specs) of one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortSet(BTreeSet<PortSpec>);

impl PortSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Parses `22,80,8000-8100` (commas or semicolons).
    pub fn parse_list(s: &str) -> Result<Self, PortError> {
        let set = s
            .split([',', ';'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(PortSpec::from_str)
            .collect::<Result<PortSet, PortError>>()?;

        if set.is_empty() {
            return Err(PortError::Empty);
        }
        Ok(set)
    }

    pub fn insert(&mut self, spec: PortSpec) -> bool {
        self.0.insert(spec)
    }

    pub fn contains(&self, port: u16) -> bool {
        self.0.iter().any(|spec| spec.contains(port))
    }

    pub fn contains_any(&self, ports: &[u16]) -> bool {
        ports.iter().any(|port| self.contains(*port))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PortSpec> {
        self.0.iter()
    }

    /// Every concrete port covered by the set, ascending and without duplicates.
    pub fn expand(&self) -> Vec<u16> {
        let mut ports: BTreeSet<u16> = BTreeSet::new();
        for spec in &self.0 {
            let (start, end) = spec.bounds();
            ports.extend(start.max(1)..=end);
        }
        ports.into_iter().collect()
    }
}

impl FromIterator<PortSpec> for PortSet {
    fn from_iter<I: IntoIterator<Item = PortSpec>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromIterator<u16> for PortSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self(iter.into_iter().map(PortSpec::Single).collect())
    }
}

impl Extend<PortSpec> for PortSet {
    fn extend<I: IntoIterator<Item = PortSpec>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a PortSet {
    type Item = &'a PortSpec;
    type IntoIter = std::collections::btree_set::Iter<'a, PortSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for PortSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(PortSpec::to_string).collect();
        write!(f, "{}", joined.join(","))
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
