use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

use crate::error::RangeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    pub fn len(&self) -> usize {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        end.saturating_sub(start) as usize + usize::from(start <= end)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.start_addr <= addr && addr <= self.end_addr
    }

    pub fn to_iter(&self) -> impl Iterator<Item = IpAddr> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(|ip| IpAddr::V4(Ipv4Addr::from(ip)))
    }

    fn bounds(&self) -> (u64, u64) {
        (
            u64::from(u32::from(self.start_addr)),
            u64::from(u32::from(self.end_addr)),
        )
    }
}

/// Usable host range of a CIDR block.
///
/// Host bits in `ip` are ignored. Network and broadcast addresses are stripped for
/// prefixes up to /30; /31 and /32 blocks are returned whole.
pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> Result<Ipv4Range, RangeError> {
    let network = pnet::ipnetwork::Ipv4Network::new(ip, prefix)
        .map_err(|_| RangeError::Prefix(prefix.to_string()))?;
    let net_u32: u32 = u32::from(network.network());
    let broadcast_u32: u32 = u32::from(network.broadcast());

    if prefix >= 31 {
        return Ok(Ipv4Range::new(network.network(), network.broadcast()));
    }

    let start_ip = Ipv4Addr::from(net_u32.saturating_add(1));
    let end_ip = Ipv4Addr::from(broadcast_u32.saturating_sub(1));
    Ok(Ipv4Range::new(start_ip, end_ip))
}

/// The concrete address set of a scan.
///
/// Ranges are never expanded up front. [`IpCollection::addresses`] yields them one
/// address at a time and [`IpCollection::len`] counts them arithmetically.
#[derive(Debug, Clone, Default)]
pub struct IpCollection {
    pub singles: Vec<IpAddr>,
    pub ranges: Vec<Ipv4Range>,
}

impl IpCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_single(&mut self, addr: IpAddr) {
        self.singles.push(addr);
    }

    pub fn add_range(&mut self, range: Ipv4Range) {
        self.ranges.push(range);
    }

    /// Distinct addresses, singles first, each range in ascending order.
    pub fn addresses(&self) -> Addresses {
        Addresses::new(self.singles.clone(), self.ranges.clone())
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        let mut spans: Vec<(u64, u64)> = self
            .ranges
            .iter()
            .filter(|range| !range.is_empty())
            .map(Ipv4Range::bounds)
            .collect();
        spans.sort_unstable();

        let mut merged: Vec<(u64, u64)> = Vec::with_capacity(spans.len());
        for (start, end) in spans {
            match merged.last_mut() {
                Some((_, last_end)) if start <= *last_end + 1 => *last_end = (*last_end).max(end),
                _ => merged.push((start, end)),
            }
        }
        let in_ranges: u64 = merged.iter().map(|(start, end)| end - start + 1).sum();

        let singles: HashSet<&IpAddr> = self.singles.iter().collect();
        let outside = singles
            .into_iter()
            .filter(|addr| match addr {
                IpAddr::V4(v4) => !self.ranges.iter().any(|range| range.contains(*v4)),
                IpAddr::V6(_) => true,
            })
            .count();

        usize::try_from(in_ranges).unwrap_or(usize::MAX).saturating_add(outside)
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.ranges.iter().all(Ipv4Range::is_empty)
    }
}

impl IntoIterator for IpCollection {
    type Item = IpAddr;
    type IntoIter = Addresses;

    fn into_iter(self) -> Self::IntoIter {
        Addresses::new(self.singles, self.ranges)
    }
}

/// Lazy walk over an [`IpCollection`].
///
/// An address of a range that an earlier range already covered is skipped by
/// jumping past the earlier range, so overlaps cost one step each.
#[derive(Debug)]
pub struct Addresses {
    singles: std::vec::IntoIter<IpAddr>,
    seen: HashSet<IpAddr>,
    ranges: Vec<Ipv4Range>,
    current: usize,
    cursor: u64,
}

impl Addresses {
    fn new(singles: Vec<IpAddr>, ranges: Vec<Ipv4Range>) -> Self {
        let mut seen: HashSet<IpAddr> = HashSet::with_capacity(singles.len());
        let singles: Vec<IpAddr> = singles.into_iter().filter(|addr| seen.insert(*addr)).collect();
        let cursor = ranges.first().map(|range| range.bounds().0).unwrap_or(0);
        Self {
            singles: singles.into_iter(),
            seen,
            ranges,
            current: 0,
            cursor,
        }
    }

    /// Highest end among the already walked ranges that contain `addr`.
    fn walked_until(&self, addr: Ipv4Addr) -> Option<u64> {
        self.ranges[..self.current]
            .iter()
            .filter(|range| range.contains(addr))
            .map(|range| range.bounds().1)
            .max()
    }
}

impl Iterator for Addresses {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        if let Some(addr) = self.singles.next() {
            return Some(addr);
        }

        while let Some(&range) = self.ranges.get(self.current) {
            let (_, end) = range.bounds();
            if self.cursor > end {
                self.current += 1;
                if let Some(following) = self.ranges.get(self.current) {
                    self.cursor = following.bounds().0;
                }
                continue;
            }

            let candidate = Ipv4Addr::from(u32::try_from(self.cursor).ok()?);
            if let Some(walked_end) = self.walked_until(candidate) {
                self.cursor = walked_end + 1;
                continue;
            }
            self.cursor += 1;

            let addr = IpAddr::V4(candidate);
            if !self.seen.contains(&addr) {
                return Some(addr);
            }
        }
        None
    }
}
