use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

const RESOLV_CONF: &str = "/etc/resolv.conf";
const FALLBACK_RESOLVER: IpAddr = IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1));

/// First `nameserver` of the system resolver configuration, else a public resolver.
pub fn system_nameserver() -> IpAddr {
    read_nameserver(Path::new(RESOLV_CONF)).unwrap_or(FALLBACK_RESOLVER)
}

fn read_nameserver(path: &Path) -> Option<IpAddr> {
    let contents = std::fs::read_to_string(path).ok()?;
    parse_nameserver(&contents)
}

fn parse_nameserver(contents: &str) -> Option<IpAddr> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && !line.starts_with(';'))
        .filter_map(|line| line.strip_prefix("nameserver"))
        .find_map(|rest| rest.trim().split('%').next()?.parse::<IpAddr>().ok())
}
