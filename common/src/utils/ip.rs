use std::net::IpAddr;

/// Builds the `in-addr.arpa` / `ip6.arpa` name used for PTR lookups.
pub fn reverse_address_to_ptr(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(ipv4_addr) => {
            let [a, b, c, d] = ipv4_addr.octets();
            format!("{d}.{c}.{b}.{a}.in-addr.arpa")
        }
        IpAddr::V6(ipv6_addr) => {
            let nibbles: Vec<String> = ipv6_addr
                .octets()
                .iter()
                .rev()
                .flat_map(|byte| [byte & 0x0f, byte >> 4])
                .map(|nibble| format!("{nibble:x}"))
                .collect();
            format!("{}.ip6.arpa", nibbles.join("."))
        }
    }
}

/// The `/24` (IPv4) or `/64` (IPv6) block an address belongs to, used as a partition key.
pub fn subnet_of(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(ipv4_addr) => {
            let [a, b, c, _] = ipv4_addr.octets();
            format!("{a}.{b}.{c}.0/24")
        }
        IpAddr::V6(ipv6_addr) => {
            let segments = ipv6_addr.segments();
            format!(
                "{:x}:{:x}:{:x}:{:x}::/64",
                segments[0], segments[1], segments[2], segments[3]
            )
        }
    }
}
