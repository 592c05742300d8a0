use std::net::{IpAddr, Ipv6Addr};

use colored::*;

use discovr_common::model::{Risk, UNKNOWN};
use discovr_core::AssessedAsset;

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

/// Extension keys worth a line in the tree, in display order.
const SHOWN_EXTENSIONS: &[&str] = &[
    "state",
    "status",
    "public_ip",
    "nat_ip",
    "ip",
    "instance_type",
    "machine_type",
    "engine",
    "endpoint",
    "publicly_accessible",
    "encryption",
    "public_access",
];

pub fn ipv6_to_type_str(ipv6_addr: &Ipv6Addr) -> &'static str {
    let first_byte = ipv6_addr.octets()[0];
    if (0x20..=0x3F).contains(&first_byte) {
        return "GUA";
    }
    if ipv6_addr.is_unique_local() {
        return "ULA";
    }
    if ipv6_addr.is_unicast_link_local() {
        return "LLA";
    }
    "IPv6"
}

pub fn address_to_detail(ip: &IpAddr) -> Detail {
    match ip {
        IpAddr::V4(ipv4_addr) => (
            String::from("IPv4"),
            ipv4_addr.to_string().color(colors::IPV4_ADDR),
        ),
        IpAddr::V6(ipv6_addr) => (
            String::from(ipv6_to_type_str(ipv6_addr)),
            ipv6_addr.to_string().color(colors::IPV6_ADDR),
        ),
    }
}

pub fn risk_colored(risk: Risk) -> ColoredString {
    let color = match risk {
        Risk::Low => colors::RISK_LOW,
        Risk::Medium => colors::RISK_MEDIUM,
        Risk::High => colors::RISK_HIGH,
        Risk::Critical => colors::RISK_CRITICAL,
    };
    let label = risk.to_string().color(color);
    if risk.is_elevated() { label.bold() } else { label }
}

/// Tree head for an asset: its name, else its address.
pub fn asset_title(asset: &AssessedAsset) -> String {
    let record = &asset.record;
    if !record.name.is_empty() && record.name != UNKNOWN {
        record.name.clone()
    } else {
        record.display_address()
    }
}

pub fn asset_details(asset: &AssessedAsset) -> Vec<Detail> {
    let record = &asset.record;
    let mut details: Vec<Detail> = Vec::new();

    if let Some(address) = &record.address {
        details.push(address_to_detail(address));
    }
    details.push((String::from("Kind"), record.kind.to_string().normal()));
    if !record.os_is_unknown() {
        details.push((String::from("OS"), record.operating_system.normal()));
    }
    if !record.ports.is_empty() {
        details.push((String::from("Ports"), record.ports.to_string().color(colors::PORTS)));
    }
    let rules = record.security_rules();
    if !rules.is_empty() {
        let inbound = rules.iter().filter(|rule| rule.is_inbound_allow()).count();
        details.push((
            String::from("Rules"),
            format!("{} ({} inbound allow)", rules.len(), inbound).normal(),
        ));
    }
    for key in SHOWN_EXTENSIONS {
        if let Some(value) = record.extension(key) {
            details.push((key.replace('_', " "), value.to_string().normal()));
        }
    }
    details.push((String::from("Tag"), asset.tag.to_string().color(colors::ACCENT)));
    details.push((String::from("Risk"), risk_colored(asset.risk)));
    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
