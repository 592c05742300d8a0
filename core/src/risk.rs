//! Exposure scoring.
//!
//! Two decision tables, both first-match-wins. Rule-set records (security groups,
//! firewall rules) are judged by their inbound allow rules only. Everything else is
//! judged by OS, tag and open ports. Neither table is a score sum.

use discovr_common::model::{AssetRecord, Risk, SecurityRule, Tag};

/// RDP, Telnet, SMB, FTP.
pub const RISKY_PORTS: &[u16] = &[3389, 23, 445, 21];
/// HTTP, HTTPS, MySQL.
pub const MEDIUM_PORTS: &[u16] = &[80, 443, 3306];

const END_OF_LIFE_OS: &[&str] = &[
    "windows xp",
    "windows vista",
    "windows 7",
    "server 2003",
    "server 2008",
];

pub fn assess(record: &AssetRecord, tag: Tag) -> Risk {
    if record.kind.is_rule_set() {
        assess_rules(record.security_rules())
    } else {
        assess_host(record, tag)
    }
}

// --- rule sets ---

type RuleCheck = fn(&SecurityRule) -> bool;

const RULE_TIERS: &[(Risk, RuleCheck)] = &[
    (Risk::Critical, is_wide_open),
    (Risk::High, exposes_risky),
    (Risk::Medium, exposes_medium),
];

/// Any inbound allow rule open to every port or every source is Critical,
/// whatever the remaining rules say.
pub fn assess_rules(rules: &[SecurityRule]) -> Risk {
    let inbound: Vec<&SecurityRule> = rules.iter().filter(|r| r.is_inbound_allow()).collect();
    RULE_TIERS
        .iter()
        .find(|(_, check)| inbound.iter().any(|rule| check(rule)))
        .map(|(risk, _)| *risk)
        .unwrap_or(Risk::Low)
}

fn is_wide_open(rule: &SecurityRule) -> bool {
    rule.has_unrestricted_ports() || rule.has_unrestricted_source()
}

fn exposes_risky(rule: &SecurityRule) -> bool {
    rule.exposes_any(RISKY_PORTS)
}

fn exposes_medium(rule: &SecurityRule) -> bool {
    rule.exposes_any(MEDIUM_PORTS)
}

// --- hosts ---

struct Facts<'a> {
    os: String,
    os_unknown: bool,
    tag: Tag,
    record: &'a AssetRecord,
}

impl Facts<'_> {
    fn os_has(&self, needle: &str) -> bool {
        self.os.contains(needle)
    }

    fn risky_open(&self) -> bool {
        self.record.ports.contains_any(RISKY_PORTS)
    }

    fn medium_open(&self) -> bool {
        self.record.ports.contains_any(MEDIUM_PORTS)
    }
}

type HostRule = fn(&Facts) -> Option<Risk>;

const HOST_RULES: &[HostRule] = &[
    end_of_life_os,
    iot_or_printer,
    mobile_or_tablet,
    workstation,
    server,
    network_device,
    web_host,
    unknown_asset,
    exposed_ports,
];

pub fn assess_host(record: &AssetRecord, tag: Tag) -> Risk {
    let facts = Facts {
        os: record.operating_system.to_lowercase(),
        os_unknown: record.os_is_unknown(),
        tag,
        record,
    };
    HOST_RULES
        .iter()
        .find_map(|rule| rule(&facts))
        .unwrap_or(Risk::Low)
}

fn end_of_life_os(f: &Facts) -> Option<Risk> {
    END_OF_LIFE_OS
        .iter()
        .any(|os| f.os_has(os))
        .then_some(Risk::Critical)
}

fn iot_or_printer(f: &Facts) -> Option<Risk> {
    matches!(f.tag, Tag::IoT | Tag::Printer).then_some(Risk::High)
}

fn mobile_or_tablet(f: &Facts) -> Option<Risk> {
    if !matches!(f.tag, Tag::Mobile | Tag::Tablet) {
        return None;
    }
    Some(if f.risky_open() { Risk::High } else { Risk::Medium })
}

fn workstation(f: &Facts) -> Option<Risk> {
    if f.tag != Tag::Workstation {
        return None;
    }
    if f.os_has("windows 7") || f.os_has("vista") {
        Some(Risk::Critical)
    } else if f.os_has("windows 10") {
        Some(Risk::Medium)
    } else if f.os_has("windows 11") || f.os_has("macos") || f.os_has("darwin") {
        Some(Risk::Low)
    } else if f.risky_open() {
        Some(Risk::High)
    } else {
        None
    }
}

fn server(f: &Facts) -> Option<Risk> {
    if f.tag != Tag::Server {
        return None;
    }
    if f.os_has("server 2008") || f.os_has("server 2003") {
        Some(Risk::Critical)
    } else if f.risky_open() {
        Some(Risk::High)
    } else {
        Some(Risk::Medium)
    }
}

fn network_device(f: &Facts) -> Option<Risk> {
    if f.tag != Tag::Network {
        return None;
    }
    Some(if f.risky_open() { Risk::High } else { Risk::Medium })
}

fn web_host(f: &Facts) -> Option<Risk> {
    (f.tag == Tag::WebHost && f.medium_open()).then_some(Risk::Medium)
}

fn unknown_asset(f: &Facts) -> Option<Risk> {
    (f.os_unknown || f.tag == Tag::Unknown).then_some(Risk::Medium)
}

fn exposed_ports(f: &Facts) -> Option<Risk> {
    if f.risky_open() {
        Some(Risk::High)
    } else if f.medium_open() {
        Some(Risk::Medium)
    } else {
        None
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

#[cfg(test)]
mod tests {
    use super::*;
    use discovr_common::model::{Access, Direction, Kind, Origin, PortSpec};

    fn host(name: &str, os: &str, ports: &[u16]) -> AssetRecord {
        AssetRecord::new(Kind::Host, Origin::Network)
            .with_name(name)
            .with_os(os)
            .with_ports(ports.iter().copied().collect())
    }

    fn group(rules: Vec<SecurityRule>) -> AssetRecord {
        AssetRecord::new(Kind::SecurityGroup, Origin::Aws)
            .with_name("sg-0123")
            .with_rules(rules)
    }

    fn inbound(ports: PortSpec, source: &str) -> SecurityRule {
        SecurityRule::new("rule", Direction::Inbound, Access::Allow)
            .with_ports(ports)
            .from_source(source)
    }

    #[test]
    fn windows_10_workstation_is_medium() {
        let record = host("HR-PC01", "Windows 10 Pro", &[]);
        assert_eq!(assess(&record, Tag::Workstation), Risk::Medium);
    }

    #[test]
    fn iot_is_high() {
        let record = host("iot-camera.local", "Unknown", &[]);
        assert_eq!(assess(&record, Tag::IoT), Risk::High);
    }

    #[test]
    fn wide_open_group_is_critical() {
        let record = group(vec![inbound(PortSpec::Any, "0.0.0.0/0")]);
        assert_eq!(assess(&record, Tag::Unknown), Risk::Critical);
    }

    #[test]
    fn one_wide_open_rule_beats_the_rest() {
        let record = group(vec![
            inbound(PortSpec::Single(443), "10.0.0.0/8"),
            inbound(PortSpec::Single(3389), "10.0.0.0/8"),
            inbound(PortSpec::Single(8080), "::/0"),
        ]);
        assert_eq!(assess(&record, Tag::Unknown), Risk::Critical);
    }

    #[test]
    fn group_port_tiers() {
        let rdp = group(vec![
            inbound(PortSpec::Single(443), "10.0.0.0/8"),
            inbound(PortSpec::range(3000, 3400), "10.0.0.0/8"),
        ]);
        assert_eq!(assess(&rdp, Tag::Unknown), Risk::High);

        let web = group(vec![inbound(PortSpec::Single(443), "10.0.0.0/8")]);
        assert_eq!(assess(&web, Tag::Unknown), Risk::Medium);

        // Membership is numeric: 8080 does not contain 80.
        let alt = group(vec![inbound(PortSpec::Single(8080), "10.0.0.0/8")]);
        assert_eq!(assess(&alt, Tag::Unknown), Risk::Low);
    }

    #[test]
    fn only_inbound_allow_rules_count() {
        let record = group(vec![
            SecurityRule::new("egress", Direction::Outbound, Access::Allow),
            SecurityRule::new("deny-all", Direction::Inbound, Access::Deny),
        ]);
        assert_eq!(assess(&record, Tag::Unknown), Risk::Low);
        assert_eq!(assess(&group(Vec::new()), Tag::Unknown), Risk::Low);
    }

    #[test]
    fn firewall_rules_use_the_rule_table() {
        let record = AssetRecord::new(Kind::FirewallRule, Origin::Gcp)
            .with_name("allow-ssh")
            .with_rules(vec![inbound(PortSpec::Single(22), "0.0.0.0/0")]);
        assert_eq!(assess(&record, Tag::Unknown), Risk::Critical);
    }

    #[test]
    fn legacy_os_overrides_ports() {
        let record = host("old-pc", "Microsoft Windows 7 SP1", &[80]);
        assert_eq!(assess(&record, Tag::Workstation), Risk::Critical);
        let record = host("dc", "Windows Server 2008 R2", &[]);
        assert_eq!(assess(&record, Tag::Server), Risk::Critical);
        let record = host("kiosk", "Windows XP", &[]);
        assert_eq!(assess(&record, Tag::Unknown), Risk::Critical);
    }

    #[test]
    fn workstation_tiers() {
        assert_eq!(assess(&host("a", "Windows 11 Pro", &[3389]), Tag::Workstation), Risk::Low);
        assert_eq!(assess(&host("b", "macOS 14", &[]), Tag::Workstation), Risk::Low);
        // Falls through to the generic port tier.
        assert_eq!(assess(&host("c", "Mac OS X 10.6", &[445]), Tag::Workstation), Risk::High);
        assert_eq!(assess(&host("d", "Mac OS X 10.6", &[]), Tag::Workstation), Risk::Low);
    }

    #[test]
    fn server_tiers() {
        assert_eq!(assess(&host("s", "Linux 5.4", &[21]), Tag::Server), Risk::High);
        assert_eq!(assess(&host("s", "Linux 5.4", &[22]), Tag::Server), Risk::Medium);
    }

    #[test]
    fn mobile_and_network_tiers() {
        assert_eq!(assess(&host("pixel", "Android", &[]), Tag::Mobile), Risk::Medium);
        assert_eq!(assess(&host("pixel", "Android", &[23]), Tag::Mobile), Risk::High);
        assert_eq!(assess(&host("ipad", "Unknown", &[]), Tag::Tablet), Risk::Medium);
        assert_eq!(assess(&host("router", "Unknown", &[]), Tag::Network), Risk::Medium);
        assert_eq!(assess(&host("router", "Unknown", &[23]), Tag::Network), Risk::High);
    }

    #[test]
    fn web_host_and_fallbacks() {
        assert_eq!(assess(&host("www", "Unknown", &[443]), Tag::WebHost), Risk::Medium);
        assert_eq!(assess(&host("box", "Unknown", &[]), Tag::Unknown), Risk::Medium);
        assert_eq!(assess(&host("box", "Windows (guessed)", &[3389]), Tag::Unknown), Risk::Medium);
        // Known OS, no tag rule matched: generic port tiers.
        let record = host("box", "Solaris 11", &[]);
        assert_eq!(assess_host(&record, Tag::WebHost), Risk::Low);
    }
}
