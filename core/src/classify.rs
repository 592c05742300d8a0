//! Role tagging.
//!
//! Rules are a literal ordered table evaluated top to bottom, first match wins.
//! Device identity (rows before [`Tag::WebHost`]) outranks service-port inference.

use discovr_common::model::{AssetRecord, PortSet, Tag};

const MOBILE_HOSTNAMES: &[&str] = &["iphone", "android", "pixel", "galaxy"];
const TABLET_MARKERS: &[&str] = &["ipad", "tablet"];
const IOT_HOSTNAMES: &[&str] = &["camera", "iot", "chromecast"];
const NETWORK_HOSTNAMES: &[&str] = &["router", "switch", "firewall"];
const WEB_PORTS: &[u16] = &[80, 443];

/// Lowercased view of the fields the rules look at.
struct Evidence<'a> {
    hostname: String,
    os: String,
    ports: &'a PortSet,
}

impl<'a> Evidence<'a> {
    fn of(record: &'a AssetRecord) -> Self {
        Self {
            hostname: record.name.to_lowercase(),
            os: record.operating_system.to_lowercase(),
            ports: &record.ports,
        }
    }

    fn hostname_has(&self, needles: &[&str]) -> bool {
        needles.iter().any(|needle| self.hostname.contains(needle))
    }

    fn os_has(&self, needle: &str) -> bool {
        self.os.contains(needle)
    }
}

type Rule = fn(&Evidence) -> bool;

const RULES: &[(Tag, Rule)] = &[
    (Tag::Mobile, is_mobile),
    (Tag::Tablet, is_tablet),
    (Tag::Workstation, is_workstation),
    (Tag::Server, is_server),
    (Tag::Printer, is_printer),
    (Tag::IoT, is_iot),
    (Tag::Network, is_network_device),
    (Tag::WebHost, serves_web),
];

/// Total and deterministic: every record gets exactly one tag.
pub fn classify(record: &AssetRecord) -> Tag {
    let evidence = Evidence::of(record);
    RULES
        .iter()
        .find(|(_, rule)| rule(&evidence))
        .map(|(tag, _)| *tag)
        .unwrap_or(Tag::Unknown)
}

fn is_mobile(e: &Evidence) -> bool {
    e.hostname_has(MOBILE_HOSTNAMES)
        || (e.os_has("ios") && !e.os_has("macos"))
        || e.os_has("android")
}

fn is_tablet(e: &Evidence) -> bool {
    e.hostname_has(TABLET_MARKERS) || TABLET_MARKERS.iter().any(|marker| e.os_has(marker))
}

fn is_workstation(e: &Evidence) -> bool {
    let apple_desktop =
        e.os_has("macos") || e.os_has("os x") || (e.os_has("darwin") && !e.os_has("ios"));
    apple_desktop || e.os_has("windows 10") || e.os_has("windows 11")
}

fn is_server(e: &Evidence) -> bool {
    e.os_has("server") || e.os_has("linux")
}

fn is_printer(e: &Evidence) -> bool {
    e.hostname.contains("printer")
}

fn is_iot(e: &Evidence) -> bool {
    e.hostname_has(IOT_HOSTNAMES)
}

fn is_network_device(e: &Evidence) -> bool {
    e.hostname_has(NETWORK_HOSTNAMES)
}

fn serves_web(e: &Evidence) -> bool {
    e.ports.contains_any(WEB_PORTS)
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
    use discovr_common::model::{Kind, Origin};

    fn host(name: &str, os: &str, ports: &[u16]) -> AssetRecord {
        AssetRecord::new(Kind::Host, Origin::Network)
            .with_name(name)
            .with_os(os)
            .with_ports(ports.iter().copied().collect())
    }

    #[test]
    fn windows_10_is_workstation() {
        assert_eq!(classify(&host("HR-PC01", "Windows 10 Pro", &[])), Tag::Workstation);
    }

    #[test]
    fn camera_is_iot() {
        assert_eq!(classify(&host("iot-camera.local", "Unknown", &[])), Tag::IoT);
    }

    #[test]
    fn device_identity_outranks_web_ports() {
        assert_eq!(classify(&host("iot-camera", "Unknown", &[443])), Tag::IoT);
        assert_eq!(classify(&host("lobby-printer", "Unknown", &[80])), Tag::Printer);
        assert_eq!(classify(&host("core-switch", "Unknown", &[443])), Tag::Network);
    }

    #[test]
    fn web_ports_without_identity() {
        assert_eq!(classify(&host("intranet", "Unknown", &[22, 443])), Tag::WebHost);
    }

    #[test]
    fn mobile_rules() {
        assert_eq!(classify(&host("Johns-iPhone", "Unknown", &[])), Tag::Mobile);
        assert_eq!(classify(&host("device", "Apple iOS 17", &[])), Tag::Mobile);
        assert_eq!(classify(&host("device", "Android 14", &[])), Tag::Mobile);
        // "android" wins over a server-looking OS because Mobile is evaluated first.
        assert_eq!(classify(&host("android-build", "Linux 5.10", &[])), Tag::Mobile);
    }

    #[test]
    fn macos_is_not_mobile() {
        assert_eq!(classify(&host("studio", "Apple macOS 14", &[])), Tag::Workstation);
        assert_eq!(classify(&host("old-mac", "Mac OS X 10.6", &[])), Tag::Workstation);
        assert_eq!(classify(&host("mini", "Darwin 23.1", &[])), Tag::Workstation);
    }

    #[test]
    fn ipad_is_tablet() {
        assert_eq!(classify(&host("kitchen-ipad", "Unknown", &[])), Tag::Tablet);
        assert_eq!(classify(&host("dev", "Samsung Tablet OS", &[])), Tag::Tablet);
    }

    #[test]
    fn server_rules() {
        assert_eq!(
            classify(&host("dc01", "Microsoft Windows Server 2019", &[445])),
            Tag::Server
        );
        assert_eq!(classify(&host("web", "Linux 5.4", &[80])), Tag::Server);
        assert_eq!(classify(&host("x", "Linux/Unix (guessed)", &[22])), Tag::Server);
    }

    #[test]
    fn fallback_is_unknown() {
        assert_eq!(classify(&host("", "Unknown", &[])), Tag::Unknown);
        assert_eq!(classify(&host("box", "Windows (guessed)", &[3389])), Tag::Unknown);
    }

    #[test]
    fn deterministic() {
        let record = host("Pixel-7", "Android", &[80]);
        let first = classify(&record);
        for _ in 0..10 {
            assert_eq!(classify(&record), first);
        }
    }
}
