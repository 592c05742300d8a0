//! GCP inventory of one project.
//!
//! Compute instances are required. Firewall rules, VPC networks, reserved addresses,
//! forwarding rules, persistent disks and custom images are read when available.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use discovr_common::model::{
    Access, AssetRecord, Direction, Kind, Origin, PortSet, PortSpec, SecurityRule,
};

use super::{Collector, DocumentSource, Query, fetch_json, fetch_optional, last_segment};
use crate::error::CollectError;

const GCLOUD: &str = "gcloud";
/// Ingress rules without source ranges or tags apply to every address.
const IMPLICIT_SOURCE: &str = "0.0.0.0/0";

pub struct GcpCollector {
    source: Arc<dyn DocumentSource>,
    project: String,
    zone: Option<String>,
}

impl GcpCollector {
    pub fn new(source: Arc<dyn DocumentSource>, project: String, zone: Option<String>) -> Self {
        Self {
            source,
            project,
            zone,
        }
    }

    fn query(&self, snapshot: &str, args: &[&str]) -> Query {
        Query::new(snapshot, GCLOUD)
            .args(args.iter().copied())
            .args(["--project", self.project.as_str(), "--format", "json"])
    }

    /// Snapshots may hold every zone, the live query is already filtered.
    fn in_zone(&self, instance: &GceInstance) -> bool {
        self.zone_matches(instance.zone.as_deref())
    }

    /// `us-central1-a` → `us-central1`.
    fn region(&self) -> Option<&str> {
        let zone = self.zone.as_deref()?;
        Some(zone.rsplit_once('-').map_or(zone, |(region, _)| region))
    }

    /// Regional resources outside the selected zone's region are dropped, global ones kept.
    fn in_region(&self, region: Option<&str>) -> bool {
        match (self.region(), region) {
            (Some(wanted), Some(region)) => last_segment(region) == wanted,
            _ => true,
        }
    }

    fn zone_matches(&self, zone: Option<&str>) -> bool {
        match (&self.zone, zone) {
            (Some(wanted), Some(zone)) => last_segment(zone) == wanted.as_str(),
            _ => true,
        }
    }

    fn instance_record(&self, instance: &GceInstance) -> AssetRecord {
        let os = instance
            .labels
            .get("os")
            .cloned()
            .unwrap_or_default();

        let mut record = AssetRecord::new(Kind::ComputeInstance, Origin::Gcp)
            .with_name(instance.name.as_str())
            .with_os(os)
            .in_partition(self.project.as_str());

        if let Some(address) = instance.internal_ip() {
            record = record.with_address(address);
        }
        if let Some(nat) = instance.nat_ip() {
            record = record.with_extension("nat_ip", nat);
        }
        if let Some(zone) = &instance.zone {
            record = record.with_extension("zone", last_segment(zone));
        }
        if let Some(machine_type) = &instance.machine_type {
            record = record.with_extension("machine_type", last_segment(machine_type));
        }
        if let Some(status) = &instance.status {
            record = record.with_extension("status", status.as_str());
        }
        if !instance.labels.is_empty() {
            record = record.with_extension("labels", instance.labels.clone());
        }
        record
    }

    fn firewall_record(&self, firewall: &GceFirewall) -> AssetRecord {
        let rules = firewall.rules();
        let inbound: PortSet = rules
            .iter()
            .filter(|rule| rule.is_inbound_allow())
            .map(|rule| rule.ports)
            .collect();

        let mut record = AssetRecord::new(Kind::FirewallRule, Origin::Gcp)
            .with_name(firewall.name.as_str())
            .with_ports(inbound)
            .in_partition(self.project.as_str())
            .with_rules(rules);
        if let Some(network) = &firewall.network {
            record = record.with_extension("network", last_segment(network));
        }
        if !firewall.target_tags.is_empty() {
            record = record.with_extension("target_tags", firewall.target_tags.clone());
        }
        record
    }

    fn network_record(&self, network: &GceNetwork) -> AssetRecord {
        let subnets: Vec<String> = network
            .subnetworks
            .iter()
            .map(|s| last_segment(s).to_string())
            .collect();
        let routing_mode = network
            .routing_config
            .as_ref()
            .and_then(|r| r.routing_mode.as_deref())
            .unwrap_or("UNKNOWN");

        let mut record = AssetRecord::new(Kind::VirtualNetwork, Origin::Gcp)
            .with_name(network.name.as_str())
            .in_partition(self.project.as_str())
            .with_extension("subnets", subnets)
            .with_extension("routing_mode", routing_mode);
        if let Some(auto) = network.auto_create_subnetworks {
            record = record.with_extension("auto_create_subnetworks", auto);
        }
        record
    }

    /// The reserved IP stays in an extension: the address usually belongs to an
    /// instance or load balancer that is already keyed by it.
    fn address_record(&self, address: &GceAddress) -> AssetRecord {
        let mut record = AssetRecord::new(Kind::ReservedAddress, Origin::Gcp)
            .with_name(address.name.as_str())
            .in_partition(self.project.as_str())
            .with_extension("scope", scope(address.region.as_deref()));
        if let Some(ip) = &address.address {
            record = record.with_extension("ip", ip.as_str());
        }
        if let Some(status) = &address.status {
            record = record.with_extension("status", status.as_str());
        }
        if let Some(address_type) = &address.address_type {
            record = record.with_extension("address_type", address_type.as_str());
        }
        if let Some(region) = &address.region {
            record = record.with_extension("region", last_segment(region));
        }
        record
    }

    fn forwarding_record(&self, rule: &GceForwardingRule) -> AssetRecord {
        let ports: PortSet = rule
            .port_range
            .as_deref()
            .and_then(|range| match range.parse::<PortSpec>() {
                Ok(spec) => Some(spec),
                Err(e) => {
                    debug!("forwarding rule {}: {e}", rule.name);
                    None
                }
            })
            .into_iter()
            .collect();

        let mut record = AssetRecord::new(Kind::ForwardingRule, Origin::Gcp)
            .with_name(rule.name.as_str())
            .with_ports(ports)
            .in_partition(self.project.as_str())
            .with_extension("scope", scope(rule.region.as_deref()));
        if let Some(ip) = &rule.ip_address {
            record = record.with_extension("ip_address", ip.as_str());
        }
        if let Some(protocol) = &rule.ip_protocol {
            record = record.with_extension("protocol", protocol.as_str());
        }
        if let Some(target) = &rule.target {
            record = record.with_extension("target", last_segment(target));
        }
        if let Some(region) = &rule.region {
            record = record.with_extension("region", last_segment(region));
        }
        record
    }

    fn disk_record(&self, disk: &GceDisk) -> AssetRecord {
        let users: Vec<String> = disk.users.iter().map(|u| last_segment(u).to_string()).collect();

        let mut record = AssetRecord::new(Kind::Volume, Origin::Gcp)
            .with_name(disk.name.as_str())
            .in_partition(self.project.as_str())
            .with_extension("users", users);
        if let Some(size) = disk.size_gb.as_ref().and_then(Count::value) {
            record = record.with_extension("size_gb", size);
        }
        if let Some(disk_type) = &disk.disk_type {
            record = record.with_extension("disk_type", last_segment(disk_type));
        }
        if let Some(status) = &disk.status {
            record = record.with_extension("status", status.as_str());
        }
        if let Some(zone) = &disk.zone {
            record = record.with_extension("zone", last_segment(zone));
        }
        record
    }

    fn image_record(&self, image: &GceImage) -> AssetRecord {
        let mut record = AssetRecord::new(Kind::MachineImage, Origin::Gcp)
            .with_name(image.name.as_str())
            .in_partition(self.project.as_str())
            .with_extension("family", image.family.as_deref().unwrap_or_default());
        if let Some(status) = &image.status {
            record = record.with_extension("status", status.as_str());
        }
        if let Some(size) = image.disk_size_gb.as_ref().and_then(Count::value) {
            record = record.with_extension("disk_size_gb", size);
        }
        record
    }
}

fn scope(region: Option<&str>) -> &'static str {
    if region.is_some() { "regional" } else { "global" }
}

#[async_trait]
impl Collector for GcpCollector {
    fn origin(&self) -> Origin {
        Origin::Gcp
    }

    async fn collect(&self) -> Result<Vec<AssetRecord>, CollectError> {
        if self.project.trim().is_empty() {
            return Err(CollectError::Config {
                provider: Origin::Gcp,
                reason: String::from("a project id is required"),
            });
        }

        let source = self.source.as_ref();
        let instances_query = self
            .query("gcp_instances.json", &["compute", "instances", "list"])
            .opt("--zones", self.zone.as_deref());
        let instances: Vec<GceInstance> =
            fetch_json(source, Origin::Gcp, "compute instances", &instances_query).await?;
        let firewalls: Vec<GceFirewall> = fetch_optional(
            source,
            Origin::Gcp,
            "firewall rules",
            &self.query("gcp_firewalls.json", &["compute", "firewall-rules", "list"]),
        )
        .await;

        let networks: Vec<GceNetwork> = fetch_optional(
            source,
            Origin::Gcp,
            "VPC networks",
            &self.query("gcp_networks.json", &["compute", "networks", "list"]),
        )
        .await;
        let addresses: Vec<GceAddress> = fetch_optional(
            source,
            Origin::Gcp,
            "reserved addresses",
            &self.query("gcp_addresses.json", &["compute", "addresses", "list"]),
        )
        .await;
        let forwarding: Vec<GceForwardingRule> = fetch_optional(
            source,
            Origin::Gcp,
            "forwarding rules",
            &self.query("gcp_forwarding_rules.json", &["compute", "forwarding-rules", "list"]),
        )
        .await;
        let disks_query = self
            .query("gcp_disks.json", &["compute", "disks", "list"])
            .opt("--zones", self.zone.as_deref());
        let disks: Vec<GceDisk> = fetch_optional(source, Origin::Gcp, "persistent disks", &disks_query).await;
        let images: Vec<GceImage> = fetch_optional(
            source,
            Origin::Gcp,
            "custom images",
            &self.query("gcp_images.json", &["compute", "images", "list", "--no-standard-images"]),
        )
        .await;

        let mut records: Vec<AssetRecord> = instances
            .iter()
            .filter(|i| self.in_zone(i))
            .map(|i| self.instance_record(i))
            .collect();
        records.extend(networks.iter().map(|n| self.network_record(n)));
        records.extend(firewalls.iter().map(|f| self.firewall_record(f)));
        records.extend(
            addresses
                .iter()
                .filter(|a| self.in_region(a.region.as_deref()))
                .map(|a| self.address_record(a)),
        );
        records.extend(
            forwarding
                .iter()
                .filter(|r| self.in_region(r.region.as_deref()))
                .map(|r| self.forwarding_record(r)),
        );
        records.extend(
            disks
                .iter()
                .filter(|d| self.zone_matches(d.zone.as_deref()))
                .map(|d| self.disk_record(d)),
        );
        records.extend(images.iter().map(|i| self.image_record(i)));
        Ok(records)
    }
}

// --- vendor documents ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceInstance {
    name: String,
    zone: Option<String>,
    machine_type: Option<String>,
    status: Option<String>,
    #[serde(default)]
    network_interfaces: Vec<GceInterface>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

impl GceInstance {
    fn internal_ip(&self) -> Option<IpAddr> {
        self.network_interfaces
            .iter()
            .find_map(|iface| iface.network_ip.as_deref()?.parse().ok())
    }

    fn nat_ip(&self) -> Option<&str> {
        self.network_interfaces
            .iter()
            .flat_map(|iface| iface.access_configs.iter())
            .find_map(|config| config.nat_ip.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct GceInterface {
    #[serde(rename = "networkIP")]
    network_ip: Option<String>,
    #[serde(default, rename = "accessConfigs")]
    access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Deserialize)]
struct AccessConfig {
    #[serde(rename = "natIP")]
    nat_ip: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceFirewall {
    name: String,
    direction: Option<String>,
    priority: Option<u32>,
    network: Option<String>,
    #[serde(default)]
    source_ranges: Vec<String>,
    #[serde(default)]
    source_tags: Vec<String>,
    #[serde(default)]
    target_tags: Vec<String>,
    #[serde(default)]
    allowed: Vec<GcePermission>,
    #[serde(default)]
    denied: Vec<GcePermission>,
}

impl GceFirewall {
    fn direction(&self) -> Direction {
        self.direction
            .as_deref()
            .and_then(Direction::parse)
            .unwrap_or(Direction::Inbound)
    }

    fn sources(&self) -> Vec<&str> {
        if !self.source_ranges.is_empty() {
            self.source_ranges.iter().map(String::as_str).collect()
        } else if !self.source_tags.is_empty() {
            self.source_tags.iter().map(String::as_str).collect()
        } else {
            vec![IMPLICIT_SOURCE]
        }
    }

    /// One canonical rule per (permission, port entry, source).
    fn rules(&self) -> Vec<SecurityRule> {
        let direction = self.direction();
        let sources = self.sources();
        let entries = self
            .allowed
            .iter()
            .map(|p| (Access::Allow, p))
            .chain(self.denied.iter().map(|p| (Access::Deny, p)));

        let mut rules = Vec::new();
        for (access, permission) in entries {
            for spec in permission.port_specs(&self.name) {
                for source in &sources {
                    let mut rule = SecurityRule::new(self.name.as_str(), direction, access)
                        .with_protocol(permission.ip_protocol.as_str())
                        .with_ports(spec)
                        .from_source(*source);
                    if let Some(priority) = self.priority {
                        rule = rule.with_priority(priority);
                    }
                    rules.push(rule);
                }
            }
        }
        rules
    }
}

#[derive(Debug, Deserialize)]
struct GcePermission {
    #[serde(rename = "IPProtocol")]
    ip_protocol: String,
    #[serde(default)]
    ports: Vec<String>,
}

impl GcePermission {
    /// Protocols that carry ports, by name or IANA number.
    const PORTED: &'static [&'static str] = &["tcp", "udp", "sctp", "all", "6", "17", "132"];

    /// Missing ports mean every port of the protocol. Protocols without ports
    /// (icmp, esp, ah) produce no port entry at all.
    fn port_specs(&self, firewall: &str) -> Vec<PortSpec> {
        if self.ports.is_empty() {
            let ported = Self::PORTED
                .iter()
                .any(|p| self.ip_protocol.eq_ignore_ascii_case(p));
            return if ported { vec![PortSpec::Any] } else { Vec::new() };
        }
        self.ports
            .iter()
            .filter_map(|port| match port.parse::<PortSpec>() {
                Ok(spec) => Some(spec),
                Err(e) => {
                    debug!("firewall {firewall}: {e}");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceNetwork {
    name: String,
    auto_create_subnetworks: Option<bool>,
    #[serde(default)]
    subnetworks: Vec<String>,
    routing_config: Option<RoutingConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutingConfig {
    routing_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceAddress {
    name: String,
    address: Option<String>,
    status: Option<String>,
    address_type: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceForwardingRule {
    name: String,
    #[serde(rename = "IPAddress")]
    ip_address: Option<String>,
    #[serde(rename = "IPProtocol")]
    ip_protocol: Option<String>,
    port_range: Option<String>,
    target: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceDisk {
    name: String,
    size_gb: Option<Count>,
    #[serde(rename = "type")]
    disk_type: Option<String>,
    status: Option<String>,
    zone: Option<String>,
    #[serde(default)]
    users: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceImage {
    name: String,
    status: Option<String>,
    disk_size_gb: Option<Count>,
    family: Option<String>,
}

/// int64 fields come back as JSON strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(i64),
    Text(String),
}

impl Count {
    fn value(&self) -> Option<i64> {
        match self {
            Count::Number(n) => Some(*n),
            Count::Text(s) => s.trim().parse().ok(),
        }
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
    use crate::collectors::SnapshotDir;
    use crate::risk;
    use discovr_common::model::{Extension, Risk, Tag};

    const INSTANCES: &str = r#"[
      {
        "name": "api-1",
        "zone": "https://www.googleapis.com/compute/v1/projects/acme/zones/us-central1-a",
        "machineType": "https://www.googleapis.com/compute/v1/projects/acme/zones/us-central1-a/machineTypes/e2-medium",
        "status": "RUNNING",
        "networkInterfaces": [{"networkIP": "10.128.0.2", "accessConfigs": [{"natIP": "34.1.2.3"}]}],
        "labels": {"os": "debian-12-linux", "team": "api"}
      },
      {
        "name": "batch-1",
        "zone": "projects/acme/zones/europe-west1-b",
        "networkInterfaces": [{"networkIP": "10.132.0.9"}]
      }
    ]"#;

    const FIREWALLS: &str = r#"[
      {
        "name": "allow-ssh-anywhere",
        "direction": "INGRESS",
        "priority": 1000,
        "network": "projects/acme/global/networks/default",
        "sourceRanges": ["0.0.0.0/0"],
        "allowed": [{"IPProtocol": "tcp", "ports": ["22"]}]
      },
      {
        "name": "internal-web",
        "direction": "INGRESS",
        "sourceRanges": ["10.0.0.0/8", "172.16.0.0/12"],
        "allowed": [{"IPProtocol": "tcp", "ports": ["80", "8000-8100"]}, {"IPProtocol": "icmp"}],
        "denied": [{"IPProtocol": "udp"}]
      }
    ]"#;

    async fn collect(zone: Option<&str>) -> Vec<AssetRecord> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gcp_instances.json"), INSTANCES).unwrap();
        std::fs::write(dir.path().join("gcp_firewalls.json"), FIREWALLS).unwrap();
        GcpCollector::new(
            Arc::new(SnapshotDir::new(dir.path())),
            String::from("acme"),
            zone.map(String::from),
        )
        .collect()
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn instances_and_firewalls() {
        let records = collect(None).await;
        assert_eq!(records.len(), 4);

        let api = &records[0];
        assert_eq!(api.kind, Kind::ComputeInstance);
        assert_eq!(api.address, Some("10.128.0.2".parse().unwrap()));
        assert_eq!(api.operating_system, "debian-12-linux");
        assert_eq!(api.partition, "acme");
        assert_eq!(
            api.extension("machine_type"),
            Some(&Extension::Text(String::from("e2-medium")))
        );
        assert_eq!(
            api.extension("nat_ip"),
            Some(&Extension::Text(String::from("34.1.2.3")))
        );
        assert!(records[1].os_is_unknown());

        let ssh = &records[2];
        assert_eq!(ssh.kind, Kind::FirewallRule);
        assert_eq!(risk::assess(ssh, Tag::Unknown), Risk::Critical);

        let internal = &records[3];
        // (80, 8000-8100) * 2 sources + udp deny * 2 sources, icmp has no ports
        assert_eq!(internal.security_rules().len(), 6);
        assert_eq!(internal.ports.to_string(), "80,8000-8100");
        assert_eq!(risk::assess(internal, Tag::Unknown), Risk::Medium);
    }

    #[tokio::test]
    async fn zone_filter_applies_to_snapshots() {
        let records = collect(Some("europe-west1-b")).await;
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["batch-1", "allow-ssh-anywhere", "internal-web"]);
    }

    #[test]
    fn portless_protocols_only_open_everything_when_they_carry_ports() {
        let firewall: GceFirewall = serde_json::from_str(
            r#"{"name": "mixed", "sourceRanges": ["10.0.0.0/8"],
                "allowed": [{"IPProtocol": "icmp"}, {"IPProtocol": "esp"}, {"IPProtocol": "UDP"}]}"#,
        )
        .unwrap();
        let rules = firewall.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].protocol, "UDP");
        assert_eq!(rules[0].ports, PortSpec::Any);

        let icmp_only: GceFirewall = serde_json::from_str(
            r#"{"name": "ping", "sourceRanges": ["10.0.0.0/8"], "allowed": [{"IPProtocol": "icmp"}]}"#,
        )
        .unwrap();
        assert_eq!(risk::assess_rules(&icmp_only.rules()), Risk::Low);
    }

    const NETWORKS: &str = r#"[{
      "name": "default",
      "autoCreateSubnetworks": true,
      "subnetworks": [
        "https://www.googleapis.com/compute/v1/projects/acme/regions/us-central1/subnetworks/default",
        "https://www.googleapis.com/compute/v1/projects/acme/regions/europe-west1/subnetworks/default"
      ],
      "routingConfig": {"routingMode": "REGIONAL"}
    }]"#;

    const ADDRESSES: &str = r#"[
      {"name": "api-ip", "address": "34.1.2.3", "status": "IN_USE", "addressType": "EXTERNAL",
       "region": "https://www.googleapis.com/compute/v1/projects/acme/regions/us-central1"},
      {"name": "batch-ip", "address": "35.9.9.9", "status": "RESERVED", "addressType": "EXTERNAL",
       "region": "projects/acme/regions/europe-west1"},
      {"name": "lb-ip", "address": "34.120.0.1", "status": "IN_USE", "addressType": "EXTERNAL"}
    ]"#;

    const FORWARDING: &str = r#"[
      {"name": "api-lb", "IPAddress": "34.1.2.3", "IPProtocol": "TCP", "portRange": "443-443",
       "target": "projects/acme/regions/us-central1/targetPools/api-pool",
       "region": "projects/acme/regions/us-central1"},
      {"name": "web-global", "IPAddress": "34.120.0.1", "IPProtocol": "TCP", "portRange": "80-8080",
       "target": "projects/acme/global/targetHttpProxies/web"}
    ]"#;

    const DISKS: &str = r#"[
      {"name": "api-1", "sizeGb": "20", "type": "projects/acme/zones/us-central1-a/diskTypes/pd-balanced",
       "status": "READY", "zone": "projects/acme/zones/us-central1-a",
       "users": ["projects/acme/zones/us-central1-a/instances/api-1"]},
      {"name": "scratch", "sizeGb": 500, "zone": "projects/acme/zones/europe-west1-b"}
    ]"#;

    const IMAGES: &str = r#"[{"name": "golden-2024", "status": "READY", "diskSizeGb": "10", "family": "golden"}]"#;

    async fn collect_everything(zone: Option<&str>) -> Vec<AssetRecord> {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [
            ("gcp_instances.json", INSTANCES),
            ("gcp_networks.json", NETWORKS),
            ("gcp_addresses.json", ADDRESSES),
            ("gcp_forwarding_rules.json", FORWARDING),
            ("gcp_disks.json", DISKS),
            ("gcp_images.json", IMAGES),
        ] {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        GcpCollector::new(
            Arc::new(SnapshotDir::new(dir.path())),
            String::from("acme"),
            zone.map(String::from),
        )
        .collect()
        .await
        .unwrap()
    }

    fn text(record: &AssetRecord, key: &str) -> String {
        match record.extension(key) {
            Some(Extension::Text(value)) => value.clone(),
            other => panic!("{}.{key}: {other:?}", record.name),
        }
    }

    #[tokio::test]
    async fn project_resources_are_collected() {
        let records = collect_everything(None).await;
        let kinds: Vec<Kind> = records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [
                Kind::ComputeInstance,
                Kind::ComputeInstance,
                Kind::VirtualNetwork,
                Kind::ReservedAddress,
                Kind::ReservedAddress,
                Kind::ReservedAddress,
                Kind::ForwardingRule,
                Kind::ForwardingRule,
                Kind::Volume,
                Kind::Volume,
                Kind::MachineImage
            ]
        );
        assert!(records.iter().all(|r| r.partition == "acme"));

        let network = &records[2];
        assert_eq!(text(network, "routing_mode"), "REGIONAL");
        assert_eq!(
            network.extension("subnets"),
            Some(&Extension::List(vec![String::from("default"), String::from("default")]))
        );
        assert_eq!(network.extension("auto_create_subnetworks"), Some(&Extension::Flag(true)));

        let reserved = &records[3];
        assert!(reserved.address.is_none());
        assert_eq!(text(reserved, "ip"), "34.1.2.3");
        assert_eq!(text(reserved, "scope"), "regional");
        assert_eq!(text(reserved, "region"), "us-central1");
        assert_eq!(text(&records[5], "scope"), "global");

        let lb = &records[6];
        assert_eq!(lb.ports.to_string(), "443");
        assert_eq!(text(lb, "target"), "api-pool");
        assert_eq!(records[7].ports.to_string(), "80-8080");

        let disk = &records[8];
        assert_eq!(disk.extension("size_gb"), Some(&Extension::Number(20)));
        assert_eq!(text(disk, "disk_type"), "pd-balanced");
        assert_eq!(disk.extension("users"), Some(&Extension::List(vec![String::from("api-1")])));
        assert_eq!(records[9].extension("size_gb"), Some(&Extension::Number(500)));

        let image = &records[10];
        assert_eq!(text(image, "family"), "golden");
        assert_eq!(image.extension("disk_size_gb"), Some(&Extension::Number(10)));
    }

    #[tokio::test]
    async fn a_zone_narrows_regional_and_zonal_resources() {
        let records = collect_everything(Some("us-central1-a")).await;
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            ["api-1", "default", "api-ip", "lb-ip", "api-lb", "web-global", "api-1", "golden-2024"]
        );
    }

    #[tokio::test]
    async fn reserved_addresses_do_not_swallow_instances() {
        let records = discovr_common::model::reconcile(collect_everything(None).await);
        assert!(records.iter().any(|r| r.name == "api-ip"));
        assert!(records.iter().any(|r| r.kind == Kind::ComputeInstance && r.name == "api-1"));
    }

    #[test]
    fn zone_region() {
        let source: Arc<dyn DocumentSource> = Arc::new(SnapshotDir::new("/nonexistent"));
        let zoned = GcpCollector::new(source.clone(), String::from("acme"), Some(String::from("europe-west1-b")));
        assert_eq!(zoned.region(), Some("europe-west1"));
        assert!(zoned.in_region(None));
        assert!(!zoned.in_region(Some("regions/us-central1")));
        assert_eq!(GcpCollector::new(source, String::from("acme"), None).region(), None);
    }

    #[test]
    fn egress_and_implicit_sources() {
        let firewall: GceFirewall = serde_json::from_str(
            r#"{"name": "out", "direction": "EGRESS", "allowed": [{"IPProtocol": "all"}]}"#,
        )
        .unwrap();
        let rules = firewall.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].direction, Direction::Outbound);
        assert_eq!(rules[0].source, IMPLICIT_SOURCE);
        assert_eq!(rules[0].ports, PortSpec::Any);
    }
}
