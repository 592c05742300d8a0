//! Azure inventory of one subscription: virtual machines, network security groups,
//! resource groups and virtual networks.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use discovr_common::model::{
    Access, AssetRecord, Direction, Kind, Origin, PortSet, PortSpec, SecurityRule,
};

use super::{Collector, DocumentSource, Query, fetch_json, fetch_optional};
use crate::error::CollectError;

const AZ: &str = "az";

pub struct AzureCollector {
    source: Arc<dyn DocumentSource>,
    subscription: String,
}

impl AzureCollector {
    pub fn new(source: Arc<dyn DocumentSource>, subscription: String) -> Self {
        Self {
            source,
            subscription,
        }
    }

    fn query(&self, snapshot: &str, args: &[&str]) -> Query {
        Query::new(snapshot, AZ)
            .args(args.iter().copied())
            .args(["--subscription", self.subscription.as_str(), "--output", "json"])
    }
}

#[async_trait]
impl Collector for AzureCollector {
    fn origin(&self) -> Origin {
        Origin::Azure
    }

    async fn collect(&self) -> Result<Vec<AssetRecord>, CollectError> {
        if self.subscription.trim().is_empty() {
            return Err(CollectError::Config {
                provider: Origin::Azure,
                reason: String::from("a subscription id is required"),
            });
        }

        let source = self.source.as_ref();
        let vms: Vec<AzureVm> = fetch_json(
            source,
            Origin::Azure,
            "virtual machines",
            &self.query("azure_vms.json", &["vm", "list", "--show-details"]),
        )
        .await?;
        let nsgs: Vec<AzureNsg> = fetch_optional(
            source,
            Origin::Azure,
            "network security groups",
            &self.query("azure_nsgs.json", &["network", "nsg", "list"]),
        )
        .await;

        let nsg_rules: Vec<Vec<SecurityRule>> = nsgs.iter().map(AzureNsg::rules).collect();

        // NIC id -> index of the NSG guarding it
        let mut guarded_by: HashMap<String, usize> = HashMap::new();
        for (index, nsg) in nsgs.iter().enumerate() {
            for nic in &nsg.network_interfaces {
                guarded_by.insert(nic.id.to_lowercase(), index);
            }
        }

        let mut records: Vec<AssetRecord> = vms
            .iter()
            .map(|vm| {
                let attached: Vec<usize> = vm
                    .nic_ids()
                    .filter_map(|nic| guarded_by.get(&nic.to_lowercase()).copied())
                    .collect();
                let ports: PortSet = attached
                    .iter()
                    .flat_map(|&i| nsg_rules[i].iter())
                    .filter(|rule| rule.is_inbound_allow())
                    .map(|rule| rule.ports)
                    .collect();
                let nsg_names: Vec<String> = attached.iter().map(|&i| nsgs[i].name.clone()).collect();
                vm_record(vm, ports, nsg_names)
            })
            .collect();

        records.extend(
            nsgs.iter()
                .zip(nsg_rules)
                .map(|(nsg, rules)| nsg_record(nsg, rules)),
        );

        let groups: Vec<ResourceGroup> = fetch_optional(
            source,
            Origin::Azure,
            "resource groups",
            &self.query("azure_groups.json", &["group", "list"]),
        )
        .await;
        let vnets: Vec<AzureVnet> = fetch_optional(
            source,
            Origin::Azure,
            "virtual networks",
            &self.query("azure_vnets.json", &["network", "vnet", "list"]),
        )
        .await;
        records.extend(groups.iter().map(group_record));
        records.extend(vnets.iter().map(vnet_record));
        Ok(records)
    }
}

/// A resource group is its own partition.
fn group_record(group: &ResourceGroup) -> AssetRecord {
    let mut record = AssetRecord::new(Kind::ResourceGroup, Origin::Azure)
        .with_name(group.name.as_str())
        .in_partition(group.name.as_str());
    if let Some(location) = &group.location {
        record = record.with_extension("location", location.as_str());
    }
    if let Some(state) = group.properties.as_ref().and_then(|p| p.provisioning_state.as_deref()) {
        record = record.with_extension("state", state);
    }
    if let Some(tags) = group.tags.as_ref().filter(|t| !t.is_empty()) {
        record = record.with_extension("tags", tags.clone());
    }
    record
}

fn vnet_record(vnet: &AzureVnet) -> AssetRecord {
    let prefixes = vnet
        .address_space
        .as_ref()
        .map(|space| space.address_prefixes.clone())
        .unwrap_or_default();
    let subnets: Vec<String> = vnet.subnets.iter().map(|s| s.name.clone()).collect();
    let dns = vnet
        .dhcp_options
        .as_ref()
        .map(|d| d.dns_servers.clone())
        .unwrap_or_default();

    let mut record = AssetRecord::new(Kind::VirtualNetwork, Origin::Azure)
        .with_name(vnet.name.as_str())
        .in_partition(vnet.resource_group.as_str())
        .with_extension("address_space", prefixes)
        .with_extension("subnets", subnets)
        .with_extension("dns_servers", dns);
    if let Some(location) = &vnet.location {
        record = record.with_extension("location", location.as_str());
    }
    record
}

fn vm_record(vm: &AzureVm, ports: PortSet, nsgs: Vec<String>) -> AssetRecord {
    let os = vm
        .storage_profile
        .as_ref()
        .and_then(|p| p.os_disk.as_ref())
        .and_then(|d| d.os_type.clone())
        .unwrap_or_default();

    let mut record = AssetRecord::new(Kind::VirtualMachine, Origin::Azure)
        .with_name(vm.name.as_str())
        .with_os(os)
        .with_ports(ports)
        .in_partition(vm.resource_group.as_str());

    if let Some(address) = first_ip(vm.private_ips.as_deref()) {
        record = record.with_address(address);
    }
    if let Some(public) = vm.public_ips.as_deref().filter(|p| !p.is_empty()) {
        record = record.with_extension("public_ip", public);
    }
    if let Some(location) = &vm.location {
        record = record.with_extension("location", location.as_str());
    }
    if let Some(state) = &vm.power_state {
        record = record.with_extension("power_state", state.as_str());
    }
    if let Some(size) = vm.hardware_profile.as_ref().and_then(|h| h.vm_size.as_deref()) {
        record = record.with_extension("size", size);
    }
    if !nsgs.is_empty() {
        record = record.with_extension("nsgs", nsgs);
    }
    if let Some(tags) = vm.tags.as_ref().filter(|t| !t.is_empty()) {
        record = record.with_extension("tags", tags.clone());
    }
    record
}

fn nsg_record(nsg: &AzureNsg, rules: Vec<SecurityRule>) -> AssetRecord {
    let inbound: PortSet = rules
        .iter()
        .filter(|rule| rule.is_inbound_allow())
        .map(|rule| rule.ports)
        .collect();
    let nics: Vec<String> = nsg
        .network_interfaces
        .iter()
        .map(|nic| super::last_segment(&nic.id).to_string())
        .collect();

    let mut record = AssetRecord::new(Kind::SecurityGroup, Origin::Azure)
        .with_name(nsg.name.as_str())
        .with_ports(inbound)
        .in_partition(nsg.resource_group.as_str())
        .with_rules(rules);
    if !nics.is_empty() {
        record = record.with_extension("nics", nics);
    }
    if let Some(location) = &nsg.location {
        record = record.with_extension("location", location.as_str());
    }
    record
}

/// `az vm list -d` reports addresses as one comma-separated string.
fn first_ip(ips: Option<&str>) -> Option<IpAddr> {
    ips?.split(',').find_map(|ip| ip.trim().parse().ok())
}

// --- vendor documents ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureVm {
    name: String,
    resource_group: String,
    location: Option<String>,
    private_ips: Option<String>,
    public_ips: Option<String>,
    power_state: Option<String>,
    hardware_profile: Option<HardwareProfile>,
    storage_profile: Option<StorageProfile>,
    network_profile: Option<NetworkProfile>,
    tags: Option<BTreeMap<String, String>>,
}

impl AzureVm {
    fn nic_ids(&self) -> impl Iterator<Item = &str> {
        self.network_profile
            .iter()
            .flat_map(|p| p.network_interfaces.iter())
            .map(|nic| nic.id.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardwareProfile {
    vm_size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageProfile {
    os_disk: Option<OsDisk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OsDisk {
    os_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkProfile {
    #[serde(default)]
    network_interfaces: Vec<ResourceRef>,
}

#[derive(Debug, Deserialize)]
struct ResourceRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureNsg {
    name: String,
    resource_group: String,
    location: Option<String>,
    #[serde(default)]
    security_rules: Vec<AzureRule>,
    #[serde(default)]
    network_interfaces: Vec<ResourceRef>,
}

impl AzureNsg {
    fn rules(&self) -> Vec<SecurityRule> {
        self.security_rules.iter().flat_map(AzureRule::expand).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureRule {
    name: String,
    priority: Option<u32>,
    direction: String,
    access: String,
    protocol: Option<String>,
    source_address_prefix: Option<String>,
    #[serde(default)]
    source_address_prefixes: Vec<String>,
    destination_port_range: Option<String>,
    #[serde(default)]
    destination_port_ranges: Vec<String>,
}

impl AzureRule {
    /// One canonical rule per (source prefix, port range) pair.
    fn expand(&self) -> Vec<SecurityRule> {
        let (Some(direction), Some(access)) =
            (Direction::parse(&self.direction), Access::parse(&self.access))
        else {
            debug!("skipping NSG rule {} with direction {:?} / access {:?}", self.name, self.direction, self.access);
            return Vec::new();
        };

        let sources: Vec<&str> = one_or_many(self.source_address_prefix.as_deref(), &self.source_address_prefixes, "*");
        let ports: Vec<PortSpec> = one_or_many(self.destination_port_range.as_deref(), &self.destination_port_ranges, "*")
            .into_iter()
            .filter_map(|range| match range.parse::<PortSpec>() {
                Ok(spec) => Some(spec),
                Err(e) => {
                    debug!("NSG rule {}: {e}", self.name);
                    None
                }
            })
            .collect();

        let mut rules = Vec::with_capacity(sources.len() * ports.len());
        for source in &sources {
            for spec in &ports {
                let mut rule = SecurityRule::new(self.name.as_str(), direction, access)
                    .with_ports(*spec)
                    .from_source(*source)
                    .with_protocol(self.protocol.as_deref().unwrap_or("*"));
                if let Some(priority) = self.priority {
                    rule = rule.with_priority(priority);
                }
                rules.push(rule);
            }
        }
        rules
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceGroup {
    name: String,
    location: Option<String>,
    properties: Option<GroupProperties>,
    tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupProperties {
    provisioning_state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureVnet {
    name: String,
    resource_group: String,
    location: Option<String>,
    address_space: Option<AddressSpace>,
    dhcp_options: Option<DhcpOptions>,
    #[serde(default)]
    subnets: Vec<Subnet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressSpace {
    #[serde(default)]
    address_prefixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DhcpOptions {
    #[serde(default)]
    dns_servers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Subnet {
    name: String,
}

fn one_or_many<'a>(single: Option<&'a str>, many: &'a [String], fallback: &'a str) -> Vec<&'a str> {
    match single.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => vec![value],
        None if !many.is_empty() => many.iter().map(String::as_str).collect(),
        None => vec![fallback],
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
