use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::ports::PortSet;
use super::rules::SecurityRule;

/// Placeholder for undetermined names and operating systems.
pub const UNKNOWN: &str = "Unknown";

/// Extension key holding a rule-set asset's [`SecurityRule`]s.
pub const SECURITY_RULES: &str = "security_rules";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    Host,
    Ec2Instance,
    SecurityGroup,
    VirtualMachine,
    StorageBucket,
    DirectoryComputer,
    ComputeInstance,
    FirewallRule,
    Volume,
    DatabaseInstance,
    KubernetesCluster,
    IamUser,
    IamRole,
    VirtualNetwork,
    ResourceGroup,
    ReservedAddress,
    ForwardingRule,
    MachineImage,
}

impl Kind {
    /// Kinds whose exposure is described by a rule set rather than by open ports.
    pub fn is_rule_set(&self) -> bool {
        matches!(self, Kind::SecurityGroup | Kind::FirewallRule)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Host => "host",
            Kind::Ec2Instance => "ec2-instance",
            Kind::SecurityGroup => "security-group",
            Kind::VirtualMachine => "virtual-machine",
            Kind::StorageBucket => "storage-bucket",
            Kind::DirectoryComputer => "directory-computer",
            Kind::ComputeInstance => "compute-instance",
            Kind::FirewallRule => "firewall-rule",
            Kind::Volume => "volume",
            Kind::DatabaseInstance => "database-instance",
            Kind::KubernetesCluster => "kubernetes-cluster",
            Kind::IamUser => "iam-user",
            Kind::IamRole => "iam-role",
            Kind::VirtualNetwork => "virtual-network",
            Kind::ResourceGroup => "resource-group",
            Kind::ReservedAddress => "reserved-address",
            Kind::ForwardingRule => "forwarding-rule",
            Kind::MachineImage => "machine-image",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The collector that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    Network,
    Aws,
    Azure,
    Gcp,
    ActiveDirectory,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Network => "network",
            Origin::Aws => "aws",
            Origin::Azure => "azure",
            Origin::Gcp => "gcp",
            Origin::ActiveDirectory => "active-directory",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-specific attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extension {
    Flag(bool),
    Number(i64),
    Text(String),
    List(Vec<String>),
    Labels(BTreeMap<String, String>),
    Rules(Vec<SecurityRule>),
}

impl From<bool> for Extension {
    fn from(value: bool) -> Self {
        Extension::Flag(value)
    }
}

impl From<i64> for Extension {
    fn from(value: i64) -> Self {
        Extension::Number(value)
    }
}

impl From<&str> for Extension {
    fn from(value: &str) -> Self {
        Extension::Text(value.to_string())
    }
}

impl From<String> for Extension {
    fn from(value: String) -> Self {
        Extension::Text(value)
    }
}

impl From<Vec<String>> for Extension {
    fn from(value: Vec<String>) -> Self {
        Extension::List(value)
    }
}

impl From<BTreeMap<String, String>> for Extension {
    fn from(value: BTreeMap<String, String>) -> Self {
        Extension::Labels(value)
    }
}

impl From<Vec<SecurityRule>> for Extension {
    fn from(value: Vec<SecurityRule>) -> Self {
        Extension::Rules(value)
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extension::Flag(flag) => write!(f, "{}", if *flag { "yes" } else { "no" }),
            Extension::Number(number) => write!(f, "{number}"),
            Extension::Text(text) => f.write_str(text),
            Extension::List(items) => f.write_str(&items.join(";")),
            Extension::Labels(labels) => {
                let pairs: Vec<String> = labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
                f.write_str(&pairs.join(";"))
            }
            Extension::Rules(rules) => write!(f, "{} rules", rules.len()),
        }
    }
}

/// Identity of an asset within one collector's result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKey {
    Address(IpAddr),
    Name(String),
}

/// One discovered device or cloud resource, normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub address: Option<IpAddr>,
    pub name: String,
    pub operating_system: String,
    pub ports: PortSet,
    pub kind: Kind,
    pub origin: Origin,
    pub partition: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, Extension>,
}

impl AssetRecord {
    pub fn new(kind: Kind, origin: Origin) -> Self {
        Self {
            address: None,
            name: String::new(),
            operating_system: UNKNOWN.to_string(),
            ports: PortSet::new(),
            kind,
            origin,
            partition: String::new(),
            extensions: BTreeMap::new(),
        }
    }

    pub fn with_address(mut self, address: IpAddr) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Blank strings keep the `Unknown` placeholder.
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        let os: String = os.into();
        if !os.trim().is_empty() {
            self.operating_system = os.trim().to_string();
        }
        self
    }

    pub fn with_ports(mut self, ports: PortSet) -> Self {
        self.ports = ports;
        self
    }

    pub fn in_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = partition.into();
        self
    }

    pub fn with_extension(mut self, key: &str, value: impl Into<Extension>) -> Self {
        self.extensions.insert(key.to_string(), value.into());
        self
    }

    pub fn with_rules(self, rules: Vec<SecurityRule>) -> Self {
        self.with_extension(SECURITY_RULES, rules)
    }

    /// `None` when neither an address nor a name identifies the record.
    pub fn key(&self) -> Option<AssetKey> {
        if let Some(address) = self.address {
            return Some(AssetKey::Address(address));
        }
        let name = self.name.trim();
        if name.is_empty() {
            None
        } else {
            Some(AssetKey::Name(name.to_string()))
        }
    }

    pub fn security_rules(&self) -> &[SecurityRule] {
        match self.extensions.get(SECURITY_RULES) {
            Some(Extension::Rules(rules)) => rules,
            _ => &[],
        }
    }

    pub fn extension(&self, key: &str) -> Option<&Extension> {
        self.extensions.get(key)
    }

    pub fn display_address(&self) -> String {
        self.address
            .map(|address| address.to_string())
            .unwrap_or_else(|| String::from("N/A"))
    }

    pub fn os_is_unknown(&self) -> bool {
        let os = self.operating_system.trim();
        os.is_empty() || os.eq_ignore_ascii_case(UNKNOWN)
    }
}
