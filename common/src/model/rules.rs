//! Firewall / security-group rules carried by rule-set assets.

use serde::{Deserialize, Serialize};

use super::ports::PortSpec;

/// Sources that admit traffic from anywhere.
const OPEN_SOURCES: &[&str] = &["*", "any", "internet", "0.0.0.0/0", "::/0"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// Accepts the vocabulary of every provider (`Inbound`, `INGRESS`, `egress`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbound" | "ingress" => Some(Direction::Inbound),
            "outbound" | "egress" => Some(Direction::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" | "allowed" => Some(Access::Allow),
            "deny" | "denied" => Some(Access::Deny),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityRule {
    pub name: String,
    pub priority: Option<u32>,
    pub direction: Direction,
    pub access: Access,
    pub protocol: String,
    pub source: String,
    pub ports: PortSpec,
}

impl SecurityRule {
    pub fn new(name: impl Into<String>, direction: Direction, access: Access) -> Self {
        Self {
            name: name.into(),
            priority: None,
            direction,
            access,
            protocol: String::from("*"),
            source: String::from("*"),
            ports: PortSpec::Any,
        }
    }

    pub fn with_ports(mut self, ports: PortSpec) -> Self {
        self.ports = ports;
        self
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn is_inbound_allow(&self) -> bool {
        self.direction == Direction::Inbound && self.access == Access::Allow
    }

    pub fn has_unrestricted_source(&self) -> bool {
        let source = self.source.trim().to_ascii_lowercase();
        OPEN_SOURCES.contains(&source.as_str())
    }

    pub fn has_unrestricted_ports(&self) -> bool {
        self.ports.is_unrestricted()
    }

    pub fn exposes_any(&self, ports: &[u16]) -> bool {
        self.ports.intersects(ports)
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

    #[test]
    fn provider_vocabulary_is_understood() {
        assert_eq!(Direction::parse("INGRESS"), Some(Direction::Inbound));
        assert_eq!(Direction::parse("Outbound"), Some(Direction::Outbound));
        assert_eq!(Direction::parse("sideways"), None);
        assert_eq!(Access::parse("Allow"), Some(Access::Allow));
        assert_eq!(Access::parse("denied"), Some(Access::Deny));
    }

    #[test]
    fn open_sources_are_unrestricted() {
        for source in ["*", "Any", "Internet", "0.0.0.0/0", "::/0"] {
            let rule = SecurityRule::new("r", Direction::Inbound, Access::Allow).from_source(source);
            assert!(rule.has_unrestricted_source(), "{source} should be open");
        }

        let rule = SecurityRule::new("r", Direction::Inbound, Access::Allow)
            .from_source("10.0.0.0/8");
        assert!(!rule.has_unrestricted_source());
    }

    #[test]
    fn only_inbound_allow_counts() {
        let inbound = SecurityRule::new("a", Direction::Inbound, Access::Allow);
        let denied = SecurityRule::new("b", Direction::Inbound, Access::Deny);
        let outbound = SecurityRule::new("c", Direction::Outbound, Access::Allow);

        assert!(inbound.is_inbound_allow());
        assert!(!denied.is_inbound_allow());
        assert!(!outbound.is_inbound_allow());
    }
}
