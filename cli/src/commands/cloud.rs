use std::path::PathBuf;

use discovr_common::config::Config;
use discovr_core::collectors::{ProviderConfig, SourceConfig};

use crate::commands::{CloudProvider, report::{self, Inventory}};

pub async fn cloud(provider: &CloudProvider, cfg: &Config) -> Inventory {
    report::collect(provider_config(provider), cfg).await
}

pub fn source(snapshot: Option<&PathBuf>) -> SourceConfig {
    match snapshot {
        Some(dir) => SourceConfig::Snapshot(dir.clone()),
        None => SourceConfig::Live,
    }
}

fn provider_config(provider: &CloudProvider) -> ProviderConfig {
    match provider {
        CloudProvider::Aws {
            profile,
            region,
            snapshot,
        } => ProviderConfig::Aws {
            profile: profile.clone(),
            region: region.clone(),
            source: source(snapshot.as_ref()),
        },
        CloudProvider::Azure {
            subscription,
            snapshot,
        } => ProviderConfig::Azure {
            subscription: subscription.clone(),
            source: source(snapshot.as_ref()),
        },
        CloudProvider::Gcp {
            project,
            zone,
            snapshot,
        } => ProviderConfig::Gcp {
            project: project.clone(),
            zone: zone.clone(),
            source: source(snapshot.as_ref()),
        },
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
    fn snapshot_flag_selects_the_source() {
        let provider = CloudProvider::Aws {
            profile: None,
            region: Some(String::from("eu-west-1")),
            snapshot: Some(PathBuf::from("/srv/inventory")),
        };
        assert_eq!(
            provider_config(&provider),
            ProviderConfig::Aws {
                profile: None,
                region: Some(String::from("eu-west-1")),
                source: SourceConfig::Snapshot(PathBuf::from("/srv/inventory")),
            }
        );
        assert_eq!(source(None), SourceConfig::Live);
    }
}
