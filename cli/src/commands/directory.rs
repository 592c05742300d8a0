use discovr_common::config::Config;
use discovr_core::collectors::ProviderConfig;

use crate::commands::{DirectoryArgs, cloud, report::{self, Inventory}};

pub const PASSWORD_VAR: &str = "DISCOVR_AD_PASSWORD";

pub async fn directory(args: &DirectoryArgs, cfg: &Config) -> Inventory {
    let password = std::env::var(PASSWORD_VAR).ok().filter(|p| !p.is_empty());
    if args.user.is_some() && password.is_none() {
        discovr_common::warn!("--user given without {PASSWORD_VAR}, binding without a password");
    }

    let config = ProviderConfig::ActiveDirectory {
        domain: args.domain.clone(),
        user: args.user.clone(),
        password,
        resolve: !cfg.no_dns,
        source: cloud::source(args.snapshot.as_ref()),
    };
    report::collect(config, cfg).await
}
