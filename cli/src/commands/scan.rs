use std::sync::Arc;
use std::time::Duration;

use is_root::is_root;

use discovr_common::config::Config;
use discovr_common::{info, warn};
use discovr_core::scanner::connect::ConnectProber;
use discovr_core::scanner::nmap::{NameLookup, NmapProber};
use discovr_core::scanner::resolver::ReverseResolver;
use discovr_core::{HostProber, ProbeMode, ScanControl, ScanRequest, Scanner};

use crate::commands::{ProberKind, ScanArgs, report::Inventory};
use crate::terminal::{input::KeyListener, spinner::SpinnerHandle};

pub async fn scan(args: &ScanArgs, cfg: &Config) -> anyhow::Result<Inventory> {
    let request = ScanRequest::parse(&args.target, args.ports.as_deref(), args.workers)?;
    let prober = select_prober(args, cfg).await?;

    if matches!(request.mode(), ProbeMode::Fingerprint) && prober.name() == "nmap" && !is_root() {
        warn!("OS fingerprinting usually needs root, nmap may refuse to run");
    }

    let spinner = SpinnerHandle::start(cfg.quiet >= 2, !cfg.disable_input);
    let mut control = ScanControl::new().on_host_found(spinner.host_counter());
    if let Some(secs) = args.budget {
        control = control.with_budget(Duration::from_secs(secs));
    }
    let listener = KeyListener::spawn(control.stop_handle(), cfg.disable_input);

    let outcome = Scanner::new(prober).with_control(control).run(request).await;

    drop(listener);
    spinner.finish_and_clear();
    Ok(Inventory::from(outcome))
}

async fn select_prober(args: &ScanArgs, cfg: &Config) -> anyhow::Result<Arc<dyn HostProber>> {
    let nmap = NmapProber::new().with_lookup(name_lookup(cfg));
    match args.prober {
        ProberKind::Nmap => {
            anyhow::ensure!(nmap.is_available().await, "nmap is not installed or not on PATH");
            Ok(Arc::new(nmap))
        }
        ProberKind::Connect => Ok(Arc::new(connect_prober(args, cfg))),
        ProberKind::Auto => {
            if nmap.is_available().await {
                Ok(Arc::new(nmap))
            } else {
                info!("nmap not found, probing with TCP connects");
                Ok(Arc::new(connect_prober(args, cfg)))
            }
        }
    }
}

fn connect_prober(args: &ScanArgs, cfg: &Config) -> ConnectProber {
    let prober = ConnectProber::new().with_timeout(Duration::from_millis(args.connect_timeout));
    if cfg.no_dns {
        return prober;
    }
    let resolver = match cfg.dns_server {
        Some(server) => ReverseResolver::new(server),
        None => ReverseResolver::system(),
    };
    prober.with_resolver(resolver)
}

/// `--no-dns` wins over `--dns-server`, as for the connect prober.
fn name_lookup(cfg: &Config) -> NameLookup {
    if cfg.no_dns {
        return NameLookup::Disabled;
    }
    match cfg.dns_server {
        Some(server) => NameLookup::Server(server),
        None => NameLookup::System,
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
    fn dns_flags_reach_nmap() {
        let server = "9.9.9.9".parse().unwrap();
        let cfg = Config {
            dns_server: Some(server),
            ..Config::default()
        };
        assert_eq!(name_lookup(&cfg), NameLookup::Server(server));

        let cfg = Config {
            no_dns: true,
            dns_server: Some(server),
            ..Config::default()
        };
        assert_eq!(name_lookup(&cfg), NameLookup::Disabled);
        assert_eq!(name_lookup(&Config::default()), NameLookup::System);
    }
}
