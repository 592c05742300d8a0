use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;

use discovr_common::model::{Risk, Tag};
use discovr_core::export::{self, ExportFormat};
use discovr_core::scanner::connect::ConnectProber;
use discovr_core::{HostProber, ProbeMode, ProbeReport, Scanner, assess, group};

/// Answers from a fixed table, like a lab network would.
struct LabProber {
    hosts: BTreeMap<IpAddr, ProbeReport>,
}

impl LabProber {
    fn new(reports: Vec<ProbeReport>) -> Self {
        Self {
            hosts: reports.into_iter().map(|r| (r.address, r)).collect(),
        }
    }
}

#[async_trait]
impl HostProber for LabProber {
    async fn probe(&self, addr: IpAddr, _mode: &ProbeMode) -> anyhow::Result<Option<ProbeReport>> {
        Ok(self.hosts.get(&addr).cloned())
    }

    fn name(&self) -> &'static str {
        "lab"
    }
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[tokio::test]
async fn scan_assess_group_export() {
    let prober = LabProber::new(vec![
        ProbeReport::new(ip("192.168.1.1"))
            .with_hostname("HR-PC01")
            .with_os("Windows 10 Pro")
            .with_ports([135, 445]),
        ProbeReport::new(ip("192.168.1.2"))
            .with_hostname("lobby-camera")
            .with_ports([80, 554]),
    ]);

    let outcome = Scanner::new(Arc::new(prober))
        .scan("192.168.1.0/30", None, 2)
        .await
        .unwrap();
    assert_eq!(outcome.attempted, 2);
    assert_eq!(outcome.assets.len(), 2);

    let grouping = group(assess(outcome.assets));
    assert_eq!(grouping.len(), 1);

    let subnet = grouping.get("192.168.1.0/24").unwrap();
    assert_eq!(subnet.summary.total, 2);
    assert_eq!(subnet.summary.high, 1);

    let by_name: BTreeMap<&str, (Tag, Risk)> = subnet
        .assets
        .iter()
        .map(|a| (a.record.name.as_str(), (a.tag, a.risk)))
        .collect();
    assert_eq!(by_name["HR-PC01"], (Tag::Workstation, Risk::Medium));
    assert_eq!(by_name["lobby-camera"], (Tag::IoT, Risk::High));

    let dir = tempfile::tempdir().unwrap();
    let path = export::export_path(dir.path(), "scan", "20261016_101500", ExportFormat::Csv);
    let assets: Vec<_> = grouping.assets().cloned().collect();
    export::export(&assets, ExportFormat::Csv, &path).unwrap();

    let csv = std::fs::read_to_string(&path).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("HR-PC01,Windows 10 Pro,\"135,445\",host,network,192.168.1.0/24,Workstation,Medium"));
}

#[tokio::test]
async fn silent_range_is_empty_not_an_error() {
    let outcome = Scanner::new(Arc::new(LabProber::new(Vec::new())))
        .scan("10.9.8.0/29", Some("22"), 4)
        .await
        .unwrap();
    assert_eq!(outcome.attempted, 6);
    assert!(group(assess(outcome.assets)).is_empty());
}

#[tokio::test]
async fn malformed_input_fails_before_probing() {
    let scanner = Scanner::new(Arc::new(LabProber::new(Vec::new())));
    assert!(scanner.scan("10.0.0.0/33", None, 1).await.is_err());
    assert!(scanner.scan("10.0.0.1", Some("http"), 1).await.is_err());
}

#[tokio::test]
async fn connect_scan_finds_loopback_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let outcome = Scanner::new(Arc::new(ConnectProber::new()))
        .scan("127.0.0.1", Some(&port.to_string()), 1)
        .await
        .unwrap();

    assert_eq!(outcome.assets.len(), 1);
    let host = &outcome.assets[0];
    assert_eq!(host.address, Some(ip("127.0.0.1")));
    assert!(host.ports.contains(port));
    assert_eq!(host.partition, "127.0.0.0/24");
}

#[tokio::test]
#[cfg(target_os = "linux")]
async fn connect_scan_counts_refusals_as_alive() {
    // Port 1 is closed on loopback, every address answers with a reset.
    let outcome = Scanner::new(Arc::new(ConnectProber::new()))
        .scan("127.0.0.1-3", Some("1"), 3)
        .await
        .unwrap();

    assert_eq!(outcome.assets.len(), 3);
    assert!(outcome.assets.iter().all(|host| host.ports.is_empty()));
}
