use std::path::Path;

use discovr_common::model::{Kind, Risk};
use discovr_core::collectors::{self, Collector, ProviderConfig, SourceConfig};
use discovr_core::export::{self, ExportFormat};
use discovr_core::{assess, group};

const EC2_INSTANCES: &str = r#"{
  "Reservations": [{
    "Instances": [{
      "InstanceId": "i-0legacy",
      "PrivateIpAddress": "10.0.2.20",
      "PlatformDetails": "Windows Server 2008 R2",
      "State": {"Name": "running"},
      "Placement": {"AvailabilityZone": "us-east-1c"},
      "SecurityGroups": [{"GroupId": "sg-open"}],
      "Tags": [{"Key": "Name", "Value": "erp-legacy"}]
    }]
  }]
}"#;

const SECURITY_GROUPS: &str = r#"{
  "SecurityGroups": [{
    "GroupId": "sg-open",
    "GroupName": "open",
    "IpPermissions": [
      {"IpProtocol": "tcp", "FromPort": 3389, "ToPort": 3389, "IpRanges": [{"CidrIp": "0.0.0.0/0"}]}
    ]
  }]
}"#;

const COMPUTERS: &str = "\
dn: CN=HR-PC01,OU=Workstations,DC=corp,DC=local
cn: HR-PC01
operatingSystem: Windows 10 Pro

dn: CN=FILES,OU=Servers,DC=corp,DC=local
cn: FILES
dNSHostName: files.corp.local
operatingSystem: Windows Server 2019 Standard
";

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

fn providers(aws: &Path, ad: &Path, missing: &Path) -> Vec<Box<dyn Collector>> {
    vec![
        ProviderConfig::Aws {
            profile: None,
            region: None,
            source: SourceConfig::Snapshot(aws.to_path_buf()),
        }
        .collector(),
        ProviderConfig::ActiveDirectory {
            domain: String::from("corp.local"),
            user: None,
            password: None,
            resolve: false,
            source: SourceConfig::Snapshot(ad.to_path_buf()),
        }
        .collector(),
        // No documents at all: logged, counted as empty.
        ProviderConfig::Gcp {
            project: String::from("acme"),
            zone: None,
            source: SourceConfig::Snapshot(missing.to_path_buf()),
        }
        .collector(),
    ]
}

#[tokio::test]
async fn snapshots_to_grouped_report() {
    let aws = tempfile::tempdir().unwrap();
    write(aws.path(), "ec2_instances.json", EC2_INSTANCES);
    write(aws.path(), "ec2_security_groups.json", SECURITY_GROUPS);
    let ad = tempfile::tempdir().unwrap();
    write(ad.path(), "ad_computers.ldif", COMPUTERS);
    let missing = tempfile::tempdir().unwrap();

    let records = collectors::collect_all(&providers(aws.path(), ad.path(), missing.path())).await;
    assert_eq!(records.len(), 4);

    let grouping = group(assess(records));
    let keys: Vec<&str> = grouping.partitions().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["corp.local", "us-east-1"]);

    let region = grouping.get("us-east-1").unwrap();
    assert_eq!(region.summary.total, 2);
    assert_eq!(region.summary.critical, 2);
    assert_eq!(region.summary.by_kind[&Kind::SecurityGroup], 1);

    let domain = grouping.get("CORP.LOCAL").unwrap();
    let files = domain
        .assets
        .iter()
        .find(|a| a.record.name == "files.corp.local")
        .unwrap();
    assert_eq!(files.risk, Risk::Medium);

    let totals = grouping.totals();
    assert_eq!(totals.total, 4);

    let out = tempfile::tempdir().unwrap();
    let path = export::export_path(out.path(), "inventory", "20261016_101500", ExportFormat::Json);
    let assets: Vec<_> = grouping.assets().cloned().collect();
    export::export(&assets, ExportFormat::Json, &path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let exported = json.as_array().unwrap();
    assert_eq!(exported.len(), 4);
    assert!(exported.iter().any(|a| a["name"] == "sg-open" && a["risk"] == "Critical"));
}
