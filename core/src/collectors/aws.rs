//! AWS inventory of one region.
//!
//! EC2 instances are the primary document. Security groups, EBS volumes, EKS
//! clusters, S3 buckets, RDS instances and IAM principals are collected when their
//! documents can be read and skipped otherwise.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use discovr_common::model::{
    Access, AssetRecord, Direction, Kind, Origin, PortSet, PortSpec, SecurityRule,
};

use super::{Collector, DocumentSource, Query, fetch_detail, fetch_json, fetch_optional};
use crate::error::CollectError;

pub const DEFAULT_REGION: &str = "us-east-1";
/// Partition of account-wide IAM principals.
const IAM: &str = "iam";
const AWS: &str = "aws";
const UNKNOWN: &str = "Unknown";

pub struct AwsCollector {
    source: Arc<dyn DocumentSource>,
    profile: Option<String>,
    region: String,
}

impl AwsCollector {
    pub fn new(source: Arc<dyn DocumentSource>, profile: Option<String>, region: Option<&str>) -> Self {
        let region = region
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(normalize_region)
            .unwrap_or(DEFAULT_REGION);
        Self {
            source,
            profile,
            region: region.to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn query(&self, snapshot: &str, args: &[&str]) -> Query {
        Query::new(snapshot, AWS)
            .args(args.iter().copied())
            .args(["--output", "json"])
            .opt("--profile", self.profile.as_deref())
            .opt("--region", Some(self.region.as_str()))
    }

    fn instance_record(&self, instance: &Ec2Instance, groups: &HashMap<&str, &Ec2SecurityGroup>) -> AssetRecord {
        let region = instance
            .placement
            .as_ref()
            .and_then(|p| p.availability_zone.as_deref())
            .map(normalize_region)
            .unwrap_or(self.region.as_str());

        let group_ids: Vec<String> = instance
            .security_groups
            .iter()
            .map(|g| g.group_id.clone())
            .collect();
        let ports: PortSet = group_ids
            .iter()
            .filter_map(|id| groups.get(id.as_str()))
            .flat_map(|group| group.ip_permissions.iter())
            .filter_map(IpPermission::port_spec)
            .collect();

        let mut record = AssetRecord::new(Kind::Ec2Instance, Origin::Aws)
            .with_name(instance.display_name())
            .with_os(instance.operating_system())
            .with_ports(ports)
            .in_partition(region)
            .with_extension("instance_id", instance.instance_id.as_str())
            .with_extension("security_groups", group_ids);

        if let Some(address) = instance.address() {
            record = record.with_address(address);
        }
        if let Some(state) = instance.state.as_ref().map(|s| s.name.as_str()) {
            record = record.with_extension("state", state);
        }
        if let Some(instance_type) = &instance.instance_type {
            record = record.with_extension("instance_type", instance_type.as_str());
        }
        if let Some(public_ip) = &instance.public_ip_address {
            record = record.with_extension("public_ip", public_ip.as_str());
        }
        if !instance.tags.is_empty() {
            record = record.with_extension("tags", tag_map(&instance.tags));
        }
        record
    }

    fn group_record(&self, group: &Ec2SecurityGroup) -> AssetRecord {
        let mut rules: Vec<SecurityRule> = Vec::new();
        rules.extend(group.ip_permissions.iter().flat_map(|p| p.rules(Direction::Inbound)));
        rules.extend(
            group
                .ip_permissions_egress
                .iter()
                .flat_map(|p| p.rules(Direction::Outbound)),
        );
        let inbound: PortSet = group
            .ip_permissions
            .iter()
            .filter_map(IpPermission::port_spec)
            .collect();

        let mut record = AssetRecord::new(Kind::SecurityGroup, Origin::Aws)
            .with_name(group.group_id.as_str())
            .with_ports(inbound)
            .in_partition(&self.region)
            .with_rules(rules);
        if let Some(name) = &group.group_name {
            record = record.with_extension("group_name", name.as_str());
        }
        if let Some(description) = &group.description {
            record = record.with_extension("description", description.as_str());
        }
        if let Some(vpc_id) = &group.vpc_id {
            record = record.with_extension("vpc_id", vpc_id.as_str());
        }
        record
    }

    /// Volumes, databases and clusters report a zone; the record goes to its region.
    fn zone_region<'a>(&'a self, zone: Option<&'a str>) -> &'a str {
        zone.map(normalize_region).unwrap_or(self.region.as_str())
    }

    fn volume_record(&self, volume: &EbsVolume) -> AssetRecord {
        let attached: Vec<String> = volume
            .attachments
            .iter()
            .filter_map(|a| a.instance_id.clone())
            .collect();
        let name = name_tag(&volume.tags).unwrap_or(&volume.volume_id);

        let mut record = AssetRecord::new(Kind::Volume, Origin::Aws)
            .with_name(name)
            .in_partition(self.zone_region(volume.availability_zone.as_deref()))
            .with_extension("volume_id", volume.volume_id.as_str())
            .with_extension("attached_instances", attached);
        if let Some(state) = &volume.state {
            record = record.with_extension("state", state.as_str());
        }
        if let Some(size) = volume.size {
            record = record.with_extension("size_gib", size);
        }
        if let Some(encrypted) = volume.encrypted {
            record = record.with_extension("encrypted", encrypted);
        }
        if let Some(volume_type) = &volume.volume_type {
            record = record.with_extension("volume_type", volume_type.as_str());
        }
        if let Some(iops) = volume.iops {
            record = record.with_extension("iops", iops);
        }
        if let Some(throughput) = volume.throughput {
            record = record.with_extension("throughput", throughput);
        }
        if let Some(snapshot) = volume.snapshot_id.as_deref().filter(|s| !s.is_empty()) {
            record = record.with_extension("snapshot_id", snapshot);
        }
        if !volume.tags.is_empty() {
            record = record.with_extension("tags", tag_map(&volume.tags));
        }
        record
    }

    fn database_record(&self, db: &RdsInstance) -> AssetRecord {
        let port = db
            .endpoint
            .as_ref()
            .and_then(|e| e.port)
            .and_then(|p| u16::try_from(p).ok());
        let ports: PortSet = port.map(PortSpec::Single).into_iter().collect();

        let mut record = AssetRecord::new(Kind::DatabaseInstance, Origin::Aws)
            .with_name(db.db_instance_identifier.as_str())
            .with_ports(ports)
            .in_partition(self.zone_region(db.availability_zone.as_deref()));
        if let Some(engine) = &db.engine {
            let engine = match &db.engine_version {
                Some(version) => format!("{engine} {version}"),
                None => engine.clone(),
            };
            record = record.with_extension("engine", engine);
        }
        if let Some(class) = &db.db_instance_class {
            record = record.with_extension("instance_class", class.as_str());
        }
        if let Some(status) = &db.db_instance_status {
            record = record.with_extension("status", status.as_str());
        }
        if let Some(address) = db.endpoint.as_ref().and_then(|e| e.address.as_deref()) {
            record = record.with_extension("endpoint", address);
        }
        if let Some(public) = db.publicly_accessible {
            record = record.with_extension("publicly_accessible", public);
        }
        if let Some(encrypted) = db.storage_encrypted {
            record = record.with_extension("encrypted", encrypted);
        }
        if let Some(multi_az) = db.multi_az {
            record = record.with_extension("multi_az", multi_az);
        }
        if let Some(iam_auth) = db.iam_database_authentication_enabled {
            record = record.with_extension("iam_auth", iam_auth);
        }
        if let Some(storage) = db.allocated_storage {
            record = record.with_extension("allocated_storage_gib", storage);
        }
        if let Some(retention) = db.backup_retention_period {
            record = record.with_extension("backup_retention_days", retention);
        }
        if let Some(user) = &db.master_username {
            record = record.with_extension("master_username", user.as_str());
        }
        if !db.tag_list.is_empty() {
            record = record.with_extension("tags", tag_map(&db.tag_list));
        }
        record
    }

    fn cluster_record(&self, cluster: &EksCluster) -> AssetRecord {
        let mut record = AssetRecord::new(Kind::KubernetesCluster, Origin::Aws)
            .with_name(cluster.name.as_str())
            .in_partition(self.region.as_str());
        if let Some(arn) = &cluster.arn {
            record = record.with_extension("arn", arn.as_str());
        }
        if let Some(status) = &cluster.status {
            record = record.with_extension("status", status.as_str());
        }
        if let Some(version) = &cluster.version {
            record = record.with_extension("version", version.as_str());
        }
        if let Some(endpoint) = &cluster.endpoint {
            record = record.with_extension("endpoint", endpoint.as_str());
        }
        if let Some(role) = &cluster.role_arn {
            record = record.with_extension("role_arn", role.as_str());
        }
        if let Some(vpc) = &cluster.resources_vpc_config {
            if let Some(vpc_id) = &vpc.vpc_id {
                record = record.with_extension("vpc_id", vpc_id.as_str());
            }
            record = record
                .with_extension("subnets", vpc.subnet_ids.clone())
                .with_extension("security_groups", vpc.security_group_ids.clone());
            if let Some(public) = vpc.endpoint_public_access {
                record = record.with_extension("endpoint_public_access", public);
            }
            if !vpc.public_access_cidrs.is_empty() {
                record = record.with_extension("public_access_cidrs", vpc.public_access_cidrs.clone());
            }
        }
        if let Some(created) = &cluster.created_at {
            record = record.with_extension("created", created.as_str());
        }
        if !cluster.tags.is_empty() {
            record = record.with_extension("tags", cluster.tags.clone());
        }
        record
    }

    /// Clusters are listed by name, then described one by one.
    async fn clusters(&self) -> Vec<EksCluster> {
        let source = self.source.as_ref();
        let listed: ListClusters = fetch_optional(
            source,
            Origin::Aws,
            "EKS clusters",
            &self.query("eks_clusters.json", &["eks", "list-clusters"]),
        )
        .await;

        let mut clusters = Vec::new();
        for name in listed.clusters.iter().filter(|n| !n.trim().is_empty()) {
            let query = self.query(
                &format!("eks_cluster_{name}.json"),
                &["eks", "describe-cluster", "--name", name.as_str()],
            );
            match fetch_json::<DescribeCluster>(source, Origin::Aws, "EKS cluster", &query).await {
                Ok(described) => clusters.push(described.cluster),
                Err(e) => debug!("skipping EKS cluster {name}: {e}"),
            }
        }
        clusters
    }

    /// Buckets are account-wide; only those located in the collector's region are kept.
    async fn buckets(&self) -> Vec<AssetRecord> {
        let listed: ListBuckets = fetch_optional(
            self.source.as_ref(),
            Origin::Aws,
            "S3 buckets",
            &self.query("s3_buckets.json", &["s3api", "list-buckets"]),
        )
        .await;

        let mut records = Vec::new();
        for bucket in &listed.buckets {
            let Some(location) = self.bucket_location(&bucket.name).await else {
                debug!("skipping bucket {}: location unknown", bucket.name);
                continue;
            };
            if location != self.region {
                debug!("skipping bucket {} in {location}", bucket.name);
                continue;
            }

            let mut record = AssetRecord::new(Kind::StorageBucket, Origin::Aws)
                .with_name(bucket.name.as_str())
                .in_partition(location.as_str())
                .with_extension("region", location.as_str())
                .with_extension("versioning", self.bucket_versioning(&bucket.name).await)
                .with_extension("encryption", self.bucket_encryption(&bucket.name).await)
                .with_extension("public_access", self.bucket_public_access(&bucket.name).await);
            if let Some(created) = &bucket.creation_date {
                record = record.with_extension("created", created.as_str());
            }
            records.push(record);
        }
        records
    }

    fn bucket_query(&self, bucket: &str, detail: &str, command: &str) -> Query {
        self.query(
            &format!("s3_{bucket}_{detail}.json"),
            &["s3api", command, "--bucket", bucket],
        )
    }

    async fn bucket_location(&self, bucket: &str) -> Option<String> {
        let query = self.bucket_query(bucket, "location", "get-bucket-location");
        let location: BucketLocation =
            fetch_detail(self.source.as_ref(), Origin::Aws, "bucket location", &query).await?;
        Some(location.region())
    }

    async fn bucket_versioning(&self, bucket: &str) -> String {
        let query = self.bucket_query(bucket, "versioning", "get-bucket-versioning");
        fetch_detail::<BucketVersioning>(self.source.as_ref(), Origin::Aws, "bucket versioning", &query)
            .await
            .map(|v| v.status.filter(|s| !s.is_empty()).unwrap_or_else(|| String::from("Disabled")))
            .unwrap_or_else(|| String::from(UNKNOWN))
    }

    async fn bucket_encryption(&self, bucket: &str) -> String {
        let query = self.bucket_query(bucket, "encryption", "get-bucket-encryption");
        fetch_detail::<BucketEncryption>(self.source.as_ref(), Origin::Aws, "bucket encryption", &query)
            .await
            .map(|e| e.algorithm().unwrap_or_else(|| String::from("Enabled")))
            .unwrap_or_else(|| String::from(UNKNOWN))
    }

    async fn bucket_public_access(&self, bucket: &str) -> String {
        let query = self.bucket_query(bucket, "public_access", "get-public-access-block");
        fetch_detail::<PublicAccessBlock>(self.source.as_ref(), Origin::Aws, "public access block", &query)
            .await
            .map(|block| {
                let flags = &block.public_access_block_configuration;
                let blocked = !flags.is_empty() && flags.values().all(|flag| *flag);
                String::from(if blocked { "Blocked" } else { "PartiallyBlocked" })
            })
            .unwrap_or_else(|| String::from(UNKNOWN))
    }
}

#[async_trait]
impl Collector for AwsCollector {
    fn origin(&self) -> Origin {
        Origin::Aws
    }

    async fn collect(&self) -> Result<Vec<AssetRecord>, CollectError> {
        let source = self.source.as_ref();
        let instances: DescribeInstances = fetch_json(
            source,
            Origin::Aws,
            "EC2 instances",
            &self.query("ec2_instances.json", &["ec2", "describe-instances"]),
        )
        .await?;
        let groups: DescribeSecurityGroups = fetch_optional(
            source,
            Origin::Aws,
            "security groups",
            &self.query("ec2_security_groups.json", &["ec2", "describe-security-groups"]),
        )
        .await;
        let volumes: DescribeVolumes = fetch_optional(
            source,
            Origin::Aws,
            "EBS volumes",
            &self.query("ec2_volumes.json", &["ec2", "describe-volumes"]),
        )
        .await;
        let databases: DescribeDbInstances = fetch_optional(
            source,
            Origin::Aws,
            "RDS instances",
            &self.query("rds_instances.json", &["rds", "describe-db-instances"]),
        )
        .await;
        let users: ListUsers = fetch_optional(
            source,
            Origin::Aws,
            "IAM users",
            &self.query("iam_users.json", &["iam", "list-users"]),
        )
        .await;
        let roles: ListRoles = fetch_optional(
            source,
            Origin::Aws,
            "IAM roles",
            &self.query("iam_roles.json", &["iam", "list-roles"]),
        )
        .await;

        let by_id: HashMap<&str, &Ec2SecurityGroup> = groups
            .security_groups
            .iter()
            .map(|g| (g.group_id.as_str(), g))
            .collect();

        let mut records: Vec<AssetRecord> = instances
            .reservations
            .iter()
            .flat_map(|r| r.instances.iter())
            .filter(|i| !i.is_gone())
            .map(|i| self.instance_record(i, &by_id))
            .collect();
        records.extend(groups.security_groups.iter().map(|g| self.group_record(g)));
        records.extend(volumes.volumes.iter().map(|v| self.volume_record(v)));
        records.extend(self.clusters().await.iter().map(|c| self.cluster_record(c)));
        records.extend(self.buckets().await);
        records.extend(databases.db_instances.iter().map(|db| self.database_record(db)));
        records.extend(users.users.iter().map(user_record));
        records.extend(roles.roles.iter().map(role_record));
        Ok(records)
    }
}

/// IAM users and roles share a namespace in the record key, so names carry the
/// principal type the way ARNs do.
fn user_record(user: &IamUser) -> AssetRecord {
    let mut record = AssetRecord::new(Kind::IamUser, Origin::Aws)
        .with_name(format!("user/{}", user.user_name))
        .in_partition(IAM)
        .with_extension("user_name", user.user_name.as_str())
        .with_extension(
            "password_last_used",
            user.password_last_used.as_deref().unwrap_or("Never"),
        );
    if let Some(arn) = &user.arn {
        record = record.with_extension("arn", arn.as_str());
    }
    if let Some(created) = &user.create_date {
        record = record.with_extension("created", created.as_str());
    }
    if !user.tags.is_empty() {
        record = record.with_extension("tags", tag_map(&user.tags));
    }
    record
}

fn role_record(role: &IamRole) -> AssetRecord {
    let mut record = AssetRecord::new(Kind::IamRole, Origin::Aws)
        .with_name(format!("role/{}", role.role_name))
        .in_partition(IAM)
        .with_extension("role_name", role.role_name.as_str());
    if let Some(arn) = &role.arn {
        record = record.with_extension("arn", arn.as_str());
    }
    if let Some(created) = &role.create_date {
        record = record.with_extension("created", created.as_str());
    }
    if let Some(path) = &role.path {
        record = record.with_extension("path", path.as_str());
    }
    if let Some(description) = role.description.as_deref().filter(|d| !d.is_empty()) {
        record = record.with_extension("description", description);
    }
    record
}

/// `us-east-1a` → `us-east-1`. Anything that is not an availability zone is kept.
pub fn normalize_region(region: &str) -> &str {
    let bytes = region.as_bytes();
    let is_zone = bytes.len() >= 2
        && bytes[bytes.len() - 1].is_ascii_alphabetic()
        && bytes[bytes.len() - 2].is_ascii_digit()
        && region.contains('-');
    if is_zone { &region[..region.len() - 1] } else { region }
}

fn tag_map(tags: &[Ec2Tag]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|t| (t.key.clone(), t.value.clone().unwrap_or_default()))
        .collect()
}

fn name_tag(tags: &[Ec2Tag]) -> Option<&str> {
    tags.iter()
        .find(|t| t.key.eq_ignore_ascii_case("name"))
        .and_then(|t| t.value.as_deref())
        .filter(|v| !v.trim().is_empty())
}

// --- vendor documents ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstances {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Ec2Instance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Instance {
    instance_id: String,
    instance_type: Option<String>,
    private_ip_address: Option<String>,
    public_ip_address: Option<String>,
    platform_details: Option<String>,
    platform: Option<String>,
    image_id: Option<String>,
    state: Option<InstanceState>,
    placement: Option<Placement>,
    #[serde(default)]
    security_groups: Vec<GroupRef>,
    #[serde(default)]
    tags: Vec<Ec2Tag>,
}

impl Ec2Instance {
    fn is_gone(&self) -> bool {
        matches!(
            self.state.as_ref().map(|s| s.name.as_str()),
            Some("terminated" | "shutting-down")
        )
    }

    fn display_name(&self) -> &str {
        name_tag(&self.tags).unwrap_or(&self.instance_id)
    }

    fn operating_system(&self) -> String {
        if let Some(details) = self.platform_details.as_deref().filter(|d| !d.is_empty()) {
            return details.to_string();
        }
        match self.platform.as_deref() {
            Some(p) if p.eq_ignore_ascii_case("windows") => String::from("Windows"),
            Some(p) if !p.is_empty() => p.to_string(),
            _ => self.image_id.clone().unwrap_or_default(),
        }
    }

    fn address(&self) -> Option<IpAddr> {
        self.private_ip_address
            .as_deref()
            .or(self.public_ip_address.as_deref())
            .and_then(|ip| ip.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceState {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Placement {
    availability_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GroupRef {
    group_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2Tag {
    key: String,
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSecurityGroups {
    #[serde(default)]
    security_groups: Vec<Ec2SecurityGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Ec2SecurityGroup {
    group_id: String,
    group_name: Option<String>,
    description: Option<String>,
    vpc_id: Option<String>,
    #[serde(default)]
    ip_permissions: Vec<IpPermission>,
    #[serde(default)]
    ip_permissions_egress: Vec<IpPermission>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IpPermission {
    ip_protocol: String,
    from_port: Option<i32>,
    to_port: Option<i32>,
    #[serde(default)]
    ip_ranges: Vec<IpRange>,
    #[serde(default)]
    ipv6_ranges: Vec<Ipv6Range>,
    #[serde(default)]
    user_id_group_pairs: Vec<GroupRef>,
}

impl IpPermission {
    /// `None` for permissions without a port notion (ICMP type -1 and friends).
    fn port_spec(&self) -> Option<PortSpec> {
        if self.ip_protocol == "-1" {
            return Some(PortSpec::Any);
        }
        let from = self.from_port.and_then(|p| u16::try_from(p).ok());
        let to = self.to_port.and_then(|p| u16::try_from(p).ok());
        match (from, to) {
            (Some(from), Some(to)) => Some(PortSpec::range(from, to)),
            (Some(port), None) | (None, Some(port)) => Some(PortSpec::Single(port)),
            (None, None) => None,
        }
    }

    fn protocol(&self) -> &str {
        if self.ip_protocol == "-1" { "*" } else { &self.ip_protocol }
    }

    /// One rule per source range or referenced group.
    fn rules(&self, direction: Direction) -> Vec<SecurityRule> {
        let Some(ports) = self.port_spec() else {
            return Vec::new();
        };
        let sources = self
            .ip_ranges
            .iter()
            .map(|r| r.cidr_ip.clone())
            .chain(self.ipv6_ranges.iter().map(|r| r.cidr_ipv6.clone()))
            .chain(self.user_id_group_pairs.iter().map(|g| g.group_id.clone()));

        sources
            .map(|source| {
                SecurityRule::new(format!("{}:{ports}", self.protocol()), direction, Access::Allow)
                    .with_protocol(self.protocol())
                    .with_ports(ports)
                    .from_source(source)
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IpRange {
    cidr_ip: String,
}

#[derive(Debug, Deserialize)]
struct Ipv6Range {
    #[serde(rename = "CidrIpv6")]
    cidr_ipv6: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBuckets {
    #[serde(default)]
    buckets: Vec<S3Bucket>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct S3Bucket {
    name: String,
    creation_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BucketLocation {
    #[serde(rename = "LocationConstraint")]
    location_constraint: Option<String>,
}

impl BucketLocation {
    /// Buckets in the original region report no constraint (or the legacy `US`).
    fn region(&self) -> String {
        match self.location_constraint.as_deref().map(str::trim) {
            None | Some("") | Some("US") => String::from(DEFAULT_REGION),
            Some("EU") => String::from("eu-west-1"),
            Some(region) => region.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BucketVersioning {
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BucketEncryption {
    server_side_encryption_configuration: Option<EncryptionConfiguration>,
}

impl BucketEncryption {
    fn algorithm(&self) -> Option<String> {
        self.server_side_encryption_configuration
            .as_ref()?
            .rules
            .iter()
            .find_map(|r| r.apply_server_side_encryption_by_default.as_ref())
            .map(|d| d.sse_algorithm.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EncryptionConfiguration {
    #[serde(default)]
    rules: Vec<EncryptionRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EncryptionRule {
    apply_server_side_encryption_by_default: Option<EncryptionDefault>,
}

#[derive(Debug, Deserialize)]
struct EncryptionDefault {
    #[serde(rename = "SSEAlgorithm")]
    sse_algorithm: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PublicAccessBlock {
    #[serde(default)]
    public_access_block_configuration: BTreeMap<String, bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVolumes {
    #[serde(default)]
    volumes: Vec<EbsVolume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EbsVolume {
    volume_id: String,
    state: Option<String>,
    size: Option<i64>,
    encrypted: Option<bool>,
    volume_type: Option<String>,
    availability_zone: Option<String>,
    iops: Option<i64>,
    throughput: Option<i64>,
    snapshot_id: Option<String>,
    #[serde(default)]
    attachments: Vec<VolumeAttachment>,
    #[serde(default)]
    tags: Vec<Ec2Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VolumeAttachment {
    instance_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DescribeDbInstances {
    #[serde(rename = "DBInstances", default)]
    db_instances: Vec<RdsInstance>,
}

#[derive(Debug, Deserialize)]
struct RdsInstance {
    #[serde(rename = "DBInstanceIdentifier")]
    db_instance_identifier: String,
    #[serde(rename = "DBInstanceClass")]
    db_instance_class: Option<String>,
    #[serde(rename = "DBInstanceStatus")]
    db_instance_status: Option<String>,
    #[serde(rename = "Engine")]
    engine: Option<String>,
    #[serde(rename = "EngineVersion")]
    engine_version: Option<String>,
    #[serde(rename = "Endpoint")]
    endpoint: Option<RdsEndpoint>,
    #[serde(rename = "MultiAZ")]
    multi_az: Option<bool>,
    #[serde(rename = "AllocatedStorage")]
    allocated_storage: Option<i64>,
    #[serde(rename = "PubliclyAccessible")]
    publicly_accessible: Option<bool>,
    #[serde(rename = "IAMDatabaseAuthenticationEnabled")]
    iam_database_authentication_enabled: Option<bool>,
    #[serde(rename = "StorageEncrypted")]
    storage_encrypted: Option<bool>,
    #[serde(rename = "MasterUsername")]
    master_username: Option<String>,
    #[serde(rename = "AvailabilityZone")]
    availability_zone: Option<String>,
    #[serde(rename = "BackupRetentionPeriod")]
    backup_retention_period: Option<i64>,
    #[serde(rename = "TagList", default)]
    tag_list: Vec<Ec2Tag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RdsEndpoint {
    address: Option<String>,
    port: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListUsers {
    #[serde(default)]
    users: Vec<IamUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IamUser {
    user_name: String,
    arn: Option<String>,
    create_date: Option<String>,
    password_last_used: Option<String>,
    #[serde(default)]
    tags: Vec<Ec2Tag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListRoles {
    #[serde(default)]
    roles: Vec<IamRole>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IamRole {
    role_name: String,
    arn: Option<String>,
    create_date: Option<String>,
    path: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListClusters {
    #[serde(default)]
    clusters: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeCluster {
    cluster: EksCluster,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EksCluster {
    name: String,
    arn: Option<String>,
    status: Option<String>,
    version: Option<String>,
    endpoint: Option<String>,
    role_arn: Option<String>,
    resources_vpc_config: Option<EksVpcConfig>,
    created_at: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EksVpcConfig {
    vpc_id: Option<String>,
    #[serde(default)]
    subnet_ids: Vec<String>,
    #[serde(default)]
    security_group_ids: Vec<String>,
    endpoint_public_access: Option<bool>,
    #[serde(default)]
    public_access_cidrs: Vec<String>,
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
    use discovr_common::model::Extension;
    use std::path::Path;

    const INSTANCES: &str = r#"{
      "Reservations": [{
        "Instances": [
          {
            "InstanceId": "i-0abc",
            "InstanceType": "t3.micro",
            "PrivateIpAddress": "10.0.1.15",
            "PublicIpAddress": "54.1.2.3",
            "PlatformDetails": "Windows Server 2019",
            "State": {"Name": "running"},
            "Placement": {"AvailabilityZone": "eu-west-1b"},
            "SecurityGroups": [{"GroupId": "sg-web", "GroupName": "web"}],
            "Tags": [{"Key": "Name", "Value": "web-01"}, {"Key": "env", "Value": "prod"}]
          },
          {
            "InstanceId": "i-0dead",
            "State": {"Name": "terminated"}
          },
          {
            "InstanceId": "i-0noname",
            "PrivateIpAddress": "10.0.1.16",
            "State": {"Name": "stopped"}
          }
        ]
      }]
    }"#;

    const GROUPS: &str = r#"{
      "SecurityGroups": [{
        "GroupId": "sg-web",
        "GroupName": "web",
        "VpcId": "vpc-1",
        "IpPermissions": [
          {"IpProtocol": "tcp", "FromPort": 443, "ToPort": 443,
           "IpRanges": [{"CidrIp": "0.0.0.0/0"}], "Ipv6Ranges": [{"CidrIpv6": "::/0"}]},
          {"IpProtocol": "tcp", "FromPort": 3389, "ToPort": 3389,
           "IpRanges": [{"CidrIp": "10.0.0.0/8"}]},
          {"IpProtocol": "icmp", "FromPort": -1, "ToPort": -1,
           "IpRanges": [{"CidrIp": "10.0.0.0/8"}]}
        ],
        "IpPermissionsEgress": [
          {"IpProtocol": "-1", "IpRanges": [{"CidrIp": "0.0.0.0/0"}]}
        ]
      }]
    }"#;

    const BUCKETS: &str = r#"{"Buckets": [
      {"Name": "acme-logs", "CreationDate": "2024-01-01T00:00:00Z"},
      {"Name": "acme-us", "CreationDate": "2023-05-05T00:00:00Z"},
      {"Name": "acme-lost"}
    ]}"#;

    const VOLUMES: &str = r#"{
      "Volumes": [
        {
          "VolumeId": "vol-01", "State": "in-use", "Size": 100, "Encrypted": false,
          "VolumeType": "gp3", "AvailabilityZone": "eu-west-1b", "Iops": 3000,
          "Throughput": 125, "SnapshotId": "",
          "Attachments": [{"InstanceId": "i-0abc"}],
          "Tags": [{"Key": "Name", "Value": "web-root"}]
        },
        {"VolumeId": "vol-02", "State": "available", "Size": 8}
      ]
    }"#;

    const DATABASES: &str = r#"{
      "DBInstances": [{
        "DBInstanceIdentifier": "orders",
        "DBInstanceClass": "db.t3.medium",
        "Engine": "postgres",
        "EngineVersion": "15.4",
        "DBInstanceStatus": "available",
        "Endpoint": {"Address": "orders.abc.eu-west-1.rds.amazonaws.com", "Port": 5432},
        "MultiAZ": false,
        "PubliclyAccessible": true,
        "StorageEncrypted": true,
        "AvailabilityZone": "eu-west-1c",
        "TagList": [{"Key": "team", "Value": "billing"}]
      }]
    }"#;

    const USERS: &str = r#"{"Users": [
      {"UserName": "deploy", "Arn": "arn:aws:iam::1:user/deploy", "CreateDate": "2022-02-02T00:00:00Z"},
      {"UserName": "admin", "PasswordLastUsed": "2024-06-01T10:00:00Z"}
    ]}"#;

    const ROLES: &str = r#"{"Roles": [
      {"RoleName": "deploy", "Arn": "arn:aws:iam::1:role/deploy", "Path": "/", "Description": ""}
    ]}"#;

    fn snapshot(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        dir
    }

    fn collector(dir: &Path) -> AwsCollector {
        AwsCollector::new(Arc::new(SnapshotDir::new(dir)), None, Some("eu-west-1a"))
    }

    #[test]
    fn availability_zones_become_regions() {
        assert_eq!(normalize_region("us-east-1a"), "us-east-1");
        assert_eq!(normalize_region("eu-west-2"), "eu-west-2");
        assert_eq!(normalize_region("global"), "global");
        assert_eq!(normalize_region("a"), "a");
    }

    #[test]
    fn default_region() {
        let source: Arc<dyn DocumentSource> = Arc::new(SnapshotDir::new("/nonexistent"));
        assert_eq!(AwsCollector::new(source.clone(), None, None).region(), DEFAULT_REGION);
        assert_eq!(AwsCollector::new(source, None, Some(" ")).region(), DEFAULT_REGION);
    }

    #[tokio::test]
    async fn collects_instances_groups_and_buckets() {
        let dir = snapshot(&[
            ("ec2_instances.json", INSTANCES),
            ("ec2_security_groups.json", GROUPS),
            ("s3_buckets.json", BUCKETS),
            ("s3_acme-logs_location.json", r#"{"LocationConstraint": "eu-west-1"}"#),
        ]);
        let records = collector(dir.path()).collect().await.unwrap();
        assert_eq!(records.len(), 4);

        let web = &records[0];
        assert_eq!(web.kind, Kind::Ec2Instance);
        assert_eq!(web.name, "web-01");
        assert_eq!(web.address, Some("10.0.1.15".parse().unwrap()));
        assert_eq!(web.operating_system, "Windows Server 2019");
        assert_eq!(web.partition, "eu-west-1");
        assert_eq!(web.ports.to_string(), "443,3389");
        assert_eq!(
            web.extension("public_ip"),
            Some(&Extension::Text(String::from("54.1.2.3")))
        );

        let unnamed = &records[1];
        assert_eq!(unnamed.name, "i-0noname");
        assert!(unnamed.os_is_unknown());

        let group = &records[2];
        assert_eq!(group.kind, Kind::SecurityGroup);
        assert_eq!(group.name, "sg-web");
        let rules = group.security_rules();
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[0].source, "0.0.0.0/0");
        assert_eq!(rules[1].source, "::/0");
        assert_eq!(rules[3].direction, Direction::Outbound);
        assert_eq!(rules[3].ports, PortSpec::Any);

        let bucket = &records[3];
        assert_eq!(bucket.kind, Kind::StorageBucket);
        assert_eq!(bucket.name, "acme-logs");
        assert_eq!(bucket.partition, "eu-west-1");
        assert_eq!(
            bucket.extension("versioning"),
            Some(&Extension::Text(String::from(UNKNOWN)))
        );
    }

    #[tokio::test]
    async fn buckets_outside_the_region_are_left_out_and_enriched_inside_it() {
        let dir = snapshot(&[
            ("ec2_instances.json", r#"{"Reservations": []}"#),
            ("s3_buckets.json", BUCKETS),
            ("s3_acme-logs_location.json", r#"{"LocationConstraint": "eu-west-1"}"#),
            ("s3_acme-logs_versioning.json", r#"{"Status": "Enabled"}"#),
            (
                "s3_acme-logs_encryption.json",
                r#"{"ServerSideEncryptionConfiguration": {"Rules": [
                    {"ApplyServerSideEncryptionByDefault": {"SSEAlgorithm": "aws:kms"}}
                ]}}"#,
            ),
            (
                "s3_acme-logs_public_access.json",
                r#"{"PublicAccessBlockConfiguration": {
                    "BlockPublicAcls": true, "IgnorePublicAcls": true,
                    "BlockPublicPolicy": true, "RestrictPublicBuckets": false
                }}"#,
            ),
            ("s3_acme-us_location.json", r#"{"LocationConstraint": null}"#),
        ]);
        let records = collector(dir.path()).collect().await.unwrap();
        assert_eq!(records.len(), 1);

        let bucket = &records[0];
        assert_eq!(bucket.name, "acme-logs");
        let text = |key: &str| match bucket.extension(key) {
            Some(Extension::Text(value)) => value.clone(),
            other => panic!("{key}: {other:?}"),
        };
        assert_eq!(text("region"), "eu-west-1");
        assert_eq!(text("versioning"), "Enabled");
        assert_eq!(text("encryption"), "aws:kms");
        assert_eq!(text("public_access"), "PartiallyBlocked");
        assert_eq!(text("created"), "2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn buckets_without_a_constraint_live_in_us_east_1() {
        let dir = snapshot(&[
            ("ec2_instances.json", r#"{"Reservations": []}"#),
            ("s3_buckets.json", BUCKETS),
            ("s3_acme-us_location.json", r#"{"LocationConstraint": null}"#),
            ("s3_acme-us_versioning.json", "{}"),
            ("s3_acme-us_encryption.json", "{}"),
        ]);
        let source = Arc::new(SnapshotDir::new(dir.path()));
        let records = AwsCollector::new(source, None, None).collect().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].partition, DEFAULT_REGION);
        assert_eq!(
            records[0].extension("versioning"),
            Some(&Extension::Text(String::from("Disabled")))
        );
        assert_eq!(
            records[0].extension("encryption"),
            Some(&Extension::Text(String::from("Enabled")))
        );
    }

    #[tokio::test]
    async fn volumes_databases_and_principals_are_collected() {
        let dir = snapshot(&[
            ("ec2_instances.json", r#"{"Reservations": []}"#),
            ("ec2_volumes.json", VOLUMES),
            ("rds_instances.json", DATABASES),
            ("iam_users.json", USERS),
            ("iam_roles.json", ROLES),
        ]);
        let records = collector(dir.path()).collect().await.unwrap();
        let kinds: Vec<Kind> = records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [
                Kind::Volume,
                Kind::Volume,
                Kind::DatabaseInstance,
                Kind::IamUser,
                Kind::IamUser,
                Kind::IamRole
            ]
        );

        let root = &records[0];
        assert_eq!(root.name, "web-root");
        assert_eq!(root.partition, "eu-west-1");
        assert_eq!(root.extension("size_gib"), Some(&Extension::Number(100)));
        assert_eq!(root.extension("encrypted"), Some(&Extension::Flag(false)));
        assert_eq!(
            root.extension("attached_instances"),
            Some(&Extension::List(vec![String::from("i-0abc")]))
        );
        assert_eq!(root.extension("snapshot_id"), None);
        assert_eq!(records[1].name, "vol-02");

        let db = &records[2];
        assert_eq!(db.name, "orders");
        assert!(db.address.is_none());
        assert_eq!(db.ports.to_string(), "5432");
        assert_eq!(db.extension("engine"), Some(&Extension::Text(String::from("postgres 15.4"))));
        assert_eq!(db.extension("publicly_accessible"), Some(&Extension::Flag(true)));

        assert_eq!(records[3].name, "user/deploy");
        assert_eq!(records[3].partition, IAM);
        assert_eq!(
            records[3].extension("password_last_used"),
            Some(&Extension::Text(String::from("Never")))
        );
        assert_eq!(records[4].name, "user/admin");
        assert_eq!(records[5].name, "role/deploy");
        assert_eq!(records[5].extension("description"), None);
    }

    #[tokio::test]
    async fn user_and_role_with_one_name_survive_reconciliation() {
        let dir = snapshot(&[
            ("ec2_instances.json", r#"{"Reservations": []}"#),
            ("iam_users.json", USERS),
            ("iam_roles.json", ROLES),
        ]);
        let records = discovr_common::model::reconcile(collector(dir.path()).collect().await.unwrap());
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn clusters_are_described_one_by_one() {
        let dir = snapshot(&[
            ("ec2_instances.json", r#"{"Reservations": []}"#),
            ("eks_clusters.json", r#"{"clusters": ["prod", "gone"]}"#),
            (
                "eks_cluster_prod.json",
                r#"{"cluster": {
                    "name": "prod", "arn": "arn:aws:eks:eu-west-1:1:cluster/prod",
                    "status": "ACTIVE", "version": "1.29",
                    "endpoint": "https://ABC.gr7.eu-west-1.eks.amazonaws.com",
                    "resourcesVpcConfig": {
                        "vpcId": "vpc-1", "subnetIds": ["subnet-a", "subnet-b"],
                        "securityGroupIds": ["sg-1"], "endpointPublicAccess": true,
                        "publicAccessCidrs": ["0.0.0.0/0"]
                    },
                    "tags": {"env": "prod"}
                }}"#,
            ),
        ]);
        let records = collector(dir.path()).collect().await.unwrap();
        assert_eq!(records.len(), 1);

        let cluster = &records[0];
        assert_eq!(cluster.kind, Kind::KubernetesCluster);
        assert_eq!(cluster.name, "prod");
        assert_eq!(cluster.partition, "eu-west-1");
        assert_eq!(cluster.extension("endpoint_public_access"), Some(&Extension::Flag(true)));
        assert_eq!(
            cluster.extension("subnets"),
            Some(&Extension::List(vec![String::from("subnet-a"), String::from("subnet-b")]))
        );
    }

    #[tokio::test]
    async fn missing_secondary_documents_are_skipped() {
        let dir = snapshot(&[("ec2_instances.json", INSTANCES)]);
        let records = collector(dir.path()).collect().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].ports.is_empty());
    }

    #[tokio::test]
    async fn missing_instances_fail_the_provider() {
        let dir = snapshot(&[("s3_buckets.json", BUCKETS)]);
        let result = collector(dir.path()).collect().await;
        assert!(matches!(result, Err(CollectError::Fetch { provider: Origin::Aws, .. })));
    }

    #[tokio::test]
    async fn malformed_instances_are_a_decode_error() {
        let dir = snapshot(&[("ec2_instances.json", "{\"Reservations\": 7}")]);
        let result = collector(dir.path()).collect().await;
        assert!(matches!(result, Err(CollectError::Decode { .. })));
    }
}
