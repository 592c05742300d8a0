pub mod cloud;
pub mod directory;
pub mod report;
pub mod scan;

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use discovr_common::config::{self, Config};

#[derive(Parser)]
#[command(name = "discovr")]
#[command(version)]
#[command(about = "Asset discovery and exposure triage for networks, clouds and directories.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Export formats, comma separated (csv, json)
    #[arg(long, global = true, value_name = "FORMATS")]
    pub export: Option<String>,

    /// Directory for exported reports
    #[arg(long, global = true, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Skip reverse DNS lookups
    #[arg(long, global = true)]
    pub no_dns: bool,

    /// Less output, repeat for even less
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(long, global = true)]
    pub no_banner: bool,

    /// Do not listen for 'q' on the terminal
    #[arg(long, global = true)]
    pub disable_input: bool,

    /// Resolver for reverse lookups instead of the system one
    #[arg(long, global = true, value_name = "IP")]
    pub dns_server: Option<IpAddr>,

    /// Directory for run logs
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sweep an address range for live hosts
    #[command(alias = "s")]
    Scan(ScanArgs),
    /// Collect a cloud provider's inventory
    #[command(alias = "c")]
    Cloud {
        #[command(subcommand)]
        provider: CloudProvider,
    },
    /// Collect computer objects from Active Directory
    #[command(alias = "d")]
    Directory(DirectoryArgs),
}

#[derive(Args)]
pub struct ScanArgs {
    /// CIDR, address, dashed range or a comma separated list of those
    pub target: String,

    /// Ports to connect to, e.g. 22,80,443 or 1-1024. Without it the OS is fingerprinted
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Hosts probed at once
    #[arg(short, long, default_value_t = discovr_core::scanner::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Stop dispatching new hosts after this many seconds
    #[arg(long, value_name = "SECS")]
    pub budget: Option<u64>,

    #[arg(long, value_enum, default_value_t = ProberKind::Auto)]
    pub prober: ProberKind,

    /// Per-connection timeout of the connect prober
    #[arg(long, value_name = "MS", default_value_t = 400)]
    pub connect_timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProberKind {
    /// nmap when installed, connect otherwise
    Auto,
    Nmap,
    Connect,
}

#[derive(Subcommand)]
pub enum CloudProvider {
    /// EC2 instances, security groups and S3 buckets
    Aws {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        region: Option<String>,
        /// Read exported documents from DIR instead of calling the aws CLI
        #[arg(long, value_name = "DIR")]
        snapshot: Option<PathBuf>,
    },
    /// Virtual machines and network security groups
    Azure {
        #[arg(long)]
        subscription: String,
        #[arg(long, value_name = "DIR")]
        snapshot: Option<PathBuf>,
    },
    /// Compute instances and firewall rules
    Gcp {
        #[arg(long)]
        project: String,
        #[arg(long)]
        zone: Option<String>,
        #[arg(long, value_name = "DIR")]
        snapshot: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct DirectoryArgs {
    #[arg(long)]
    pub domain: String,

    /// Bind DN or user principal. The password is read from DISCOVR_AD_PASSWORD
    #[arg(long)]
    pub user: Option<String>,

    #[arg(long, value_name = "DIR")]
    pub snapshot: Option<PathBuf>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> Config {
        let defaults = Config::default();
        Config {
            no_banner: self.no_banner,
            no_dns: self.no_dns,
            quiet: self.quiet,
            disable_input: self.disable_input,
            dns_server: self.dns_server,
            log_dir: self.log_dir.clone().unwrap_or(defaults.log_dir),
            verbose: self.verbose,
        }
    }

    pub fn out_dir(&self) -> PathBuf {
        self.out.clone().unwrap_or_else(config::default_report_dir)
    }
}

impl Commands {
    /// Short name used in log and report file names.
    pub fn feature(&self) -> &'static str {
        match self {
            Commands::Scan(_) => "scan",
            Commands::Cloud { provider } => match provider {
                CloudProvider::Aws { .. } => "cloud_aws",
                CloudProvider::Azure { .. } => "cloud_azure",
                CloudProvider::Gcp { .. } => "cloud_gcp",
            },
            Commands::Directory(_) => "directory",
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
