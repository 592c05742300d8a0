//! The central **abstraction** for sweeping an address range.
//!
//! A sweep walks a range expression one address at a time and hands them to a
//! bounded pool of workers. Each worker takes one address, runs a [`HostProber`]
//! against it to completion and only then takes the next one. Results fan in through
//! a channel, so workers never share anything but the address queue.
//!
//! **Architectural Note:**
//! The pool only depends on the [`HostProber`] trait. Concrete probing techniques
//! ([`nmap`], [`connect`]) are interchangeable and never see each other.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use discovr_common::model::{AssetRecord, Kind, Origin, PortSet, UNKNOWN, reconcile};
use discovr_common::network::range::Addresses;
use discovr_common::network::target::Target;
use discovr_common::utils::ip;
use discovr_common::{info, success};

use crate::error::ScanError;

pub mod connect;
pub mod nmap;
pub mod resolver;

pub const DEFAULT_WORKERS: usize = 1;
pub const WINDOWS_GUESS: &str = "Windows (guessed)";
pub const UNIX_GUESS: &str = "Linux/Unix (guessed)";

const STOP_POLL: Duration = Duration::from_millis(100);

/// How a single host is probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeMode {
    /// Fast connect scan of exactly these ports.
    Connect(PortSet),
    /// Slower scan that also attempts OS fingerprinting.
    Fingerprint,
}

/// What a prober learned about one responsive host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub address: IpAddr,
    pub hostname: Option<String>,
    pub os_match: Option<String>,
    pub open_ports: BTreeSet<u16>,
}

impl ProbeReport {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            hostname: None,
            os_match: None,
            open_ports: BTreeSet::new(),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os_match = Some(os.into());
        self
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.open_ports.extend(ports);
        self
    }
}

/// Probes one host.
///
/// `Ok(None)` means the host did not answer. An `Err` is a failure of the probe
/// itself; the sweep logs it and leaves the host out.
#[async_trait]
pub trait HostProber: Send + Sync {
    async fn probe(&self, addr: IpAddr, mode: &ProbeMode) -> anyhow::Result<Option<ProbeReport>>;

    fn name(&self) -> &'static str;
}

/// A parsed sweep request.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub target: Target,
    pub ports: Option<PortSet>,
    pub workers: usize,
}

impl ScanRequest {
    /// Parses the range and port list. Zero workers is a configuration error.
    pub fn parse(range: &str, ports: Option<&str>, workers: usize) -> Result<Self, ScanError> {
        if workers == 0 {
            return Err(ScanError::NoWorkers);
        }
        let target = Target::from_str(range)?;
        let ports = ports.map(PortSet::parse_list).transpose()?;
        Ok(Self {
            target,
            ports,
            workers,
        })
    }

    pub fn mode(&self) -> ProbeMode {
        match &self.ports {
            Some(ports) => ProbeMode::Connect(ports.clone()),
            None => ProbeMode::Fingerprint,
        }
    }
}

/// Stop flag, duration budget and progress hook shared with the caller.
#[derive(Clone, Default)]
pub struct ScanControl {
    stop: Arc<AtomicBool>,
    budget: Option<Duration>,
    on_host_found: Option<Arc<dyn Fn(usize) + Send + Sync>>,
}

impl ScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses not dispatched once `budget` has elapsed are skipped.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn on_host_found<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.on_host_found = Some(Arc::new(callback));
        self
    }

    /// Flag that aborts the sweep when set, for key listeners and signal handlers.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn budget_spent(&self, started: Instant) -> bool {
        self.budget.is_some_and(|budget| started.elapsed() >= budget)
    }

    async fn stopped(&self) {
        while !self.is_stopped() {
            tokio::time::sleep(STOP_POLL).await;
        }
    }

    fn report_host_found(&self, count: usize) {
        if let Some(callback) = &self.on_host_found {
            callback(count);
        }
    }
}

/// Result of a sweep. `assets` carries no ordering guarantee.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub assets: Vec<AssetRecord>,
    pub attempted: usize,
    pub elapsed: Duration,
}

impl ScanOutcome {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

pub struct Scanner {
    prober: Arc<dyn HostProber>,
    control: ScanControl,
}

impl Scanner {
    pub fn new(prober: Arc<dyn HostProber>) -> Self {
        Self {
            prober,
            control: ScanControl::default(),
        }
    }

    pub fn with_control(mut self, control: ScanControl) -> Self {
        self.control = control;
        self
    }

    pub fn control(&self) -> &ScanControl {
        &self.control
    }

    /// Parses `range` and `ports`, then sweeps. Only malformed input fails.
    pub async fn scan(
        &self,
        range: &str,
        ports: Option<&str>,
        workers: usize,
    ) -> Result<ScanOutcome, ScanError> {
        let request = ScanRequest::parse(range, ports, workers)?;
        Ok(self.run(request).await)
    }

    pub async fn run(&self, request: ScanRequest) -> ScanOutcome {
        let started = Instant::now();
        let mode = Arc::new(request.mode());
        let collection = request.target.to_collection();
        let total = collection.len();
        let workers = request.workers.max(1).min(total.max(1));

        match mode.as_ref() {
            ProbeMode::Connect(ports) => info!(
                "Sweeping {total} addresses on ports {ports} with {workers} worker(s) via {}",
                self.prober.name()
            ),
            ProbeMode::Fingerprint => info!(
                "Sweeping {total} addresses with OS detection, {workers} worker(s) via {}",
                self.prober.name()
            ),
        }

        let queue = Arc::new(Mutex::new(collection.into_iter()));
        let attempted = Arc::new(AtomicUsize::new(0));
        let found = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel::<AssetRecord>();

        let mut pool: JoinSet<()> = JoinSet::new();
        for id in 0..workers {
            let worker = Worker {
                id,
                prober: self.prober.clone(),
                control: self.control.clone(),
                queue: queue.clone(),
                mode: mode.clone(),
                attempted: attempted.clone(),
                found: found.clone(),
                tx: tx.clone(),
                started,
            };
            pool.spawn(worker.run());
        }
        drop(tx);

        let mut assets: Vec<AssetRecord> = Vec::new();
        while let Some(record) = rx.recv().await {
            assets.push(record);
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!("scan worker terminated abnormally: {e}");
            }
        }

        let attempted = attempted.load(Ordering::Relaxed);
        if attempted < total {
            warn!("Sweep stopped early, {} of {total} addresses were skipped", total - attempted);
        }

        let outcome = ScanOutcome {
            assets: reconcile(assets),
            attempted,
            elapsed: started.elapsed(),
        };
        success!(
            "Sweep finished: {} responsive hosts out of {} probed in {:.2}s",
            outcome.assets.len(),
            outcome.attempted,
            outcome.elapsed_secs()
        );
        outcome
    }
}

struct Worker {
    id: usize,
    prober: Arc<dyn HostProber>,
    control: ScanControl,
    queue: Arc<Mutex<Addresses>>,
    mode: Arc<ProbeMode>,
    attempted: Arc<AtomicUsize>,
    found: Arc<AtomicUsize>,
    tx: UnboundedSender<AssetRecord>,
    started: Instant,
}

impl Worker {
    async fn run(self) {
        loop {
            if self.control.is_stopped() || self.control.budget_spent(self.started) {
                break;
            }

            let Some(addr) = self.next_address() else {
                break;
            };
            self.attempted.fetch_add(1, Ordering::Relaxed);

            let outcome = tokio::select! {
                outcome = self.prober.probe(addr, &self.mode) => outcome,
                _ = self.control.stopped() => {
                    debug!("worker {} abandoned probe of {addr}", self.id);
                    break;
                }
            };

            match outcome {
                Ok(Some(report)) => {
                    let record = host_record(report);
                    info!(
                        "Found: {} ({}) | OS: {} | Ports: {}",
                        record.display_address(),
                        record.name,
                        record.operating_system,
                        display_ports(&record.ports)
                    );
                    let count = self.found.fetch_add(1, Ordering::Relaxed) + 1;
                    self.control.report_host_found(count);
                    if self.tx.send(record).is_err() {
                        break;
                    }
                }
                Ok(None) => debug!("{addr} did not respond"),
                Err(e) => warn!("Probe of {addr} failed: {e:#}"),
            }
        }
    }

    /// The queue lock is never held across a probe.
    fn next_address(&self) -> Option<IpAddr> {
        self.queue.lock().ok()?.next()
    }
}

/// Turns a probe report into a `host` record, guessing the OS from ports when needed.
pub fn host_record(report: ProbeReport) -> AssetRecord {
    let os: String = report
        .os_match
        .filter(|os| !os.trim().is_empty())
        .unwrap_or_else(|| guess_os(&report.open_ports).to_string());
    let name: String = report
        .hostname
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    AssetRecord::new(Kind::Host, Origin::Network)
        .with_address(report.address)
        .with_name(name)
        .with_os(os)
        .with_ports(report.open_ports.iter().copied().collect())
        .in_partition(ip::subnet_of(&report.address))
}

pub fn guess_os(open_ports: &BTreeSet<u16>) -> &'static str {
    if open_ports.contains(&445) || open_ports.contains(&3389) {
        WINDOWS_GUESS
    } else if open_ports.contains(&22) {
        UNIX_GUESS
    } else {
        UNKNOWN
    }
}

fn display_ports(ports: &PortSet) -> String {
    if ports.is_empty() {
        String::from("None")
    } else {
        ports.to_string()
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
