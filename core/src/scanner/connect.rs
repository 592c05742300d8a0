//! Plain TCP connect probing, no external tools and no raw sockets.
//!
//! A port that completes the handshake is open. A refused connection proves the
//! host is up even though the port is closed. Anything else is silence.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::debug;

use super::resolver::ReverseResolver;
use super::{HostProber, ProbeMode, ProbeReport};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(400);
const CONNECTS_IN_FLIGHT: usize = 256;

/// Ports tried when no explicit list was given.
pub const COMMON_PORTS: &[u16] = &[
    21, 22, 23, 25, 53, 80, 110, 135, 139, 143, 443, 445, 548, 631, 993, 995, 1433, 1723,
    3306, 3389, 5432, 5900, 8080, 8443, 9100,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Open,
    Closed,
    Silent,
}

pub struct ConnectProber {
    connect_timeout: Duration,
    resolver: Option<Arc<ReverseResolver>>,
}

impl Default for ConnectProber {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectProber {
    pub fn new() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            resolver: None,
        }
    }

    pub fn with_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_resolver(mut self, resolver: ReverseResolver) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    async fn sweep_ports(&self, addr: IpAddr, ports: Vec<u16>) -> (BTreeSet<u16>, bool) {
        let mut open: BTreeSet<u16> = BTreeSet::new();
        let mut answered = false;

        for chunk in ports.chunks(CONNECTS_IN_FLIGHT) {
            let mut set: JoinSet<(u16, PortState)> = JoinSet::new();
            for &port in chunk {
                let wait = self.connect_timeout;
                set.spawn(async move { (port, probe_port(SocketAddr::new(addr, port), wait).await) });
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((port, PortState::Open)) => {
                        answered = true;
                        open.insert(port);
                    }
                    Ok((_, PortState::Closed)) => answered = true,
                    Ok((_, PortState::Silent)) => {}
                    Err(e) => debug!("connect task for {addr} failed: {e}"),
                }
            }
        }

        (open, answered)
    }
}

#[async_trait]
impl HostProber for ConnectProber {
    async fn probe(&self, addr: IpAddr, mode: &ProbeMode) -> anyhow::Result<Option<ProbeReport>> {
        let ports: Vec<u16> = match mode {
            ProbeMode::Connect(ports) => ports.expand(),
            ProbeMode::Fingerprint => COMMON_PORTS.to_vec(),
        };

        let (open, answered) = self.sweep_ports(addr, ports).await;
        if !answered {
            return Ok(None);
        }

        let mut report = ProbeReport::new(addr).with_ports(open);
        if let Some(resolver) = &self.resolver {
            match resolver.lookup(&addr).await {
                Ok(Some(hostname)) => report = report.with_hostname(hostname),
                Ok(None) => {}
                Err(e) => debug!("reverse lookup for {addr} failed: {e:#}"),
            }
        }
        Ok(Some(report))
    }

    fn name(&self) -> &'static str {
        "tcp-connect"
    }
}

pub async fn probe_port(socket_addr: SocketAddr, wait: Duration) -> PortState {
    match timeout(wait, TcpStream::connect(socket_addr)).await {
        Ok(Ok(_stream)) => PortState::Open,
        Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => PortState::Closed,
        Ok(Err(_)) | Err(_) => PortState::Silent,
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
    use discovr_common::model::PortSet;
    use std::net::Ipv4Addr;
    use tokio::net::TcpListener;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn listening_port_is_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let state = probe_port(SocketAddr::new(LOCALHOST, port), Duration::from_secs(1)).await;
        assert_eq!(state, PortState::Open);
    }

    #[tokio::test]
    async fn refused_port_is_closed() {
        // Bind then drop so the port is very likely unused.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let state = probe_port(SocketAddr::new(LOCALHOST, port), Duration::from_secs(1)).await;
        assert_eq!(state, PortState::Closed);
    }

    #[tokio::test]
    async fn connect_mode_reports_open_ports_only() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_port = listener.local_addr().unwrap().port();
        let closed_port = {
            let other = TcpListener::bind("127.0.0.1:0").await.unwrap();
            other.local_addr().unwrap().port()
        };

        let ports: PortSet = [open_port, closed_port].into_iter().collect();
        let prober = ConnectProber::new().with_timeout(Duration::from_secs(1));
        let report = prober
            .probe(LOCALHOST, &ProbeMode::Connect(ports))
            .await
            .unwrap()
            .expect("localhost answers");

        assert_eq!(report.open_ports, BTreeSet::from([open_port]));
        assert_eq!(report.hostname, None);
    }

    #[tokio::test]
    #[ignore]
    async fn unroutable_host_is_silent() {
        let ip: IpAddr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1));
        let ports: PortSet = [443u16].into_iter().collect();
        let result = ConnectProber::new()
            .probe(ip, &ProbeMode::Connect(ports))
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
