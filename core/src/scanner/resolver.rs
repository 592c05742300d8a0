use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::atomic::{AtomicU16, Ordering},
    time::Duration,
};

use anyhow::Context;
use discovr_common::utils;
use discovr_protocols::dns::{self, DNS_PORT};
use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

const LOOKUP_TIMEOUT: Duration = Duration::from_millis(800);
const MAX_RESPONSE: usize = 512;

/// Reverse (PTR) lookups against a single nameserver over UDP.
pub struct ReverseResolver {
    nameserver: SocketAddr,
    wait: Duration,
    id_counter: AtomicU16,
}

impl ReverseResolver {
    pub fn new(nameserver: IpAddr) -> Self {
        Self {
            nameserver: SocketAddr::new(nameserver, DNS_PORT),
            wait: LOOKUP_TIMEOUT,
            id_counter: AtomicU16::new(rand::random()),
        }
    }

    /// Uses the first nameserver the host is configured with.
    pub fn system() -> Self {
        Self::new(utils::resolver::system_nameserver())
    }

    pub fn with_timeout(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn nameserver(&self) -> SocketAddr {
        self.nameserver
    }

    /// `Ok(None)` when the server has no PTR record or does not answer in time.
    pub async fn lookup(&self, ip: &IpAddr) -> anyhow::Result<Option<String>> {
        let id: u16 = self.get_next_trans_id();
        let query: Vec<u8> = dns::create_ptr_packet(ip, id)?;

        let socket = UdpSocket::bind(unspecified_for(&self.nameserver))
            .await
            .context("binding resolver socket")?;
        socket
            .send_to(&query, self.nameserver)
            .await
            .with_context(|| format!("sending PTR query to {}", self.nameserver))?;

        let deadline = Instant::now() + self.wait;
        let mut buf = [0u8; MAX_RESPONSE];
        loop {
            let (len, from) = match timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Ok(received) => received.context("receiving PTR response")?,
                Err(_elapsed) => {
                    debug!("PTR lookup for {ip} timed out");
                    return Ok(None);
                }
            };

            if from.ip() != self.nameserver.ip() {
                continue;
            }

            match dns::get_hostname(&buf[..len]) {
                Ok((response_id, hostname)) if response_id == id => {
                    return Ok(Some(hostname.trim_end_matches('.').to_string()));
                }
                Ok(_) => continue,
                Err(e) => {
                    debug!("no usable PTR answer for {ip}: {e}");
                    return Ok(None);
                }
            }
        }
    }

    fn get_next_trans_id(&self) -> u16 {
        self.id_counter.fetch_add(1, Ordering::Relaxed)
    }
}

fn unspecified_for(server: &SocketAddr) -> SocketAddr {
    match server {
        SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
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
