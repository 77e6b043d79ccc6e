//! Subnet scanner
//!
//! Probes hosts `.1` through `.254` of a /24 prefix, keeping at most
//! `max_concurrent` probes in flight. Results arrive in completion order.

use super::probe::{Prober, TcpProber};
use crate::config::DiscoveryConfig;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

/// Host numbers probed within a /24
const FIRST_HOST: u8 = 1;
const LAST_HOST: u8 = 254;

/// Parse `a.b.c.` (trailing dot optional) into its three octets
pub fn parse_prefix(prefix: &str) -> Option<[u8; 3]> {
    let trimmed = prefix.trim();
    let body = trimmed.strip_suffix('.').unwrap_or(trimmed);

    let mut octets = [0u8; 3];
    let mut parts = body.split('.');
    for slot in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

/// Concurrent reachability scanner for one service port
pub struct LanScanner<P: Prober = TcpProber> {
    prober: Arc<P>,
    port: u16,
    max_concurrent: usize,
}

impl LanScanner<TcpProber> {
    /// Scanner using TCP connect probes configured from `config`
    pub fn new(config: &DiscoveryConfig) -> Self {
        let prober = TcpProber::new(Duration::from_millis(config.probe_timeout_ms));
        Self::with_prober(prober, config.port, config.max_concurrent)
    }
}

impl<P: Prober> LanScanner<P> {
    pub fn with_prober(prober: P, port: u16, max_concurrent: usize) -> Self {
        Self {
            prober: Arc::new(prober),
            port,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Scan every host of `prefix` and return the responsive addresses.
    ///
    /// Never fails: an invalid prefix yields an empty list and individual
    /// probe errors count as "not responsive".
    pub async fn scan(&self, prefix: &str) -> Vec<Ipv4Addr> {
        let Some([a, b, c]) = parse_prefix(prefix) else {
            warn!("[SCAN] Invalid prefix {:?}, expected form a.b.c.", prefix);
            return Vec::new();
        };

        let started = Instant::now();
        info!(
            "[SCAN] Scanning {}.{}.{}.{}-{} port {} (max {} in flight, prober {})",
            a,
            b,
            c,
            FIRST_HOST,
            LAST_HOST,
            self.port,
            self.max_concurrent,
            self.prober.name()
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let total = usize::from(LAST_HOST - FIRST_HOST) + 1;
        let (tx, mut rx) = mpsc::channel::<Ipv4Addr>(total);

        for host in FIRST_HOST..=LAST_HOST {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let ip = Ipv4Addr::new(a, b, c, host);
            let addr = SocketAddr::from((ip, self.port));
            let prober = Arc::clone(&self.prober);
            let tx = tx.clone();

            tokio::spawn(async move {
                let _permit = permit;
                match prober.probe(addr).await {
                    Ok(()) => {
                        let _ = tx.send(ip).await;
                    }
                    Err(e) => debug!("[SCAN] {} not responsive: {}", addr, e),
                }
            });
        }

        // Channel closes once every probe task has dropped its sender
        drop(tx);

        let mut found = Vec::new();
        while let Some(ip) = rx.recv().await {
            debug!("[SCAN] {} responded", ip);
            found.push(ip);
        }

        info!(
            "[SCAN] Found {} device(s) in {:?}",
            found.len(),
            started.elapsed()
        );
        found
    }
}
