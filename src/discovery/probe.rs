//! Probe abstraction for reachability checks

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Checks whether a single address accepts connections
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    /// Succeeds when `addr` accepted a connection in time
    async fn probe(&self, addr: SocketAddr) -> Result<()>;

    /// Human-readable name for this prober
    fn name(&self) -> &'static str;
}

/// TCP connect prober with a per-attempt timeout
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, addr: SocketAddr) -> Result<()> {
        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(anyhow!("connect to {} failed: {}", addr, e)),
            Err(_) => Err(anyhow!("connect to {} timed out after {:?}", addr, self.timeout)),
        }
    }

    fn name(&self) -> &'static str {
        "TCP"
    }
}
