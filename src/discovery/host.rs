//! Local address helpers used to suggest a scan prefix

use std::net::{IpAddr, Ipv4Addr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Address the outbound route is resolved against; no packet is sent
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

/// Local IPv4 address used for outbound traffic, or loopback if unknown
pub async fn local_ip() -> Ipv4Addr {
    match outbound_ip().await {
        Ok(ip) => ip,
        Err(e) => {
            debug!("[SCAN] Local address lookup failed, using loopback: {}", e);
            Ipv4Addr::LOCALHOST
        }
    }
}

async fn outbound_ip() -> std::io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(ROUTE_PROBE_ADDR).await?;
    match socket.local_addr()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Ok(ip),
        other => Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("no usable IPv4 address ({})", other),
        )),
    }
}

/// First three octets of `ip` followed by a dot, e.g. `192.168.1.`
pub fn prefix_of(ip: Ipv4Addr) -> String {
    let [a, b, c, _] = ip.octets();
    format!("{}.{}.{}.", a, b, c)
}

/// Scan prefix suggested from the local address
pub async fn default_prefix() -> String {
    prefix_of(local_ip().await)
}
