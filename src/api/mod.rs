//! Device endpoint
//!
//! Minimal HTTP/1.1 responder for the running device:
//! - `GET /api/status` returns the refreshed local telemetry (what a remote
//!   proxy on another host reads)
//! - `POST /api/control` with `{"cmd": ..., "lat": ..., "lon": ...}` runs one
//!   command through the same executor the scheduler uses
//!
//! Each connection gets its own task, must deliver its request within the
//! read deadline, and is closed after one response.

use crate::command::CommandExecutor;
use crate::config::ApiConfig;
use anyhow::{anyhow, ensure, Context, Result};
use drone_shared::DeviceState;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Path of the status resource
pub const STATUS_PATH: &str = "/api/status";

/// Path of the command resource
pub const CONTROL_PATH: &str = "/api/control";

/// Upper bound on the request head we are willing to buffer
const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Upper bound on a request body
const MAX_REQUEST_BODY: usize = 16 * 1024;

/// Body of `POST /api/control`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

/// Reply to `POST /api/control`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    pub outcome: String,
    pub message: String,
    pub state: DeviceState,
}

/// A parsed request
#[derive(Debug)]
struct Request {
    method: String,
    path: String,
    body: Vec<u8>,
}

/// Device endpoint bound to a listener
pub struct StatusServer {
    listener: TcpListener,
    executor: CommandExecutor,
    read_timeout: Duration,
}

impl StatusServer {
    /// Bind the endpoint as configured
    pub async fn bind(config: &ApiConfig, executor: CommandExecutor) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind)
            .await
            .with_context(|| format!("bind device endpoint on {}", config.bind))?;
        Ok(Self {
            listener,
            executor,
            read_timeout: config.read_timeout(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is aborted
    pub async fn run(self) -> Result<()> {
        info!("[API] Listening on {}", self.local_addr()?);

        loop {
            let (socket, addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("[API] Accept failed: {}", e);
                    continue;
                }
            };
            debug!("[API] Connection from {}", addr);

            let executor = self.executor.clone();
            let read_timeout = self.read_timeout;
            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, executor, read_timeout).await {
                    warn!("[API] Request from {} failed: {:#}", addr, e);
                }
            });
        }
    }

    /// Run on a background task
    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    executor: CommandExecutor,
    read_timeout: Duration,
) -> Result<()> {
    let request = timeout(read_timeout, read_request(&mut socket))
        .await
        .map_err(|_| anyhow!("no complete request within {:?}", read_timeout))??;
    debug!("[API] {} {}", request.method, request.path);

    let response = match (request.method.as_str(), request.path.as_str()) {
        ("GET", STATUS_PATH) => {
            let state = executor.telemetry().refresh().await;
            let body = serde_json::to_string(&state).context("encode status")?;
            http_response("200 OK", "application/json", &body)
        }
        ("POST", CONTROL_PATH) => match serde_json::from_slice::<ControlRequest>(&request.body) {
            Ok(control) => {
                let reply = run_control(&executor, control).await;
                let body = serde_json::to_string(&reply).context("encode control reply")?;
                http_response("200 OK", "application/json", &body)
            }
            Err(e) => http_response("400 Bad Request", "text/plain", &format!("invalid command body: {}", e)),
        },
        (_, STATUS_PATH) | (_, CONTROL_PATH) => {
            http_response("405 Method Not Allowed", "text/plain", "method not allowed")
        }
        _ => http_response("404 Not Found", "text/plain", "not found"),
    };

    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await?;
    Ok(())
}

async fn run_control(executor: &CommandExecutor, control: ControlRequest) -> ControlResponse {
    info!("[API] Control request: {}", control.cmd);
    let result = executor.execute(&control.cmd, control.lat.zip(control.lon)).await;
    let state = executor.telemetry().snapshot().await;

    ControlResponse {
        success: result.is_success(),
        outcome: result.outcome().to_string(),
        message: result.message().to_string(),
        state,
    }
}

async fn read_request(socket: &mut TcpStream) -> Result<Request> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        ensure!(buf.len() <= MAX_REQUEST_HEAD, "request head too large");
        let n = socket.read(&mut chunk).await?;
        ensure!(n > 0, "connection closed before the request head was complete");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let (method, path) = parse_request_line(&head)?;
    let length = content_length(&head)?;
    ensure!(length <= MAX_REQUEST_BODY, "request body too large");

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < length {
        let n = socket.read(&mut chunk).await?;
        ensure!(n > 0, "connection closed before the request body was complete");
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(length);

    Ok(Request { method, path, body })
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_request_line(head: &str) -> Result<(String, String)> {
    let line = head.lines().next().context("empty request")?;
    let mut parts = line.split_whitespace();
    let method = parts.next().context("missing method")?;
    let target = parts.next().context("missing request target")?;
    // Query strings do not select a different resource
    let path = target.split('?').next().unwrap_or(target);
    Ok((method.to_string(), path.to_string()))
}

fn content_length(head: &str) -> Result<usize> {
    for line in head.lines().skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                return value.trim().parse().context("invalid Content-Length");
            }
        }
    }
    Ok(0)
}

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}
