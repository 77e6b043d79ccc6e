//! HTTP client for a selected device's endpoint

use super::selection::SelectedDevice;
use crate::api::{ControlRequest, CONTROL_PATH, STATUS_PATH};
use crate::config::ProxyConfig;
use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Talks to the selected device.
///
/// Every failure degrades to a `connected: false` status object (or a
/// `success: false` command reply); nothing is returned as an error.
pub struct RemoteProxy {
    http: reqwest::Client,
    selection: Arc<SelectedDevice>,
    status_port: u16,
}

impl RemoteProxy {
    pub fn new(config: &ProxyConfig, selection: Arc<SelectedDevice>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            http,
            selection,
            status_port: config.status_port,
        })
    }

    pub fn selection(&self) -> &Arc<SelectedDevice> {
        &self.selection
    }

    /// Status URL for a device address
    pub fn status_url(&self, address: &str) -> String {
        format!("http://{}:{}{}", address, self.status_port, STATUS_PATH)
    }

    /// Control URL for a device address
    pub fn control_url(&self, address: &str) -> String {
        format!("http://{}:{}{}", address, self.status_port, CONTROL_PATH)
    }

    /// Status of the selected device, or a disconnected placeholder
    pub async fn get_status(&self) -> Value {
        let Some(address) = self.selection.selected().await else {
            return json!({
                "connected": false,
                "message": "No device selected",
            });
        };

        match self.fetch(&address).await {
            Ok(status) => status,
            Err(e) => {
                warn!("[PROXY] Status from {} unavailable: {:#}", address, e);
                json!({
                    "connected": false,
                    "error": format!("{:#}", e),
                })
            }
        }
    }

    /// Run one command on the selected device and return its reply
    pub async fn send_command(&self, name: &str, coords: Option<(f64, f64)>) -> Value {
        let Some(address) = self.selection.selected().await else {
            return json!({
                "success": false,
                "message": "No device selected",
            });
        };

        let request = ControlRequest {
            cmd: name.to_string(),
            lat: coords.map(|(lat, _)| lat),
            lon: coords.map(|(_, lon)| lon),
        };

        match self.post_control(&address, &request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("[PROXY] Command '{}' to {} failed: {:#}", name, address, e);
                json!({
                    "success": false,
                    "error": format!("{:#}", e),
                })
            }
        }
    }

    async fn post_control(&self, address: &str, request: &ControlRequest) -> Result<Value> {
        let url = self.control_url(address);
        debug!("[PROXY] POST {} ({})", url, request.cmd);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if status != StatusCode::OK {
            bail!("device {} answered HTTP {}", address, status);
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("invalid command reply from {}", address))
    }

    async fn fetch(&self, address: &str) -> Result<Value> {
        let url = self.status_url(address);
        debug!("[PROXY] GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        if status != StatusCode::OK {
            bail!("device {} answered HTTP {}", address, status);
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("invalid status body from {}", address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StatusServer;
    use crate::command::CommandExecutor;
    use crate::config::ApiConfig;
    use crate::store::MemoryStore;
    use crate::telemetry::TelemetryService;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn proxy(port: u16) -> RemoteProxy {
        let config = ProxyConfig {
            status_port: port,
            timeout_ms: 500,
        };
        RemoteProxy::new(&config, Arc::new(SelectedDevice::new())).unwrap()
    }

    /// Serve one fixed raw HTTP response to every connection
    async fn canned_server(response: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        port
    }

    #[tokio::test]
    async fn test_no_selection_reports_disconnected() {
        // Port 1 would refuse; no request is made at all without a selection
        let proxy = proxy(1);
        let status = proxy.get_status().await;

        assert_eq!(status["connected"], json!(false));
        assert!(status["message"].as_str().unwrap().contains("No device"));
    }

    #[test]
    fn test_status_url() {
        let proxy = proxy(5000);
        assert_eq!(
            proxy.status_url("192.168.1.9"),
            "http://192.168.1.9:5000/api/status"
        );
        assert_eq!(
            proxy.control_url("192.168.1.9"),
            "http://192.168.1.9:5000/api/control"
        );
    }

    #[tokio::test]
    async fn test_non_200_degrades_to_error_status() {
        let port = canned_server(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nConnection: close\r\n\r\nbusy",
        )
        .await;
        let proxy = proxy(port);
        proxy.selection().select("127.0.0.1").await;

        let status = proxy.get_status().await;
        assert_eq!(status["connected"], json!(false));
        assert!(status["error"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_unreachable_device_degrades_to_error_status() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let proxy = proxy(port);
        proxy.selection().select("127.0.0.1").await;

        let status = proxy.get_status().await;
        assert_eq!(status["connected"], json!(false));
        assert!(status["error"].is_string());
    }

    #[tokio::test]
    async fn test_200_body_returned_verbatim() {
        let port = canned_server(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 30\r\nConnection: close\r\n\r\n{\"connected\":true,\"custom\":42}",
        )
        .await;
        let proxy = proxy(port);
        proxy.selection().select("127.0.0.1").await;

        let status = proxy.get_status().await;
        assert_eq!(status, json!({"connected": true, "custom": 42}));
    }

    async fn live_device(dir: &TempDir) -> (u16, Arc<TelemetryService>) {
        let telemetry = Arc::new(TelemetryService::new(
            Arc::new(MemoryStore::new()),
            dir.path(),
        ));
        let config = ApiConfig {
            bind: "127.0.0.1:0".into(),
            read_timeout_ms: 1000,
        };
        let server = StatusServer::bind(&config, CommandExecutor::new(telemetry.clone()))
            .await
            .unwrap();
        let port = server.local_addr().unwrap().port();
        server.spawn();
        (port, telemetry)
    }

    #[tokio::test]
    async fn test_proxies_live_status_endpoint() {
        let dir = TempDir::new().unwrap();
        let (port, telemetry) = live_device(&dir).await;
        telemetry.land().await.unwrap();

        let proxy = proxy(port);
        proxy.selection().select("127.0.0.1").await;

        let status = proxy.get_status().await;
        assert_eq!(status["connected"], json!(true));
        assert_eq!(status["flying"], json!(false));
        assert_eq!(status["position"]["alt_m"], json!(0.0));
    }

    #[tokio::test]
    async fn test_command_reaches_running_device() {
        let dir = TempDir::new().unwrap();
        let (port, telemetry) = live_device(&dir).await;

        let proxy = proxy(port);
        proxy.selection().select("127.0.0.1").await;

        let reply = proxy.send_command("land", None).await;
        assert_eq!(reply["success"], json!(true));
        assert_eq!(reply["outcome"], json!("completed"));

        // The running device changed, not a local copy
        assert!(!telemetry.snapshot().await.flying);
        let status = proxy.get_status().await;
        assert_eq!(status["flying"], json!(false));
    }

    #[tokio::test]
    async fn test_command_capture_sends_coordinates() {
        let dir = TempDir::new().unwrap();
        let (port, telemetry) = live_device(&dir).await;

        let proxy = proxy(port);
        proxy.selection().select("127.0.0.1").await;

        let reply = proxy.send_command("capture", Some((12.5, 99.25))).await;
        assert_eq!(reply["success"], json!(true));
        assert!(telemetry.snapshot().await.latest_capture_ref.is_some());
    }

    #[tokio::test]
    async fn test_command_without_selection_is_not_sent() {
        let proxy = proxy(1);
        let reply = proxy.send_command("land", None).await;

        assert_eq!(reply["success"], json!(false));
        assert!(reply["message"].as_str().unwrap().contains("No device"));
    }

    #[tokio::test]
    async fn test_command_to_unreachable_device_reports_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let proxy = proxy(port);
        proxy.selection().select("127.0.0.1").await;

        let reply = proxy.send_command("takeoff", None).await;
        assert_eq!(reply["success"], json!(false));
        assert!(reply["error"].is_string());
    }
}
