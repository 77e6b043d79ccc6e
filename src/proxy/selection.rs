//! Process-wide selected device

use tokio::sync::RwLock;
use tracing::info;

/// At most one device address the proxy talks to. Not persisted.
#[derive(Debug, Default)]
pub struct SelectedDevice {
    address: RwLock<Option<String>>,
}

impl SelectedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `address`. Reachability is not checked here.
    pub async fn select(&self, address: impl Into<String>) -> String {
        let address = address.into().trim().to_string();
        info!("[PROXY] Selected device {}", address);
        let ack = format!("Selected device {}", address);
        *self.address.write().await = Some(address);
        ack
    }

    #[cfg(test)]
    pub async fn clear(&self) {
        if self.address.write().await.take().is_some() {
            info!("[PROXY] Device selection cleared");
        }
    }

    pub async fn selected(&self) -> Option<String> {
        self.address.read().await.clone()
    }
}
