//! Current-status accessor: remote device when selected, local simulation otherwise

use super::remote::RemoteProxy;
use crate::telemetry::TelemetryService;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

pub struct StatusAccessor {
    proxy: Arc<RemoteProxy>,
    telemetry: Arc<TelemetryService>,
}

impl StatusAccessor {
    pub fn new(proxy: Arc<RemoteProxy>, telemetry: Arc<TelemetryService>) -> Self {
        Self { proxy, telemetry }
    }

    /// Status of whichever device is current
    pub async fn current_status(&self) -> Value {
        if self.proxy.selection().selected().await.is_some() {
            return self.proxy.get_status().await;
        }

        let state = self.telemetry.refresh().await;
        match serde_json::to_value(&state) {
            Ok(value) => value,
            Err(e) => {
                error!("[PROXY] Failed to encode local status: {}", e);
                json!({ "connected": false, "error": e.to_string() })
            }
        }
    }
}
