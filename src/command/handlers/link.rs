//! Link handlers (connect, disconnect)

use crate::command::CommandResult;
use crate::telemetry::TelemetryService;

/// Handle CONNECT command
pub async fn handle_connect(telemetry: &TelemetryService) -> CommandResult {
    telemetry.connect().await;
    CommandResult::Completed {
        message: "Drone connected".into(),
    }
}

/// Handle DISCONNECT command
pub async fn handle_disconnect(telemetry: &TelemetryService) -> CommandResult {
    telemetry.disconnect().await;
    CommandResult::Completed {
        message: "Drone disconnected".into(),
    }
}
