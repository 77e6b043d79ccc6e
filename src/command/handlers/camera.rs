//! Camera handler (capture)

use super::rejected;
use crate::command::CommandResult;
use crate::telemetry::{CaptureError, TelemetryService};

/// Handle CAPTURE command
///
/// Without coordinates the capture is tagged with the current position.
pub async fn handle_capture(telemetry: &TelemetryService, coords: Option<(f64, f64)>) -> CommandResult {
    match telemetry.capture(coords).await {
        Ok(filename) => CommandResult::Completed {
            message: format!("Captured {}", filename),
        },
        Err(CaptureError::Rejected(reason)) => rejected(reason),
        Err(e @ CaptureError::Failed(_)) => CommandResult::Failed {
            message: e.to_string(),
        },
    }
}
