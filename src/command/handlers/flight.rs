//! Flight handlers (takeoff, land, move)

use super::rejected;
use crate::command::CommandResult;
use crate::telemetry::TelemetryService;
use drone_shared::Direction;

/// Handle TAKEOFF command
pub async fn handle_takeoff(telemetry: &TelemetryService) -> CommandResult {
    match telemetry.takeoff().await {
        Ok(()) => CommandResult::Completed {
            message: "Takeoff command sent".into(),
        },
        Err(reason) => rejected(reason),
    }
}

/// Handle LAND command
pub async fn handle_land(telemetry: &TelemetryService) -> CommandResult {
    match telemetry.land().await {
        Ok(()) => CommandResult::Completed {
            message: "Land command sent".into(),
        },
        Err(reason) => rejected(reason),
    }
}

/// Handle a directional move (up/down/left/right/forward/backward)
pub async fn handle_move(telemetry: &TelemetryService, direction: Direction) -> CommandResult {
    match telemetry.move_step(direction).await {
        Ok(()) => CommandResult::Completed {
            message: format!("Moved {}", direction),
        },
        Err(reason) => rejected(reason),
    }
}
