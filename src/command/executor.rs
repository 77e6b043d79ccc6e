//! Command executor - parses and dispatches drone commands

use super::handlers;
use crate::telemetry::TelemetryService;
use drone_shared::DroneCommand;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of command execution
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Command applied successfully
    Completed { message: String },
    /// Command accepted but execution failed
    Failed { message: String },
    /// Command rejected (unknown command, invalid state)
    Rejected { message: String },
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandResult::Completed { .. })
    }

    /// Short outcome name: `completed`, `failed` or `rejected`
    pub fn outcome(&self) -> &'static str {
        match self {
            CommandResult::Completed { .. } => "completed",
            CommandResult::Failed { .. } => "failed",
            CommandResult::Rejected { .. } => "rejected",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CommandResult::Completed { message }
            | CommandResult::Failed { message }
            | CommandResult::Rejected { message } => message,
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.outcome(), self.message())
    }
}

/// Executes commands against the telemetry service
#[derive(Clone)]
pub struct CommandExecutor {
    telemetry: Arc<TelemetryService>,
}

impl CommandExecutor {
    /// Create a new command executor
    pub fn new(telemetry: Arc<TelemetryService>) -> Self {
        Self { telemetry }
    }

    pub fn telemetry(&self) -> &Arc<TelemetryService> {
        &self.telemetry
    }

    /// Execute a command by name.
    ///
    /// `coords` is only used by `capture`. Unknown names are rejected,
    /// never panicked on.
    pub async fn execute(&self, name: &str, coords: Option<(f64, f64)>) -> CommandResult {
        match name.trim().parse::<DroneCommand>() {
            Ok(command) => self.dispatch(command, coords).await,
            Err(e) => {
                warn!("[CMD] {}", e);
                CommandResult::Rejected {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Execute an already parsed command
    pub async fn dispatch(&self, command: DroneCommand, coords: Option<(f64, f64)>) -> CommandResult {
        info!("[CMD] Executing {}", command);

        let result = match command {
            DroneCommand::Connect => handlers::handle_connect(&self.telemetry).await,
            DroneCommand::Disconnect => handlers::handle_disconnect(&self.telemetry).await,
            DroneCommand::Takeoff => handlers::handle_takeoff(&self.telemetry).await,
            DroneCommand::Land => handlers::handle_land(&self.telemetry).await,
            DroneCommand::Move(direction) => {
                handlers::handle_move(&self.telemetry, direction).await
            }
            DroneCommand::Capture => handlers::handle_capture(&self.telemetry, coords).await,
        };

        match &result {
            CommandResult::Completed { message } => info!("[CMD]   {} completed: {}", command, message),
            CommandResult::Rejected { message } => warn!("[CMD]   {} rejected: {}", command, message),
            CommandResult::Failed { message } => error!("[CMD]   {} failed: {}", command, message),
        }

        result
    }
}
