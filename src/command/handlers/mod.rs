//! Command handlers for the different command groups

mod camera;
mod flight;
mod link;

pub use camera::handle_capture;
pub use flight::{handle_land, handle_move, handle_takeoff};
pub use link::{handle_connect, handle_disconnect};

use super::CommandResult;
use drone_shared::CommandRejected;

/// Map a model rejection onto a command result
fn rejected(reason: CommandRejected) -> CommandResult {
    CommandResult::Rejected {
        message: reason.to_string(),
    }
}
