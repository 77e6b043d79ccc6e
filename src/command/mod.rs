//! Command execution for the drone
//!
//! This module handles:
//! - Parsing command names into `DroneCommand`s
//! - Dispatching to the link, flight and camera handlers
//! - Converting model rejections and I/O failures into a `CommandResult`
//!
//! Interactive callers and the scheduler go through the same executor.

mod executor;
pub mod handlers;

pub use executor::{CommandExecutor, CommandResult};
