//! Drone Shared Types
//!
//! This crate provides the telemetry model and record types shared by the
//! control plane: the simulated device state machine, schedule and capture
//! records, and the timing constants the scheduler and discovery rely on.

pub mod records;
pub mod telemetry;

pub use records::{
    format_run_at, parse_run_at, CaptureRecord, Direction, DroneCommand, ParseError, ScheduleAction,
    ScheduleEntry,
};
pub use telemetry::{
    CommandRejected, DeviceState, Orientation, Position, Sensors, TelemetryModel,
};

/// Operating limits for the control plane
pub mod limits {
    /// Scheduler poll interval in seconds
    pub const SCHEDULER_POLL_INTERVAL_SECS: u64 = 15;

    /// Extra tolerance past one poll interval during which a schedule entry is still run
    pub const SCHEDULER_GRACE_SECS: u64 = 60;

    /// Discovery probe timeout in milliseconds
    pub const PROBE_TIMEOUT_MS: u64 = 200;

    /// Maximum number of discovery probes in flight
    pub const PROBE_MAX_CONCURRENT: usize = 100;

    /// Remote status request timeout in milliseconds
    pub const REMOTE_STATUS_TIMEOUT_MS: u64 = 2000;

    /// Deadline for a client of the device endpoint to send its request
    pub const REQUEST_READ_TIMEOUT_MS: u64 = 5000;

    /// Port the device status endpoint listens on
    pub const STATUS_PORT: u16 = 5000;

    /// Storage consumed by one capture, in megabytes
    pub const CAPTURE_SIZE_MB: f64 = 10.0;

    /// Lat/lon step applied by a horizontal move
    pub const MOVE_STEP_DEG: f64 = 0.0001;

    /// Altitude set on takeoff, in meters
    pub const TAKEOFF_ALTITUDE_M: f64 = 10.0;

    /// Lowest signal strength reported while connected
    pub const SIGNAL_FLOOR_PCT: f64 = 10.0;
}
