//! Drone Telemetry Model
//!
//! Holds the simulated device state, applies telemetry drift and decides
//! which commands are legal in the current state.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::limits;
use crate::records::Direction;

/// Reasons a command is refused by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandRejected {
    #[error("drone is not connected")]
    NotConnected,

    #[error("drone is not flying")]
    NotFlying,
}

/// Geographic position of the drone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
}

/// Attitude of the drone in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub roll_deg: f64,
}

/// Environmental sensor readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensors {
    pub temperature_c: f64,
    pub pressure_hpa: f64,
}

/// Full device state, as reported by `/api/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub connected: bool,
    pub flying: bool,
    pub battery_pct: f64,
    pub signal_pct: f64,
    pub storage_present: bool,
    pub storage_used_mb: f64,
    pub storage_total_mb: f64,
    pub position: Position,
    pub orientation: Orientation,
    pub sensors: Sensors,
    pub latest_capture_ref: Option<String>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            connected: true,
            flying: true,
            battery_pct: 92.0,
            signal_pct: 56.0,
            storage_present: true,
            storage_used_mb: 1024.0,
            storage_total_mb: 8192.0,
            position: Position {
                lat: 21.070735,
                lon: 105.383553,
                alt_m: 100.0,
            },
            orientation: Orientation {
                yaw_deg: 1.01,
                pitch_deg: 6.89,
                roll_deg: 0.67,
            },
            sensors: Sensors {
                temperature_c: 25.0,
                pressure_hpa: 1013.25,
            },
            latest_capture_ref: None,
        }
    }
}

/// Simulated drone: state plus the rules that mutate it
#[derive(Debug, Clone, Default)]
pub struct TelemetryModel {
    state: DeviceState,
}

impl TelemetryModel {
    /// Create a model with the default simulated state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a model starting from a given state
    pub fn with_state(state: DeviceState) -> Self {
        Self { state }
    }

    /// Current state
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected
    }

    pub fn is_flying(&self) -> bool {
        self.state.flying
    }

    pub fn connect(&mut self) {
        self.state.connected = true;
    }

    pub fn disconnect(&mut self) {
        self.state.connected = false;
    }

    /// Apply one drift step. No-op while disconnected.
    pub fn refresh<R: Rng>(&mut self, rng: &mut R) {
        if !self.state.connected {
            return;
        }

        let drain: f64 = rng.gen_range(0.0..=0.05);
        self.state.battery_pct = (self.state.battery_pct - drain).max(0.0);

        let jitter: f64 = rng.gen_range(0.0..=1.0);
        self.state.signal_pct = (100.0 - jitter).max(limits::SIGNAL_FLOOR_PCT);

        let temp_delta: f64 = rng.gen_range(-0.1..=0.1);
        let pressure_delta: f64 = rng.gen_range(-0.5..=0.5);
        self.state.sensors.temperature_c += temp_delta;
        self.state.sensors.pressure_hpa += pressure_delta;

        let yaw_delta: f64 = rng.gen_range(-1.0..=1.0);
        self.state.orientation.yaw_deg = normalize_yaw(self.state.orientation.yaw_deg + yaw_delta);
    }

    pub fn takeoff(&mut self) -> Result<(), CommandRejected> {
        self.require_connected()?;
        self.state.flying = true;
        self.state.position.alt_m = limits::TAKEOFF_ALTITUDE_M;
        Ok(())
    }

    pub fn land(&mut self) -> Result<(), CommandRejected> {
        self.require_connected()?;
        self.state.flying = false;
        self.state.position.alt_m = 0.0;
        Ok(())
    }

    /// Move one fixed step in the given direction
    pub fn move_step(&mut self, direction: Direction) -> Result<(), CommandRejected> {
        self.require_connected()?;
        if !self.state.flying {
            return Err(CommandRejected::NotFlying);
        }

        let pos = &mut self.state.position;
        match direction {
            Direction::Up => pos.alt_m += 1.0,
            Direction::Down => pos.alt_m = (pos.alt_m - 1.0).max(0.0),
            Direction::Left => pos.lon -= limits::MOVE_STEP_DEG,
            Direction::Right => pos.lon += limits::MOVE_STEP_DEG,
            Direction::Forward => pos.lat += limits::MOVE_STEP_DEG,
            Direction::Backward => pos.lat -= limits::MOVE_STEP_DEG,
        }
        Ok(())
    }

    /// Check that a capture can be taken right now
    pub fn check_capture(&self) -> Result<(), CommandRejected> {
        self.require_connected()
    }

    /// Record a capture artifact that has been produced and persisted.
    ///
    /// Storage capacity is tracked but not enforced.
    pub fn record_capture(&mut self, reference: impl Into<String>) {
        self.state.latest_capture_ref = Some(reference.into());
        self.state.storage_used_mb += limits::CAPTURE_SIZE_MB;
    }

    /// True once captures have used more storage than is available
    pub fn is_storage_over_capacity(&self) -> bool {
        self.state.storage_used_mb > self.state.storage_total_mb
    }

    fn require_connected(&self) -> Result<(), CommandRejected> {
        if self.state.connected {
            Ok(())
        } else {
            Err(CommandRejected::NotConnected)
        }
    }
}

/// Wrap a heading into `[0, 360)`
pub fn normalize_yaw(yaw: f64) -> f64 {
    let wrapped = yaw.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
