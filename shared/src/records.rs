//! Persisted record types and the command vocabulary they reference

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical format used when persisting a run-at timestamp
pub const RUN_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Formats accepted for ISO-style inputs (containing `T`)
const ISO_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// ISO-style formats carrying a UTC offset
const ISO_OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"];

/// Formats accepted for space-separated inputs
const PLAIN_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S%.f"];

/// Errors raised while interpreting textual commands and records
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown direction: {0}")]
    UnknownDirection(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown schedule action: {0}")]
    UnknownAction(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Movement directions accepted by the move command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Forward,
    Backward,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Forward,
        Direction::Backward,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ParseError::UnknownDirection(s.to_string()))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions a schedule entry may trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAction {
    Capture,
    Takeoff,
    Land,
}

impl ScheduleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleAction::Capture => "capture",
            ScheduleAction::Takeoff => "takeoff",
            ScheduleAction::Land => "land",
        }
    }
}

impl FromStr for ScheduleAction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "capture" => Ok(ScheduleAction::Capture),
            "takeoff" => Ok(ScheduleAction::Takeoff),
            "land" => Ok(ScheduleAction::Land),
            other => Err(ParseError::UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for ScheduleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands accepted by the command executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DroneCommand {
    Connect,
    Disconnect,
    Takeoff,
    Land,
    Capture,
    Move(Direction),
}

impl DroneCommand {
    pub fn name(&self) -> &'static str {
        match self {
            DroneCommand::Connect => "connect",
            DroneCommand::Disconnect => "disconnect",
            DroneCommand::Takeoff => "takeoff",
            DroneCommand::Land => "land",
            DroneCommand::Capture => "capture",
            DroneCommand::Move(dir) => dir.as_str(),
        }
    }
}

impl FromStr for DroneCommand {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connect" => Ok(DroneCommand::Connect),
            "disconnect" => Ok(DroneCommand::Disconnect),
            "takeoff" => Ok(DroneCommand::Takeoff),
            "land" => Ok(DroneCommand::Land),
            "capture" => Ok(DroneCommand::Capture),
            other => other
                .parse::<Direction>()
                .map(DroneCommand::Move)
                .map_err(|_| ParseError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for DroneCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ScheduleAction> for DroneCommand {
    fn from(action: ScheduleAction) -> Self {
        match action {
            ScheduleAction::Capture => DroneCommand::Capture,
            ScheduleAction::Takeoff => DroneCommand::Takeoff,
            ScheduleAction::Land => DroneCommand::Land,
        }
    }
}

/// A deferred command waiting in the store.
///
/// `run_at` and `action` are kept as the persisted text so that a malformed
/// entry can still be listed and corrected by an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: u64,
    pub name: String,
    pub run_at: String,
    pub lat: f64,
    pub lon: f64,
    pub action: String,
    pub created_at: String,
}

impl ScheduleEntry {
    /// Parsed execution time (naive UTC)
    pub fn run_at_time(&self) -> Result<NaiveDateTime, ParseError> {
        parse_run_at(&self.run_at)
    }

    /// Parsed action
    pub fn action_kind(&self) -> Result<ScheduleAction, ParseError> {
        self.action.parse()
    }
}

/// A capture artifact that was produced and stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub id: u64,
    pub filename: String,
    pub timestamp: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub note: String,
}

/// Parse a run-at timestamp.
///
/// Inputs containing `T` are read as ISO-8601 (seconds and fractions
/// optional), anything else as `YYYY-MM-DD HH:MM`. An ISO input with a
/// `Z` or `±HH:MM` offset is converted to UTC; without one it is taken
/// as UTC already.
pub fn parse_run_at(input: &str) -> Result<NaiveDateTime, ParseError> {
    let input = input.trim();
    let parsed = if input.contains('T') {
        parse_iso(input)
    } else {
        parse_naive(input, PLAIN_FORMATS)
    };

    parsed.ok_or_else(|| ParseError::InvalidTimestamp(input.to_string()))
}

fn parse_iso(input: &str) -> Option<NaiveDateTime> {
    if let Some(at) = parse_naive(input, ISO_FORMATS) {
        return Some(at);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Some(at.naive_utc());
    }
    if let Some(utc) = input.strip_suffix('Z').or_else(|| input.strip_suffix('z')) {
        return parse_naive(utc, ISO_FORMATS);
    }
    ISO_OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(input, fmt).ok())
        .map(|at| at.naive_utc())
}

fn parse_naive(input: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
}

/// Format a timestamp the way it is persisted
pub fn format_run_at(at: &NaiveDateTime) -> String {
    at.format(RUN_AT_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn entry(run_at: &str, action: &str) -> ScheduleEntry {
        ScheduleEntry {
            id: 1,
            name: "Mission".into(),
            run_at: run_at.into(),
            lat: 21.0,
            lon: 105.0,
            action: action.into(),
            created_at: "2025-01-01T00:00:00".into(),
        }
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("up".parse::<Direction>(), Ok(Direction::Up));
        assert_eq!("backward".parse::<Direction>(), Ok(Direction::Backward));
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(ParseError::UnknownDirection(_))
        ));
    }

    #[test]
    fn test_direction_names_are_distinct() {
        for (i, a) in Direction::ALL.iter().enumerate() {
            for b in &Direction::ALL[i + 1..] {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("capture".parse::<ScheduleAction>(), Ok(ScheduleAction::Capture));
        assert_eq!("land".parse::<ScheduleAction>(), Ok(ScheduleAction::Land));
        assert_eq!(
            "explode".parse::<ScheduleAction>(),
            Err(ParseError::UnknownAction("explode".into()))
        );
    }

    #[test]
    fn test_command_parse() {
        assert_eq!("connect".parse::<DroneCommand>(), Ok(DroneCommand::Connect));
        assert_eq!("capture".parse::<DroneCommand>(), Ok(DroneCommand::Capture));
        assert_eq!(
            "left".parse::<DroneCommand>(),
            Ok(DroneCommand::Move(Direction::Left))
        );
        assert_eq!(
            "barrel-roll".parse::<DroneCommand>(),
            Err(ParseError::UnknownCommand("barrel-roll".into()))
        );
    }

    #[test]
    fn test_command_names_round_trip() {
        let names = [
            "connect", "disconnect", "takeoff", "land", "capture", "up", "down", "left",
            "right", "forward", "backward",
        ];
        for name in names {
            let cmd: DroneCommand = name.parse().unwrap();
            assert_eq!(cmd.name(), name);
        }
    }

    #[test]
    fn test_schedule_action_maps_to_command() {
        assert_eq!(DroneCommand::from(ScheduleAction::Land), DroneCommand::Land);
        assert_eq!(DroneCommand::from(ScheduleAction::Capture), DroneCommand::Capture);
    }

    #[test]
    fn test_parse_iso_with_seconds_and_fraction() {
        let at = parse_run_at("2025-03-04T05:06:07.250").unwrap();
        assert_eq!(at.date(), NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
        assert_eq!(at.second(), 7);
    }

    #[test]
    fn test_parse_iso_minutes_only() {
        let at = parse_run_at("2025-03-04T05:06").unwrap();
        assert_eq!((at.hour(), at.minute(), at.second()), (5, 6, 0));
    }

    #[test]
    fn test_parse_iso_with_offset_converts_to_utc() {
        let at = parse_run_at("2025-01-02T03:04:05+02:00").unwrap();
        assert_eq!(format_run_at(&at), "2025-01-02T01:04:05");

        let at = parse_run_at("2025-01-02T23:30:00-01:00").unwrap();
        assert_eq!(format_run_at(&at), "2025-01-03T00:30:00");

        let at = parse_run_at("2025-01-02T03:04+0530").unwrap();
        assert_eq!(format_run_at(&at), "2025-01-01T21:34:00");
    }

    #[test]
    fn test_parse_iso_zulu() {
        let at = parse_run_at("2025-01-02T03:04:05Z").unwrap();
        assert_eq!(format_run_at(&at), "2025-01-02T03:04:05");

        let at = parse_run_at("2025-01-02T03:04Z").unwrap();
        assert_eq!(format_run_at(&at), "2025-01-02T03:04:00");
    }

    #[test]
    fn test_parse_plain_form() {
        let at = parse_run_at("2025-03-04 05:06").unwrap();
        assert_eq!(format_run_at(&at), "2025-03-04T05:06:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_run_at("next tuesday"),
            Err(ParseError::InvalidTimestamp(_))
        ));
        assert!(parse_run_at("").is_err());
    }

    #[test]
    fn test_entry_accessors() {
        let good = entry("2025-01-02T03:04:05", "takeoff");
        assert!(good.run_at_time().is_ok());
        assert_eq!(good.action_kind(), Ok(ScheduleAction::Takeoff));

        let bad = entry("not-a-time", "dance");
        assert!(bad.run_at_time().is_err());
        assert!(bad.action_kind().is_err());
    }
}
