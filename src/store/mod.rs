//! Persistence for schedule entries and capture records
//!
//! This module handles:
//! - The `MissionStore` trait used by the scheduler and the capture path
//! - An in-memory store (tests, ephemeral runs)
//! - A JSON-file store re-read on every call, so edits made by another
//!   process are visible to the next scheduler poll

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;
use drone_shared::{CaptureRecord, ScheduleEntry};
use serde::{Deserialize, Serialize};

/// Append/list/delete store for captures and schedules.
///
/// Each call is atomic on its own; there are no multi-call transactions.
#[async_trait]
pub trait MissionStore: Send + Sync {
    /// Append a capture record, returning its id
    async fn insert_image(
        &self,
        filename: &str,
        lat: Option<f64>,
        lon: Option<f64>,
        note: &str,
    ) -> Result<u64>;

    /// All capture records, newest first
    async fn list_images(&self) -> Result<Vec<CaptureRecord>>;

    /// Append a schedule entry, returning its id
    async fn insert_schedule(
        &self,
        name: &str,
        run_at: &str,
        lat: f64,
        lon: f64,
        action: &str,
    ) -> Result<u64>;

    /// All schedule entries, latest `run_at` first
    async fn list_schedules(&self) -> Result<Vec<ScheduleEntry>>;

    /// Remove a schedule entry. Removing an unknown id is not an error.
    async fn delete_schedule(&self, id: u64) -> Result<()>;
}

/// Current UTC time in the format used for record timestamps
pub fn utc_timestamp() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Store contents shared by both implementations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct StoreData {
    next_image_id: u64,
    next_schedule_id: u64,
    images: Vec<CaptureRecord>,
    schedules: Vec<ScheduleEntry>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            next_image_id: 1,
            next_schedule_id: 1,
            images: Vec::new(),
            schedules: Vec::new(),
        }
    }
}

impl StoreData {
    fn insert_image(&mut self, filename: &str, lat: Option<f64>, lon: Option<f64>, note: &str) -> u64 {
        let id = self.next_image_id;
        self.next_image_id += 1;
        self.images.push(CaptureRecord {
            id,
            filename: filename.to_string(),
            timestamp: utc_timestamp(),
            lat,
            lon,
            note: note.to_string(),
        });
        id
    }

    fn images_newest_first(&self) -> Vec<CaptureRecord> {
        let mut images = self.images.clone();
        images.sort_by(|a, b| b.id.cmp(&a.id));
        images
    }

    fn insert_schedule(&mut self, name: &str, run_at: &str, lat: f64, lon: f64, action: &str) -> u64 {
        let id = self.next_schedule_id;
        self.next_schedule_id += 1;
        self.schedules.push(ScheduleEntry {
            id,
            name: name.to_string(),
            run_at: run_at.to_string(),
            lat,
            lon,
            action: action.to_string(),
            created_at: utc_timestamp(),
        });
        id
    }

    fn schedules_latest_first(&self) -> Vec<ScheduleEntry> {
        let mut schedules = self.schedules.clone();
        schedules.sort_by(|a, b| b.run_at.cmp(&a.run_at));
        schedules
    }

    fn delete_schedule(&mut self, id: u64) {
        self.schedules.retain(|s| s.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_per_table() {
        let mut data = StoreData::default();
        assert_eq!(data.insert_image("a.txt", None, None, ""), 1);
        assert_eq!(data.insert_image("b.txt", None, None, ""), 2);
        assert_eq!(data.insert_schedule("m", "2025-01-01T00:00:00", 0.0, 0.0, "land"), 1);
    }

    #[test]
    fn test_deleted_ids_are_not_reused() {
        let mut data = StoreData::default();
        let first = data.insert_schedule("m", "2025-01-01T00:00:00", 0.0, 0.0, "land");
        data.delete_schedule(first);
        let second = data.insert_schedule("m", "2025-01-01T00:00:00", 0.0, 0.0, "land");
        assert_ne!(first, second);
    }

    #[test]
    fn test_schedule_ordering() {
        let mut data = StoreData::default();
        data.insert_schedule("early", "2025-01-01T08:00:00", 0.0, 0.0, "takeoff");
        data.insert_schedule("late", "2025-01-01T18:00:00", 0.0, 0.0, "land");

        let names: Vec<_> = data
            .schedules_latest_first()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["late", "early"]);
    }

    #[test]
    fn test_utc_timestamp_parses_back() {
        let ts = utc_timestamp();
        assert!(drone_shared::parse_run_at(&ts).is_ok(), "timestamp {} should parse", ts);
    }
}
