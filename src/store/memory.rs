//! In-memory mission store

use super::{MissionStore, StoreData};
use anyhow::Result;
use async_trait::async_trait;
use drone_shared::{CaptureRecord, ScheduleEntry};
use tokio::sync::Mutex;

/// Store that keeps everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MissionStore for MemoryStore {
    async fn insert_image(
        &self,
        filename: &str,
        lat: Option<f64>,
        lon: Option<f64>,
        note: &str,
    ) -> Result<u64> {
        Ok(self.data.lock().await.insert_image(filename, lat, lon, note))
    }

    async fn list_images(&self) -> Result<Vec<CaptureRecord>> {
        Ok(self.data.lock().await.images_newest_first())
    }

    async fn insert_schedule(
        &self,
        name: &str,
        run_at: &str,
        lat: f64,
        lon: f64,
        action: &str,
    ) -> Result<u64> {
        Ok(self
            .data
            .lock()
            .await
            .insert_schedule(name, run_at, lat, lon, action))
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduleEntry>> {
        Ok(self.data.lock().await.schedules_latest_first())
    }

    async fn delete_schedule(&self, id: u64) -> Result<()> {
        self.data.lock().await.delete_schedule(id);
        Ok(())
    }
}
