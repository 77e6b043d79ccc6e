//! JSON file mission store
//!
//! The whole store is one JSON document. Every call re-reads the file, and
//! mutations rewrite it through a temporary file followed by a rename.

use super::{MissionStore, StoreData};
use anyhow::{Context, Result};
use async_trait::async_trait;
use drone_shared::{CaptureRecord, ScheduleEntry};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// Store persisted as a single JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store at `path`; the file is created on first write
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<StoreData> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(StoreData::default()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parse store {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreData::default()),
            Err(e) => Err(e).with_context(|| format!("read store {}", self.path.display())),
        }
    }

    async fn save(&self, data: &StoreData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("create store dir {}", parent.display()))?;
            }
        }

        let encoded = serde_json::to_vec_pretty(data).context("encode store")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &encoded)
            .await
            .with_context(|| format!("write store {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace store {}", self.path.display()))?;

        debug!("Store saved ({} bytes) to {}", encoded.len(), self.path.display());
        Ok(())
    }

    /// Load, apply `f`, save, all under the process-local lock
    async fn update<T>(&self, f: impl FnOnce(&mut StoreData) -> T) -> Result<T> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        let out = f(&mut data);
        self.save(&data).await?;
        Ok(out)
    }
}

#[async_trait]
impl MissionStore for JsonFileStore {
    async fn insert_image(
        &self,
        filename: &str,
        lat: Option<f64>,
        lon: Option<f64>,
        note: &str,
    ) -> Result<u64> {
        self.update(|data| data.insert_image(filename, lat, lon, note))
            .await
    }

    async fn list_images(&self) -> Result<Vec<CaptureRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.images_newest_first())
    }

    async fn insert_schedule(
        &self,
        name: &str,
        run_at: &str,
        lat: f64,
        lon: f64,
        action: &str,
    ) -> Result<u64> {
        self.update(|data| data.insert_schedule(name, run_at, lat, lon, action))
            .await
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduleEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.schedules_latest_first())
    }

    async fn delete_schedule(&self, id: u64) -> Result<()> {
        self.update(|data| data.delete_schedule(id)).await
    }
}
