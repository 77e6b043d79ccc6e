//! Telemetry service
//!
//! Owns the simulated drone behind a single lock. Every read-modify-write on
//! the device state (drift step, command application) happens while holding
//! that lock, so concurrent commands never interleave partial updates.

mod capture;

use capture::CaptureWriter;

use crate::store::MissionStore;
use drone_shared::{CommandRejected, DeviceState, Direction, TelemetryModel};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Note attached to every capture record
pub const CAPTURE_NOTE: &str = "Simulated capture";

/// Why a capture did not happen
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Rejected(#[from] CommandRejected),

    #[error("capture failed: {0:#}")]
    Failed(#[from] anyhow::Error),
}

/// Lock-guarded telemetry model plus the capture pipeline
pub struct TelemetryService {
    model: Mutex<TelemetryModel>,
    store: Arc<dyn MissionStore>,
    writer: CaptureWriter,
}

impl TelemetryService {
    /// Create a service with the default simulated state
    pub fn new(store: Arc<dyn MissionStore>, capture_dir: impl Into<PathBuf>) -> Self {
        Self::with_model(TelemetryModel::new(), store, capture_dir)
    }

    /// Create a service starting from a given model
    pub fn with_model(
        model: TelemetryModel,
        store: Arc<dyn MissionStore>,
        capture_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model: Mutex::new(model),
            store,
            writer: CaptureWriter::new(capture_dir),
        }
    }

    /// Current state without advancing the simulation
    pub async fn snapshot(&self) -> DeviceState {
        self.model.lock().await.state().clone()
    }

    /// Advance the simulation one step and return the new state
    pub async fn refresh(&self) -> DeviceState {
        let mut model = self.model.lock().await;
        model.refresh(&mut rand::thread_rng());
        model.state().clone()
    }

    pub async fn connect(&self) {
        self.model.lock().await.connect();
        info!("Drone connected");
    }

    pub async fn disconnect(&self) {
        self.model.lock().await.disconnect();
        info!("Drone disconnected");
    }

    pub async fn takeoff(&self) -> Result<(), CommandRejected> {
        self.model.lock().await.takeoff()
    }

    pub async fn land(&self) -> Result<(), CommandRejected> {
        self.model.lock().await.land()
    }

    pub async fn move_step(&self, direction: Direction) -> Result<(), CommandRejected> {
        self.model.lock().await.move_step(direction)
    }

    /// Take a capture at `coords`, or at the current position when absent.
    ///
    /// Writes the artifact, appends a capture record, then updates the
    /// device state. The model stays locked throughout, so a concurrent
    /// disconnect lands either before the check or after the update.
    /// Returns the artifact file name.
    pub async fn capture(&self, coords: Option<(f64, f64)>) -> Result<String, CaptureError> {
        let mut model = self.model.lock().await;
        model.check_capture()?;
        let pos = model.state().position;
        let (lat, lon) = coords.unwrap_or((pos.lat, pos.lon));

        let filename = self.writer.write(lat, lon).await?;
        self.store
            .insert_image(&filename, Some(lat), Some(lon), CAPTURE_NOTE)
            .await?;

        model.record_capture(filename.clone());
        if model.is_storage_over_capacity() {
            let state = model.state();
            warn!(
                "Storage over capacity: {:.0}/{:.0} MB used",
                state.storage_used_mb, state.storage_total_mb
            );
        }

        debug!("Captured {} at lat={:.6}, lon={:.6}", filename, lat, lon);
        Ok(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> (TelemetryService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let svc = TelemetryService::new(store.clone(), dir.path());
        (svc, store)
    }

    #[tokio::test]
    async fn test_refresh_drains_battery_monotonically() {
        let dir = TempDir::new().unwrap();
        let (svc, _) = service(&dir);

        let mut last = svc.snapshot().await.battery_pct;
        for _ in 0..200 {
            let state = svc.refresh().await;
            assert!(state.battery_pct <= last);
            assert!((10.0..=100.0).contains(&state.signal_pct));
            last = state.battery_pct;
        }
    }

    #[tokio::test]
    async fn test_capture_persists_record_and_updates_state() {
        let dir = TempDir::new().unwrap();
        let (svc, store) = service(&dir);
        let before = svc.snapshot().await;

        let name = svc.capture(Some((10.5, 20.5))).await.unwrap();

        let after = svc.snapshot().await;
        assert_eq!(after.latest_capture_ref.as_deref(), Some(name.as_str()));
        assert_eq!(after.storage_used_mb, before.storage_used_mb + 10.0);

        let images = store.list_images().await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filename, name);
        assert_eq!(images[0].lat, Some(10.5));
        assert_eq!(images[0].note, CAPTURE_NOTE);
        assert!(dir.path().join(&name).exists());
    }

    #[tokio::test]
    async fn test_capture_defaults_to_current_position() {
        let dir = TempDir::new().unwrap();
        let (svc, store) = service(&dir);
        let pos = svc.snapshot().await.position;

        svc.capture(None).await.unwrap();

        let images = store.list_images().await.unwrap();
        assert_eq!(images[0].lat, Some(pos.lat));
        assert_eq!(images[0].lon, Some(pos.lon));
    }

    #[tokio::test]
    async fn test_capture_rejected_when_disconnected() {
        let dir = TempDir::new().unwrap();
        let (svc, store) = service(&dir);
        svc.disconnect().await;

        let result = svc.capture(None).await;
        assert!(matches!(
            result,
            Err(CaptureError::Rejected(CommandRejected::NotConnected))
        ));
        assert!(store.list_images().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_moves_are_serialized() {
        let dir = TempDir::new().unwrap();
        let (svc, _) = service(&dir);
        let svc = Arc::new(svc);
        svc.takeoff().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.move_step(Direction::Up).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(svc.snapshot().await.position.alt_m, 60.0);
    }

    /// Store whose image inserts take a while
    struct SlowStore {
        inner: MemoryStore,
        delay: std::time::Duration,
    }

    #[async_trait::async_trait]
    impl MissionStore for SlowStore {
        async fn insert_image(
            &self,
            filename: &str,
            lat: Option<f64>,
            lon: Option<f64>,
            note: &str,
        ) -> anyhow::Result<u64> {
            tokio::time::sleep(self.delay).await;
            self.inner.insert_image(filename, lat, lon, note).await
        }

        async fn list_images(&self) -> anyhow::Result<Vec<drone_shared::CaptureRecord>> {
            self.inner.list_images().await
        }

        async fn insert_schedule(
            &self,
            name: &str,
            run_at: &str,
            lat: f64,
            lon: f64,
            action: &str,
        ) -> anyhow::Result<u64> {
            self.inner.insert_schedule(name, run_at, lat, lon, action).await
        }

        async fn list_schedules(&self) -> anyhow::Result<Vec<drone_shared::ScheduleEntry>> {
            self.inner.list_schedules().await
        }

        async fn delete_schedule(&self, id: u64) -> anyhow::Result<()> {
            self.inner.delete_schedule(id).await
        }
    }

    #[tokio::test]
    async fn test_disconnect_during_capture_waits_for_it() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SlowStore {
            inner: MemoryStore::new(),
            delay: std::time::Duration::from_millis(100),
        });
        let svc = Arc::new(TelemetryService::new(store.clone(), dir.path()));
        let before = svc.snapshot().await;

        let capture = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.capture(None).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        svc.disconnect().await;

        let name = capture.await.unwrap().unwrap();
        let after = svc.snapshot().await;

        // The capture completed while connected; the disconnect came after it
        assert!(!after.connected);
        assert_eq!(after.storage_used_mb, before.storage_used_mb + 10.0);
        assert_eq!(after.latest_capture_ref.as_deref(), Some(name.as_str()));
        assert_eq!(store.list_images().await.unwrap().len(), 1);

        // Nothing further is recorded once disconnected
        assert!(svc.capture(None).await.is_err());
        assert_eq!(store.list_images().await.unwrap().len(), 1);
        assert_eq!(svc.snapshot().await.storage_used_mb, after.storage_used_mb);
    }
}
