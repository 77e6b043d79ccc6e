//! Scheduler loop

use super::window::{classify, Due};
use crate::command::CommandExecutor;
use crate::config::SchedulerConfig;
use crate::store::MissionStore;
use chrono::{NaiveDateTime, Utc};
use drone_shared::{DroneCommand, ScheduleAction, ScheduleEntry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Outcome of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Ids dispatched this cycle
    pub executed: Vec<u64>,
    /// Subset of `executed` whose command was rejected or failed
    pub unsuccessful: Vec<u64>,
    /// Entries whose run-at is still ahead
    pub pending: usize,
    /// Entries past their window, left in the store
    pub stale: usize,
    /// Entries skipped for an unparsable run-at or unknown action
    pub malformed: usize,
    /// The schedule list could not be loaded
    pub load_failed: bool,
}

/// Polls the store and dispatches due entries through the command executor
pub struct Scheduler {
    store: Arc<dyn MissionStore>,
    executor: CommandExecutor,
    poll_interval: Duration,
    grace: Duration,
    /// Entries already dispatched whose delete has not gone through yet,
    /// keyed by id with their run-at
    undeleted: Mutex<HashMap<u64, NaiveDateTime>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn MissionStore>,
        executor: CommandExecutor,
        config: &SchedulerConfig,
    ) -> Self {
        Self::with_timing(store, executor, config.poll_interval(), config.grace())
    }

    pub fn with_timing(
        store: Arc<dyn MissionStore>,
        executor: CommandExecutor,
        poll_interval: Duration,
        grace: Duration,
    ) -> Self {
        Self {
            store,
            executor,
            poll_interval,
            grace,
            undeleted: Mutex::new(HashMap::new()),
        }
    }

    /// How long after its run-at an entry is still executed
    pub fn window(&self) -> Duration {
        self.poll_interval + self.grace
    }

    /// Run one poll cycle as of `now` (naive UTC).
    ///
    /// Never fails: store errors and bad entries are logged and counted.
    pub async fn poll_once(&self, now: NaiveDateTime) -> PollReport {
        let mut report = PollReport::default();

        let entries = match self.store.list_schedules().await {
            Ok(entries) => entries,
            Err(e) => {
                error!("[SCHED] Failed to load schedules: {:#}", e);
                report.load_failed = true;
                return report;
            }
        };

        for entry in entries {
            let run_at = match entry.run_at_time() {
                Ok(t) => t,
                Err(e) => {
                    warn!("[SCHED] Skipping '{}' (id {}): {}", entry.name, entry.id, e);
                    report.malformed += 1;
                    continue;
                }
            };

            let already_ran = self.undeleted.lock().await.contains_key(&entry.id);

            match classify(run_at, now, self.window()) {
                Due::Pending => report.pending += 1,
                Due::Stale => {
                    debug!(
                        "[SCHED] '{}' (id {}) missed its window at {}",
                        entry.name, entry.id, entry.run_at
                    );
                    report.stale += 1;
                }
                Due::Now if already_ran => {
                    debug!("[SCHED] '{}' (id {}) already ran", entry.name, entry.id);
                    self.delete_entry(&entry, run_at).await;
                }
                Due::Now => match entry.action_kind() {
                    Ok(action) => {
                        if !self.run_entry(&entry, action).await {
                            report.unsuccessful.push(entry.id);
                        }
                        self.delete_entry(&entry, run_at).await;
                        report.executed.push(entry.id);
                    }
                    Err(e) => {
                        warn!("[SCHED] Skipping '{}' (id {}): {}", entry.name, entry.id, e);
                        report.malformed += 1;
                    }
                },
            }
        }

        // Past the window the entry can no longer come due
        let window = self.window();
        self.undeleted
            .lock()
            .await
            .retain(|_, run_at| classify(*run_at, now, window) != Due::Stale);

        report
    }

    /// Dispatch one due entry, returning whether the command completed
    async fn run_entry(&self, entry: &ScheduleEntry, action: ScheduleAction) -> bool {
        let coords = (action == ScheduleAction::Capture).then_some((entry.lat, entry.lon));
        let result = self
            .executor
            .dispatch(DroneCommand::from(action), coords)
            .await;

        if result.is_success() {
            info!(
                "[SCHED] Ran '{}' (id {}) {}: {}",
                entry.name, entry.id, action, result
            );
        } else {
            // One attempt per entry: the entry is consumed regardless
            warn!(
                "[SCHED] '{}' (id {}) {} did not complete and will not be retried: {}",
                entry.name, entry.id, action, result
            );
        }
        result.is_success()
    }

    /// Remove a dispatched entry, remembering it while the store refuses
    async fn delete_entry(&self, entry: &ScheduleEntry, run_at: NaiveDateTime) {
        let mut undeleted = self.undeleted.lock().await;
        match self.store.delete_schedule(entry.id).await {
            Ok(()) => {
                undeleted.remove(&entry.id);
            }
            Err(e) => {
                if undeleted.insert(entry.id, run_at).is_none() {
                    error!(
                        "[SCHED] Failed to delete schedule {} (it will not run again): {:#}",
                        entry.id, e
                    );
                }
            }
        }
    }

    /// Start polling on a background task
    pub fn start(self) -> SchedulerHandle {
        let task = tokio::spawn(async move {
            info!(
                "[SCHED] Started (poll every {:?}, window {:?})",
                self.poll_interval,
                self.window()
            );

            let mut ticker = interval(self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let report = self.poll_once(Utc::now().naive_utc()).await;
                if !report.executed.is_empty() {
                    info!(
                        "[SCHED] Executed {} scheduled command(s), {} unsuccessful",
                        report.executed.len(),
                        report.unsuccessful.len()
                    );
                }
            }
        });

        SchedulerHandle { task }
    }
}

/// Handle to the running scheduler loop
pub struct SchedulerHandle {
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn abort(&self) {
        self.task.abort();
        info!("[SCHED] Stopped");
    }
}
