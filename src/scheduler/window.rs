//! Due-window classification

use chrono::NaiveDateTime;
use std::time::Duration;

/// Where an entry's run-at time sits relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Due {
    /// Run-at is in the future
    Pending,
    /// Run-at has passed and is still inside the window
    Now,
    /// The window has elapsed; the entry is left in place
    Stale,
}

/// Classify `run_at` against `now` with an execution window of `window`.
///
/// An entry is due when `run_at <= now` and `now - run_at < window`.
pub fn classify(run_at: NaiveDateTime, now: NaiveDateTime, window: Duration) -> Due {
    let elapsed_ms = (now - run_at).num_milliseconds();
    let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);

    if elapsed_ms < 0 {
        Due::Pending
    } else if elapsed_ms < window_ms {
        Due::Now
    } else {
        Due::Stale
    }
}
