//! Schedule execution
//!
//! A background loop polls the mission store and dispatches entries whose
//! run-at time falls inside the due window, deleting each after one attempt.

mod runner;
mod window;

pub use runner::Scheduler;
