//! Scheduler for batch execution
//!
//! Priority queue of pending batches, the executor that runs one batch
//! with a rate-limit hold, and the single-consumer loop that drives them.

mod config;
mod core;
mod executor;
mod queue;

pub use config::SchedulerConfig;
pub use core::{Scheduler, SchedulerState, SchedulerStats, StatsHandle};
pub use executor::{BatchExecutor, BatchReport, ExecuteError};
pub use queue::{BatchQueue, QueueEntry};
