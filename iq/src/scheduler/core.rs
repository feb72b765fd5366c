//! Scheduler loop
//!
//! The single consumer of the batch queue. It pops the highest-priority
//! batch, runs it to completion through the executor, and repeats. Only one
//! batch is ever in progress: the downstream is modeled as one rate-limited
//! dependency, so batches are serialized rather than run in a pool.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::processor::Processor;
use crate::state::StateManager;

use super::config::SchedulerConfig;
use super::executor::BatchExecutor;
use super::queue::QueueEntry;

/// What the loop is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Queue empty, waiting for work
    #[default]
    Idle,
    /// A batch is being executed
    Dispatching,
}

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub state: SchedulerState,
    pub current_batch: Option<String>,
    pub total_dispatched: u64,
    pub total_completed: u64,
    pub total_failed: u64,
}

/// Shared read access to the scheduler's statistics
#[derive(Debug, Clone, Default)]
pub struct StatsHandle {
    inner: Arc<Mutex<SchedulerStats>>,
}

impl StatsHandle {
    pub async fn snapshot(&self) -> SchedulerStats {
        self.inner.lock().await.clone()
    }

    async fn update(&self, f: impl FnOnce(&mut SchedulerStats)) {
        let mut stats = self.inner.lock().await;
        f(&mut stats);
    }
}

/// The Scheduler drains the batch queue one batch at a time
pub struct Scheduler {
    config: SchedulerConfig,
    state: StateManager,
    executor: BatchExecutor,
    stats: StatsHandle,
}

impl Scheduler {
    /// Create a new scheduler with the given configuration
    pub fn new(config: SchedulerConfig, state: StateManager, processor: Arc<dyn Processor>) -> Self {
        debug!(?config, "Scheduler::new: called");
        let executor = BatchExecutor::new(state.clone(), processor, config.rate_limit());
        Self {
            config,
            state,
            executor,
            stats: StatsHandle::default(),
        }
    }

    /// Handle for reading statistics while the loop runs
    pub fn stats_handle(&self) -> StatsHandle {
        self.stats.clone()
    }

    /// Run until a shutdown signal arrives (or its sender is dropped)
    ///
    /// Shutdown is observed between batches and while idle or backing off.
    /// A batch that has started always runs to completion here; callers that
    /// cannot wait must abort the task, which leaves that batch InProgress.
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        debug!("Scheduler::run: called");
        info!("Scheduler started");

        loop {
            if shutdown_requested(&mut shutdown_rx) {
                debug!("Scheduler::run: shutdown observed between batches");
                break;
            }

            match self.state.pop_next().await {
                Ok(Some(entry)) => {
                    if !self.dispatch(entry).await {
                        debug!("Scheduler::run: batch failed, backing off");
                        if self.pause(self.config.error_backoff(), &mut shutdown_rx).await {
                            break;
                        }
                    }
                }
                Ok(None) => {
                    tokio::select! {
                        woken = self.state.wait_for_work(self.config.idle_poll()) => {
                            debug!(woken, "Scheduler::run: idle wait finished");
                        }
                        _ = shutdown_rx.recv() => {
                            debug!("Scheduler::run: shutdown while idle");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Scheduler failed to read the queue");
                    if self.pause(self.config.error_backoff(), &mut shutdown_rx).await {
                        break;
                    }
                }
            }
        }

        self.stats.update(|s| s.state = SchedulerState::Idle).await;
        info!("Scheduler stopped");
    }

    /// Execute one popped batch, returning whether it succeeded
    async fn dispatch(&self, entry: QueueEntry) -> bool {
        debug!(batch_id = %entry.batch_id, priority_rank = entry.priority_rank, created_at = entry.created_at, "Scheduler::dispatch: called");
        info!(batch_id = %entry.batch_id, priority_rank = entry.priority_rank, "Dispatching batch");

        let batch_id = entry.batch_id.clone();
        self.stats
            .update(|s| {
                s.state = SchedulerState::Dispatching;
                s.current_batch = Some(batch_id);
                s.total_dispatched += 1;
            })
            .await;

        let succeeded = match self.executor.execute(&entry.batch_id).await {
            Ok(report) => {
                debug!(?report, "Scheduler::dispatch: batch completed");
                true
            }
            Err(e) => {
                error!(batch_id = %entry.batch_id, error = %e, "Batch execution failed");
                false
            }
        };

        self.stats
            .update(|s| {
                s.state = SchedulerState::Idle;
                s.current_batch = None;
                if succeeded {
                    s.total_completed += 1;
                } else {
                    s.total_failed += 1;
                }
            })
            .await;

        succeeded
    }

    /// Sleep for `delay` unless shutdown arrives first; returns true on shutdown
    async fn pause(&self, delay: Duration, shutdown_rx: &mut mpsc::Receiver<()>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = shutdown_rx.recv() => {
                warn!("Shutdown during back-off");
                true
            }
        }
    }
}

fn shutdown_requested(shutdown_rx: &mut mpsc::Receiver<()>) -> bool {
    match shutdown_rx.try_recv() {
        Ok(()) | Err(mpsc::error::TryRecvError::Disconnected) => true,
        Err(mpsc::error::TryRecvError::Empty) => false,
    }
}
