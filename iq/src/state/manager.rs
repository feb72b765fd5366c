//! StateManager - actor that owns the job store and the batch queue
//!
//! Store and queue live in one task and are reached only through commands,
//! so every read-modify-write (submit + enqueue, batch transition + job
//! recomputation, queue pop) runs as a single critical section.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc, oneshot};
use tracing::{debug, info};

use crate::domain::{Batch, BatchStatus, ItemId, Job, JobStatus, Priority};
use crate::scheduler::{BatchQueue, QueueEntry};

use super::messages::{JobReceipt, JobSnapshot, StateCommand, StateError, StateResponse, StoreStats};
use super::store::JobStore;

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
    /// Signalled whenever new batches are enqueued
    work_available: Arc<Notify>,
}

impl StateManager {
    /// Spawn a new StateManager actor with an empty store
    pub fn spawn() -> Self {
        debug!("spawn: called");
        let (tx, rx) = mpsc::channel(256);

        tokio::spawn(actor_loop(JobStore::new(), BatchQueue::new(), rx));

        info!("StateManager spawned");

        Self {
            tx,
            work_available: Arc::new(Notify::new()),
        }
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> StateCommand) -> Result<T, StateError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)
    }

    // === Job operations ===

    /// Create a job with one batch per chunk and enqueue every batch
    ///
    /// Batches are enqueued in chunk order, in the same critical section
    /// that creates them.
    pub async fn submit_job(
        &self,
        priority: Priority,
        created_at: i64,
        chunks: Vec<Vec<ItemId>>,
    ) -> StateResponse<JobReceipt> {
        debug!(?priority, created_at, chunk_count = chunks.len(), "submit_job: called");
        let result = self
            .request(|reply| StateCommand::SubmitJob {
                priority,
                created_at,
                chunks,
                reply,
            })
            .await?;

        if result.is_ok() {
            self.work_available.notify_one();
        }

        result
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: &str) -> StateResponse<Job> {
        debug!(%job_id, "get_job: called");
        self.request(|reply| StateCommand::GetJob {
            job_id: job_id.to_string(),
            reply,
        })
        .await?
    }

    /// List a job's batches in creation order
    pub async fn list_batches(&self, job_id: &str) -> StateResponse<Vec<Batch>> {
        debug!(%job_id, "list_batches: called");
        self.request(|reply| StateCommand::ListBatches {
            job_id: job_id.to_string(),
            reply,
        })
        .await?
    }

    /// Read a job and its batches consistently
    pub async fn snapshot(&self, job_id: &str) -> StateResponse<JobSnapshot> {
        debug!(%job_id, "snapshot: called");
        self.request(|reply| StateCommand::Snapshot {
            job_id: job_id.to_string(),
            reply,
        })
        .await?
    }

    // === Batch operations ===

    /// Get a batch by ID
    pub async fn get_batch(&self, batch_id: &str) -> StateResponse<Batch> {
        debug!(%batch_id, "get_batch: called");
        self.request(|reply| StateCommand::GetBatch {
            batch_id: batch_id.to_string(),
            reply,
        })
        .await?
    }

    /// Transition a batch and return its job's recomputed status
    pub async fn set_batch_status(&self, batch_id: &str, status: BatchStatus) -> StateResponse<JobStatus> {
        debug!(%batch_id, ?status, "set_batch_status: called");
        self.request(|reply| StateCommand::SetBatchStatus {
            batch_id: batch_id.to_string(),
            status,
            reply,
        })
        .await?
    }

    // === Queue operations ===

    /// Pop the next batch to run, without waiting
    pub async fn pop_next(&self) -> StateResponse<Option<QueueEntry>> {
        debug!("pop_next: called");
        self.request(|reply| StateCommand::PopNext { reply }).await
    }

    /// Wait until work is enqueued or `idle` elapses
    ///
    /// Returns true if woken by an enqueue. A permit left by an enqueue that
    /// happened while nobody was waiting is consumed immediately.
    pub async fn wait_for_work(&self, idle: Duration) -> bool {
        tokio::time::timeout(idle, self.work_available.notified())
            .await
            .is_ok()
    }

    /// Current store and queue counters
    pub async fn stats(&self) -> StateResponse<StoreStats> {
        debug!("stats: called");
        self.request(|reply| StateCommand::Stats { reply }).await
    }

    /// Shutdown the StateManager
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

async fn actor_loop(mut store: JobStore, mut queue: BatchQueue, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            StateCommand::SubmitJob {
                priority,
                created_at,
                chunks,
                reply,
            } => {
                debug!(?priority, "actor_loop: SubmitJob command");
                let result = store.create_job(priority, created_at, chunks);
                if let Ok(receipt) = &result {
                    for batch_id in &receipt.batch_ids {
                        queue.push(priority.rank(), created_at, batch_id.clone());
                    }
                }
                let _ = reply.send(result);
            }

            StateCommand::GetJob { job_id, reply } => {
                debug!(%job_id, "actor_loop: GetJob command");
                let _ = reply.send(store.get_job(&job_id).cloned());
            }

            StateCommand::ListBatches { job_id, reply } => {
                debug!(%job_id, "actor_loop: ListBatches command");
                let _ = reply.send(store.list_batches(&job_id));
            }

            StateCommand::Snapshot { job_id, reply } => {
                debug!(%job_id, "actor_loop: Snapshot command");
                let result = store.get_job(&job_id).cloned().and_then(|job| {
                    let batches = store.list_batches(&job_id)?;
                    Ok(JobSnapshot { job, batches })
                });
                let _ = reply.send(result);
            }

            StateCommand::GetBatch { batch_id, reply } => {
                debug!(%batch_id, "actor_loop: GetBatch command");
                let _ = reply.send(store.get_batch(&batch_id).cloned());
            }

            StateCommand::SetBatchStatus {
                batch_id,
                status,
                reply,
            } => {
                debug!(%batch_id, ?status, "actor_loop: SetBatchStatus command");
                let _ = reply.send(store.set_batch_status(&batch_id, status));
            }

            StateCommand::PopNext { reply } => {
                debug!(queued = queue.len(), "actor_loop: PopNext command");
                let _ = reply.send(queue.pop());
            }

            StateCommand::Stats { reply } => {
                debug!("actor_loop: Stats command");
                let _ = reply.send(StoreStats {
                    jobs: store.job_count(),
                    batches: store.batch_count(),
                    queued: queue.len(),
                    in_progress: store.count_batches_with_status(BatchStatus::InProgress),
                });
            }

            StateCommand::Shutdown => {
                debug!("actor_loop: Shutdown command");
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}
