//! State manager messages
//!
//! Commands and responses for the actor pattern.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{Batch, BatchStatus, ItemId, Job, JobStatus, Priority};
use crate::scheduler::QueueEntry;

/// Errors from state operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid transition for batch {batch_id}: {from} -> {to}")]
    InvalidTransition {
        batch_id: String,
        from: BatchStatus,
        to: BatchStatus,
    },

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// IDs created for a newly submitted job, batches in creation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReceipt {
    pub job_id: String,
    pub batch_ids: Vec<String>,
}

/// A job together with its batches, read in one critical section
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub job: Job,
    pub batches: Vec<Batch>,
}

/// Counters describing the current store and queue
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub jobs: usize,
    pub batches: usize,
    pub queued: usize,
    pub in_progress: usize,
}

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Job operations
    SubmitJob {
        priority: Priority,
        created_at: i64,
        chunks: Vec<Vec<ItemId>>,
        reply: oneshot::Sender<StateResponse<JobReceipt>>,
    },
    GetJob {
        job_id: String,
        reply: oneshot::Sender<StateResponse<Job>>,
    },
    ListBatches {
        job_id: String,
        reply: oneshot::Sender<StateResponse<Vec<Batch>>>,
    },
    Snapshot {
        job_id: String,
        reply: oneshot::Sender<StateResponse<JobSnapshot>>,
    },

    // Batch operations
    GetBatch {
        batch_id: String,
        reply: oneshot::Sender<StateResponse<Batch>>,
    },
    SetBatchStatus {
        batch_id: String,
        status: BatchStatus,
        reply: oneshot::Sender<StateResponse<JobStatus>>,
    },

    // Queue operations
    PopNext {
        reply: oneshot::Sender<Option<QueueEntry>>,
    },

    Stats {
        reply: oneshot::Sender<StoreStats>,
    },

    // Shutdown
    Shutdown,
}
