//! Job and Batch domain types
//!
//! A Job is one ingestion submission. Its items are split into fixed-size
//! Batches, which are the unit of scheduling and execution. Job status is
//! never set directly after creation: it is always derived from the
//! statuses of its batches.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::priority::Priority;

/// Identifier of a single work item
pub type ItemId = i64;

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn generate_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Batch status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Queued, waiting for the worker
    #[default]
    NotStarted,
    /// Items are being sent to the processor
    InProgress,
    /// Every item was processed
    Completed,
    /// The processor failed part way through
    Failed,
}

impl BatchStatus {
    /// Whether `self -> next` is a legal transition
    ///
    /// Batches only ever move forward: NotStarted -> InProgress -> Completed | Failed.
    pub fn can_transition_to(self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::InProgress) | (Self::InProgress, Self::Completed) | (Self::InProgress, Self::Failed)
        )
    }

    /// Completed and Failed are terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Job status, derived from batch statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Derive a job status from the statuses of its batches
    ///
    /// - all NotStarted -> NotStarted
    /// - all Completed -> Completed
    /// - all terminal with at least one Failed -> Failed
    /// - anything else -> InProgress
    pub fn aggregate<I>(statuses: I) -> JobStatus
    where
        I: IntoIterator<Item = BatchStatus>,
    {
        let mut all_not_started = true;
        let mut all_completed = true;
        let mut all_terminal = true;

        for status in statuses {
            all_not_started &= status == BatchStatus::NotStarted;
            all_completed &= status == BatchStatus::Completed;
            all_terminal &= status.is_terminal();
        }

        let derived = if all_not_started {
            JobStatus::NotStarted
        } else if all_completed {
            JobStatus::Completed
        } else if all_terminal {
            JobStatus::Failed
        } else {
            JobStatus::InProgress
        };
        debug!(?derived, "JobStatus::aggregate: derived");
        derived
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One ingestion submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier
    pub id: String,

    /// Derived status, recomputed on every batch transition
    pub status: JobStatus,

    /// Priority class, fixed at creation
    pub priority: Priority,

    /// Submission timestamp (Unix milliseconds), shared by every batch
    pub created_at: i64,
}

impl Job {
    /// Create a new job with a generated ID
    pub fn new(priority: Priority, created_at: i64) -> Self {
        Self {
            id: generate_id(),
            status: JobStatus::NotStarted,
            priority,
            created_at,
        }
    }
}

/// A fixed-size chunk of a job's items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Unique identifier
    pub id: String,

    /// Owning job
    pub job_id: String,

    /// Items in original submission order, never empty
    pub items: Vec<ItemId>,

    /// Current status, changed only by the batch executor
    pub status: BatchStatus,
}

impl Batch {
    /// Create a new batch for a job with a generated ID
    pub fn new(job_id: impl Into<String>, items: Vec<ItemId>) -> Self {
        Self {
            id: generate_id(),
            job_id: job_id.into(),
            items,
            status: BatchStatus::NotStarted,
        }
    }
}
