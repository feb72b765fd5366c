//! Status service
//!
//! Reports a job's derived status together with its batches, read from
//! one consistent snapshot.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{BatchStatus, ItemId, JobStatus};
use crate::state::{JobSnapshot, StateManager};

use super::error::ServiceError;

/// One batch as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchView {
    pub batch_id: String,
    pub items: Vec<ItemId>,
    pub status: BatchStatus,
}

/// A job's status and batches, batches in creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub job_id: String,
    pub status: JobStatus,
    pub batches: Vec<BatchView>,
}

impl From<JobSnapshot> for JobStatusReport {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            job_id: snapshot.job.id,
            status: snapshot.job.status,
            batches: snapshot
                .batches
                .into_iter()
                .map(|b| BatchView {
                    batch_id: b.id,
                    items: b.items,
                    status: b.status,
                })
                .collect(),
        }
    }
}

#[derive(Clone)]
pub struct StatusService {
    state: StateManager,
}

impl StatusService {
    pub fn new(state: StateManager) -> Self {
        Self { state }
    }

    /// Current status of a job; unknown IDs are NotFound with no side effects
    pub async fn status(&self, job_id: &str) -> Result<JobStatusReport, ServiceError> {
        debug!(%job_id, "StatusService::status: called");
        let snapshot = self.state.snapshot(job_id).await?;
        let report = JobStatusReport::from(snapshot);
        debug!(%job_id, status = %report.status, batches = report.batches.len(), "StatusService::status: reporting");
        Ok(report)
    }
}
