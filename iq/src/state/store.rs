//! In-memory job and batch store
//!
//! Pure data plus invariant enforcement. Not synchronized: the StateManager
//! actor is its only owner.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{Batch, BatchStatus, ItemId, Job, JobStatus, Priority};

use super::messages::{JobReceipt, StateError};

#[derive(Debug, Default)]
pub struct JobStore {
    jobs: HashMap<String, Job>,
    batches: HashMap<String, Batch>,
    /// Job ID -> batch IDs in creation order
    job_batches: HashMap<String, Vec<String>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a job and all of its batches
    ///
    /// Every chunk becomes one batch, in order. Rejects an empty chunk list
    /// or an empty chunk without touching the store.
    pub fn create_job(
        &mut self,
        priority: Priority,
        created_at: i64,
        chunks: Vec<Vec<ItemId>>,
    ) -> Result<JobReceipt, StateError> {
        debug!(?priority, created_at, chunk_count = chunks.len(), "JobStore::create_job: called");
        if chunks.is_empty() {
            return Err(StateError::InvalidJob("job has no batches".to_string()));
        }
        if chunks.iter().any(|c| c.is_empty()) {
            return Err(StateError::InvalidJob("batch has no items".to_string()));
        }

        let job = Job::new(priority, created_at);
        let job_id = job.id.clone();

        let batch_ids: Vec<String> = chunks
            .into_iter()
            .map(|items| {
                let batch = Batch::new(&job_id, items);
                let batch_id = batch.id.clone();
                self.batches.insert(batch_id.clone(), batch);
                batch_id
            })
            .collect();

        self.job_batches.insert(job_id.clone(), batch_ids.clone());
        self.jobs.insert(job_id.clone(), job);

        debug!(%job_id, batch_count = batch_ids.len(), "JobStore::create_job: created");
        Ok(JobReceipt { job_id, batch_ids })
    }

    pub fn get_job(&self, job_id: &str) -> Result<&Job, StateError> {
        self.jobs
            .get(job_id)
            .ok_or_else(|| StateError::NotFound(format!("Job {}", job_id)))
    }

    pub fn get_batch(&self, batch_id: &str) -> Result<&Batch, StateError> {
        self.batches
            .get(batch_id)
            .ok_or_else(|| StateError::NotFound(format!("Batch {}", batch_id)))
    }

    /// Batches of a job in creation order
    pub fn list_batches(&self, job_id: &str) -> Result<Vec<Batch>, StateError> {
        let ids = self
            .job_batches
            .get(job_id)
            .ok_or_else(|| StateError::NotFound(format!("Job {}", job_id)))?;

        ids.iter().map(|id| self.get_batch(id).cloned()).collect()
    }

    /// Move a batch to `status` and recompute its job's status
    ///
    /// Returns the job's new status. Illegal transitions leave both untouched.
    pub fn set_batch_status(&mut self, batch_id: &str, status: BatchStatus) -> Result<JobStatus, StateError> {
        debug!(%batch_id, ?status, "JobStore::set_batch_status: called");
        let batch = self
            .batches
            .get_mut(batch_id)
            .ok_or_else(|| StateError::NotFound(format!("Batch {}", batch_id)))?;

        if !batch.status.can_transition_to(status) {
            debug!(%batch_id, from = ?batch.status, to = ?status, "JobStore::set_batch_status: rejected");
            return Err(StateError::InvalidTransition {
                batch_id: batch_id.to_string(),
                from: batch.status,
                to: status,
            });
        }

        batch.status = status;
        let job_id = batch.job_id.clone();
        self.recompute_job_status(&job_id)
    }

    /// Re-derive and store a job's status from its batches
    pub fn recompute_job_status(&mut self, job_id: &str) -> Result<JobStatus, StateError> {
        let ids = self
            .job_batches
            .get(job_id)
            .ok_or_else(|| StateError::NotFound(format!("Job {}", job_id)))?;

        let derived = JobStatus::aggregate(ids.iter().filter_map(|id| self.batches.get(id)).map(|b| b.status));

        let job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StateError::NotFound(format!("Job {}", job_id)))?;
        if job.status != derived {
            debug!(%job_id, from = ?job.status, to = ?derived, "JobStore::recompute_job_status: changed");
        }
        job.status = derived;
        Ok(derived)
    }

    pub fn count_batches_with_status(&self, status: BatchStatus) -> usize {
        self.batches.values().filter(|b| b.status == status).count()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_job_registers_batches_in_order() {
        let mut store = JobStore::new();
        let receipt = store
            .create_job(Priority::Medium, 1000, vec![vec![1, 2, 3], vec![4, 5]])
            .unwrap();

        assert_eq!(receipt.batch_ids.len(), 2);
        let batches = store.list_batches(&receipt.job_id).unwrap();
        assert_eq!(batches[0].items, vec![1, 2, 3]);
        assert_eq!(batches[1].items, vec![4, 5]);
        assert!(batches.iter().all(|b| b.status == BatchStatus::NotStarted));
        assert!(batches.iter().all(|b| b.job_id == receipt.job_id));

        let job = store.get_job(&receipt.job_id).unwrap();
        assert_eq!(job.status, JobStatus::NotStarted);
        assert_eq!(job.created_at, 1000);
    }

    #[test]
    fn test_create_job_rejects_empty() {
        let mut store = JobStore::new();
        assert!(matches!(
            store.create_job(Priority::Low, 0, vec![]),
            Err(StateError::InvalidJob(_))
        ));
        assert!(matches!(
            store.create_job(Priority::Low, 0, vec![vec![1], vec![]]),
            Err(StateError::InvalidJob(_))
        ));
        assert_eq!(store.job_count(), 0);
        assert_eq!(store.batch_count(), 0);
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let mut store = JobStore::new();
        assert!(matches!(store.get_job("nope"), Err(StateError::NotFound(_))));
        assert!(matches!(store.list_batches("nope"), Err(StateError::NotFound(_))));
        assert!(matches!(
            store.set_batch_status("nope", BatchStatus::InProgress),
            Err(StateError::NotFound(_))
        ));
    }

    #[test]
    fn test_job_status_follows_batches() {
        let mut store = JobStore::new();
        let receipt = store.create_job(Priority::High, 0, vec![vec![1], vec![2]]).unwrap();
        let (first, second) = (&receipt.batch_ids[0], &receipt.batch_ids[1]);

        assert_eq!(
            store.set_batch_status(first, BatchStatus::InProgress).unwrap(),
            JobStatus::InProgress
        );
        assert_eq!(
            store.set_batch_status(first, BatchStatus::Completed).unwrap(),
            JobStatus::InProgress
        );
        store.set_batch_status(second, BatchStatus::InProgress).unwrap();
        assert_eq!(
            store.set_batch_status(second, BatchStatus::Completed).unwrap(),
            JobStatus::Completed
        );
        assert_eq!(store.get_job(&receipt.job_id).unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn test_failed_batch_settles_job_as_failed() {
        let mut store = JobStore::new();
        let receipt = store.create_job(Priority::High, 0, vec![vec![1], vec![2]]).unwrap();
        let (first, second) = (&receipt.batch_ids[0], &receipt.batch_ids[1]);

        store.set_batch_status(first, BatchStatus::InProgress).unwrap();
        assert_eq!(
            store.set_batch_status(first, BatchStatus::Failed).unwrap(),
            JobStatus::InProgress
        );
        store.set_batch_status(second, BatchStatus::InProgress).unwrap();
        assert_eq!(
            store.set_batch_status(second, BatchStatus::Completed).unwrap(),
            JobStatus::Failed
        );
    }

    #[test]
    fn test_illegal_transition_leaves_state_untouched() {
        let mut store = JobStore::new();
        let receipt = store.create_job(Priority::High, 0, vec![vec![1]]).unwrap();
        let batch_id = &receipt.batch_ids[0];

        let err = store.set_batch_status(batch_id, BatchStatus::Completed).unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidTransition {
                batch_id: batch_id.clone(),
                from: BatchStatus::NotStarted,
                to: BatchStatus::Completed,
            }
        );
        assert_eq!(store.get_batch(batch_id).unwrap().status, BatchStatus::NotStarted);
        assert_eq!(store.get_job(&receipt.job_id).unwrap().status, JobStatus::NotStarted);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut store = JobStore::new();
        let receipt = store.create_job(Priority::High, 0, vec![vec![1], vec![2]]).unwrap();
        store
            .set_batch_status(&receipt.batch_ids[0], BatchStatus::InProgress)
            .unwrap();

        let first = store.recompute_job_status(&receipt.job_id).unwrap();
        let second = store.recompute_job_status(&receipt.job_id).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, JobStatus::InProgress);
    }
}
