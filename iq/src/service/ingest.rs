//! Ingestion service
//!
//! Validates submitted item IDs, splits them into fixed-size batches and
//! registers the job. Batches are enqueued in input order as part of the
//! same state operation.

use tracing::{debug, info, warn};

use crate::domain::{ItemId, Priority, now_ms};
use crate::state::StateManager;

use super::error::{MAX_ITEM_ID, MIN_ITEM_ID, ServiceError, ValidationError};

/// Check that `ids` is non-empty and every ID is in range
pub fn validate_ids(ids: &[ItemId]) -> Result<(), ValidationError> {
    if ids.is_empty() {
        return Err(ValidationError::EmptyIds);
    }
    match ids
        .iter()
        .enumerate()
        .find(|(_, id)| !(MIN_ITEM_ID..=MAX_ITEM_ID).contains(*id))
    {
        Some((index, &id)) => Err(ValidationError::OutOfRange { index, id }),
        None => Ok(()),
    }
}

/// Split `ids` into chunks of `batch_size`, preserving order
///
/// Only the last chunk may be shorter. `batch_size` must be non-zero.
pub fn partition(ids: &[ItemId], batch_size: usize) -> Vec<Vec<ItemId>> {
    ids.chunks(batch_size).map(<[ItemId]>::to_vec).collect()
}

#[derive(Clone)]
pub struct IngestionService {
    state: StateManager,
    batch_size: usize,
}

impl IngestionService {
    /// `batch_size` of zero is treated as one
    pub fn new(state: StateManager, batch_size: usize) -> Self {
        Self {
            state,
            batch_size: batch_size.max(1),
        }
    }

    /// Register a job for `ids` and return its ID
    ///
    /// The job and all its batches exist, and are queued, before this returns.
    pub async fn ingest(&self, ids: Vec<ItemId>, priority: Priority) -> Result<String, ServiceError> {
        debug!(count = ids.len(), ?priority, "IngestionService::ingest: called");
        if let Err(e) = validate_ids(&ids) {
            warn!(error = %e, "Rejected ingestion");
            return Err(e.into());
        }

        let chunks = partition(&ids, self.batch_size);
        let batch_count = chunks.len();
        let receipt = self.state.submit_job(priority, now_ms(), chunks).await?;

        info!(job_id = %receipt.job_id, %priority, batches = batch_count, "New ingestion");
        Ok(receipt.job_id)
    }
}
