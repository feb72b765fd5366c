//! Batch executor
//!
//! Drives one batch through the processor, recording each status
//! transition, then holds the worker idle for the rate-limit interval.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{BatchStatus, ItemId, JobStatus};
use crate::processor::{ProcessError, Processor};
use crate::state::{StateError, StateManager};

/// Errors from executing a batch
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Batch {batch_id} failed on item {item}: {source}")]
    Processing {
        batch_id: String,
        item: ItemId,
        #[source]
        source: ProcessError,
    },

    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Summary of a finished batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub batch_id: String,
    pub job_id: String,
    pub items_processed: usize,
    pub job_status: JobStatus,
}

pub struct BatchExecutor {
    state: StateManager,
    processor: Arc<dyn Processor>,
    rate_limit: Duration,
}

impl BatchExecutor {
    pub fn new(state: StateManager, processor: Arc<dyn Processor>, rate_limit: Duration) -> Self {
        debug!(?rate_limit, "BatchExecutor::new: called");
        Self {
            state,
            processor,
            rate_limit,
        }
    }

    /// Run one batch to completion
    ///
    /// NotStarted -> InProgress, every item in order, -> Completed, then the
    /// rate-limit hold. A processor failure marks the batch Failed and
    /// returns immediately, without the hold.
    pub async fn execute(&self, batch_id: &str) -> Result<BatchReport, ExecuteError> {
        debug!(%batch_id, "BatchExecutor::execute: called");
        let batch = self.state.get_batch(batch_id).await?;

        let job_status = self.state.set_batch_status(batch_id, BatchStatus::InProgress).await?;
        info!(%batch_id, job_id = %batch.job_id, items = ?batch.items, %job_status, "Starting batch");

        for &item in &batch.items {
            debug!(%batch_id, item, "BatchExecutor::execute: processing item");
            if let Err(source) = self.processor.process(item).await {
                debug!(%batch_id, item, error = %source, "BatchExecutor::execute: processor failed");
                let job_status = self.state.set_batch_status(batch_id, BatchStatus::Failed).await?;
                debug!(%batch_id, %job_status, "BatchExecutor::execute: batch marked failed");
                return Err(ExecuteError::Processing {
                    batch_id: batch_id.to_string(),
                    item,
                    source,
                });
            }
        }

        let job_status = self.state.set_batch_status(batch_id, BatchStatus::Completed).await?;
        info!(%batch_id, job_id = %batch.job_id, %job_status, "Completed batch");

        debug!(rate_limit = ?self.rate_limit, "BatchExecutor::execute: holding for rate limit");
        tokio::time::sleep(self.rate_limit).await;

        Ok(BatchReport {
            batch_id: batch_id.to_string(),
            job_id: batch.job_id,
            items_processed: batch.items.len(),
            job_status,
        })
    }
}
