//! External processor
//!
//! The per-item call that batches are driven through. The scheduler awaits
//! each call but never interprets the result.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

mod error;

pub use error::ProcessError;

use crate::config::ProcessorConfig;
use crate::domain::ItemId;

/// Result of processing one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub item: ItemId,
    pub data: String,
}

/// External processing call
///
/// Assumed to always eventually complete. No timeout is applied by callers:
/// a call that hangs stalls the single worker.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, item: ItemId) -> Result<ProcessOutput, ProcessError>;
}

/// Processor that simulates a downstream call with fixed latency
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    latency: Duration,
}

impl SimulatedProcessor {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl Processor for SimulatedProcessor {
    async fn process(&self, item: ItemId) -> Result<ProcessOutput, ProcessError> {
        debug!(item, latency = ?self.latency, "SimulatedProcessor::process: called");
        tokio::time::sleep(self.latency).await;
        Ok(ProcessOutput {
            item,
            data: "processed".to_string(),
        })
    }
}

/// Create the processor described by config
pub fn create_processor(config: &ProcessorConfig) -> Arc<dyn Processor> {
    debug!(latency_ms = config.latency_ms, "create_processor: called");
    Arc::new(SimulatedProcessor::new(config.latency()))
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records every item it is asked to process, optionally failing on one
    #[derive(Default)]
    pub struct RecordingProcessor {
        seen: Mutex<Vec<ItemId>>,
        fail_on: Option<ItemId>,
    }

    impl RecordingProcessor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(item: ItemId) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail_on: Some(item),
            }
        }

        pub fn seen(&self) -> Vec<ItemId> {
            self.seen.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Processor for RecordingProcessor {
        async fn process(&self, item: ItemId) -> Result<ProcessOutput, ProcessError> {
            debug!(item, "RecordingProcessor::process: called");
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(item);
            }
            if self.fail_on == Some(item) {
                return Err(ProcessError::Rejected {
                    item,
                    message: "configured to fail".to_string(),
                });
            }
            Ok(ProcessOutput {
                item,
                data: "recorded".to_string(),
            })
        }
    }
}
