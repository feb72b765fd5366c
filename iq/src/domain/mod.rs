//! Domain types for ingestq
//!
//! Jobs, the batches they are split into, and job priority.

mod job;
mod priority;

pub use job::{Batch, BatchStatus, ItemId, Job, JobStatus, now_ms};
pub use priority::Priority;
