//! Request-facing services
//!
//! Ingestion (validate, split, register) and status reporting.

mod error;
mod ingest;
mod status;

pub use error::{MAX_ITEM_ID, MIN_ITEM_ID, ServiceError, ValidationError};
pub use ingest::{IngestionService, partition, validate_ids};
pub use status::{BatchView, JobStatusReport, StatusService};
