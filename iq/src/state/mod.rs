//! State management with actor pattern
//!
//! StateManager owns the job store and the batch queue and processes
//! messages via channels. State is in-memory and lives as long as the
//! daemon process.

mod manager;
mod messages;
mod store;

pub use manager::StateManager;
pub use messages::{JobReceipt, JobSnapshot, StateCommand, StateError, StateResponse, StoreStats};
pub use store::JobStore;
