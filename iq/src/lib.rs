//! ingestq - Priority Batch Ingestion Scheduler
//!
//! Clients submit lists of item IDs with a priority. Each submission becomes a
//! job split into fixed-size batches, and a single background worker drains
//! the batches highest priority first, oldest first within a priority, holding
//! a rate-limit delay after every batch. A job's status is derived from the
//! statuses of its batches.
//!
//! # Modules
//!
//! - [`domain`] - Jobs, batches, statuses and priority
//! - [`state`] - State actor owning the job store and the batch queue
//! - [`scheduler`] - Priority queue, batch executor and the worker loop
//! - [`processor`] - External per-item processing call
//! - [`service`] - Ingestion and status services
//! - [`ipc`] - Unix socket transport between CLI and daemon
//! - [`daemon`] - Daemon runtime wiring and lifecycle
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod ipc;
pub mod processor;
pub mod scheduler;
pub mod service;
pub mod state;

// Re-export commonly used types
pub use config::{Config, ProcessorConfig};
pub use daemon::Daemon;
pub use domain::{Batch, BatchStatus, ItemId, Job, JobStatus, Priority};
pub use ipc::{DaemonClient, DaemonMessage, DaemonResponse, ErrorKind};
pub use processor::{ProcessError, ProcessOutput, Processor, SimulatedProcessor, create_processor};
pub use scheduler::{BatchQueue, QueueEntry, Scheduler, SchedulerConfig, SchedulerStats, StatsHandle};
pub use service::{IngestionService, JobStatusReport, ServiceError, StatusService, ValidationError};
pub use state::{StateError, StateManager, StoreStats};
