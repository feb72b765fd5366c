//! IPC message types for daemon communication
//!
//! Simple JSON-over-newline protocol. Each message is a single line of JSON followed by `\n`.

use serde::{Deserialize, Serialize};

use crate::domain::{ItemId, Priority};
use crate::scheduler::SchedulerStats;
use crate::service::{BatchView, JobStatusReport, ServiceError};
use crate::state::StoreStats;

/// Messages from CLI to Daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DaemonMessage {
    /// Submit item IDs as a new job
    Ingest {
        ids: Vec<ItemId>,
        #[serde(default)]
        priority: Priority,
    },

    /// Query a job's status
    Status { job_id: String },

    /// Scheduler and store counters
    Stats,

    /// Ping to check if daemon is alive
    Ping,

    /// Request daemon to stop gracefully
    Shutdown,
}

/// Category of a failed request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; nothing was created
    Validation,
    /// Unknown job ID
    NotFound,
    /// Daemon-side failure
    Internal,
}

/// Responses from Daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum DaemonResponse {
    /// Acknowledgment
    Ok,

    /// Job accepted
    Ingested { job_id: String },

    /// Job status
    Status {
        job_id: String,
        status: crate::domain::JobStatus,
        batches: Vec<BatchView>,
    },

    /// Counters
    Stats {
        store: StoreStats,
        scheduler: SchedulerStats,
    },

    /// Pong response to ping
    Pong { version: String },

    /// Error response
    Error { kind: ErrorKind, message: String },
}

impl From<JobStatusReport> for DaemonResponse {
    fn from(report: JobStatusReport) -> Self {
        DaemonResponse::Status {
            job_id: report.job_id,
            status: report.status,
            batches: report.batches,
        }
    }
}

impl From<ServiceError> for DaemonResponse {
    fn from(e: ServiceError) -> Self {
        let kind = match &e {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::State(_) => ErrorKind::Internal,
        };
        DaemonResponse::Error {
            kind,
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatchStatus, JobStatus};
    use crate::service::ValidationError;

    #[test]
    fn test_ingest_serialize() {
        let msg = DaemonMessage::Ingest {
            ids: vec![1, 2, 3],
            priority: Priority::High,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"Ingest","ids":[1,2,3],"priority":"HIGH"}"#);
    }

    #[test]
    fn test_ingest_priority_defaults_to_medium() {
        let json = r#"{"type":"Ingest","ids":[4,5]}"#;
        let msg: DaemonMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            DaemonMessage::Ingest {
                ids: vec![4, 5],
                priority: Priority::Medium,
            }
        );
    }

    #[test]
    fn test_ingest_priority_is_case_insensitive() {
        let json = r#"{"type":"Ingest","ids":[1],"priority":"High"}"#;
        let msg: DaemonMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            DaemonMessage::Ingest {
                ids: vec![1],
                priority: Priority::High,
            }
        );
    }

    #[test]
    fn test_status_deserialize() {
        let json = r#"{"type":"Status","job_id":"abc"}"#;
        let msg: DaemonMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            DaemonMessage::Status {
                job_id: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_ping_serialize() {
        let json = serde_json::to_string(&DaemonMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"Ping"}"#);
    }

    #[test]
    fn test_status_response_serialize() {
        let resp = DaemonResponse::Status {
            job_id: "j".to_string(),
            status: JobStatus::InProgress,
            batches: vec![BatchView {
                batch_id: "b".to_string(),
                items: vec![9],
                status: BatchStatus::InProgress,
            }],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"type":"Status","job_id":"j","status":"in_progress","batches":[{"batch_id":"b","items":[9],"status":"in_progress"}]}"#
        );
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = DaemonResponse::Error {
            kind: ErrorKind::NotFound,
            message: "Job not found: x".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"type":"Error","kind":"not_found","message":"Job not found: x"}"#);
    }

    #[test]
    fn test_service_error_kinds() {
        let validation: DaemonResponse = ServiceError::Validation(ValidationError::EmptyIds).into();
        assert!(matches!(
            validation,
            DaemonResponse::Error {
                kind: ErrorKind::Validation,
                ..
            }
        ));

        let not_found: DaemonResponse = ServiceError::NotFound("Job x".to_string()).into();
        assert!(matches!(
            not_found,
            DaemonResponse::Error {
                kind: ErrorKind::NotFound,
                ..
            }
        ));
    }
}
