//! IPC client for communicating with the daemon
//!
//! Used by the `iq` subcommands to talk to a running daemon.

use std::path::PathBuf;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use crate::domain::{ItemId, Priority};
use crate::scheduler::SchedulerStats;
use crate::service::JobStatusReport;
use crate::state::StoreStats;

use super::messages::{DaemonMessage, DaemonResponse};
use super::MAX_MESSAGE_SIZE;

/// Default timeout for IPC operations
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for communicating with the daemon via IPC
#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
    timeout: Duration,
}

fn unexpected(response: DaemonResponse) -> eyre::Report {
    match response {
        DaemonResponse::Error { kind, message } => {
            let kind = serde_json::to_string(&kind).unwrap_or_default();
            eyre::eyre!("Daemon error ({}): {}", kind.trim_matches('"'), message)
        }
        other => eyre::eyre!("Unexpected response: {:?}", other),
    }
}

impl DaemonClient {
    /// Create a client for the daemon listening at `socket_path`
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Check if the daemon socket exists
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Submit IDs as a new job, returning its ID
    pub async fn ingest(&self, ids: Vec<ItemId>, priority: Priority) -> Result<String> {
        debug!(count = ids.len(), %priority, "DaemonClient: ingesting");
        match self.send_message(DaemonMessage::Ingest { ids, priority }).await? {
            DaemonResponse::Ingested { job_id } => Ok(job_id),
            other => Err(unexpected(other)),
        }
    }

    /// Fetch a job's status
    pub async fn status(&self, job_id: &str) -> Result<JobStatusReport> {
        debug!(%job_id, "DaemonClient: querying status");
        let msg = DaemonMessage::Status {
            job_id: job_id.to_string(),
        };
        match self.send_message(msg).await? {
            DaemonResponse::Status {
                job_id,
                status,
                batches,
            } => Ok(JobStatusReport {
                job_id,
                status,
                batches,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Fetch store and scheduler counters
    pub async fn stats(&self) -> Result<(StoreStats, SchedulerStats)> {
        debug!("DaemonClient: querying stats");
        match self.send_message(DaemonMessage::Stats).await? {
            DaemonResponse::Stats { store, scheduler } => Ok((store, scheduler)),
            other => Err(unexpected(other)),
        }
    }

    /// Check if daemon is alive and get its version
    pub async fn ping(&self) -> Result<String> {
        debug!("DaemonClient: pinging daemon");
        match self.send_message(DaemonMessage::Ping).await? {
            DaemonResponse::Pong { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    /// Request daemon to shutdown gracefully
    pub async fn shutdown(&self) -> Result<()> {
        debug!("DaemonClient: requesting daemon shutdown");
        match self.send_message(DaemonMessage::Shutdown).await? {
            DaemonResponse::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Send a message to the daemon and wait for the raw response
    pub async fn send_message(&self, msg: DaemonMessage) -> Result<DaemonResponse> {
        debug!(?self.socket_path, ?msg, "DaemonClient: sending message");

        let stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to daemon socket")?;

        self.send_on_stream(stream, msg).await
    }

    async fn send_on_stream(&self, mut stream: UnixStream, msg: DaemonMessage) -> Result<DaemonResponse> {
        let msg_json = serde_json::to_string(&msg).context("Failed to serialize message")?;

        if msg_json.len() > MAX_MESSAGE_SIZE {
            return Err(eyre::eyre!("Message too large: {} bytes", msg_json.len()));
        }

        tokio::time::timeout(self.timeout, async {
            stream
                .write_all(msg_json.as_bytes())
                .await
                .context("Failed to write message")?;
            stream.write_all(b"\n").await.context("Failed to write newline")?;
            stream.flush().await.context("Failed to flush stream")?;
            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Write timeout")??;

        let mut reader = BufReader::new(&mut stream).take(MAX_MESSAGE_SIZE as u64 + 1);
        let mut response_line = String::new();

        tokio::time::timeout(self.timeout, async {
            let bytes_read = reader
                .read_line(&mut response_line)
                .await
                .context("Failed to read response")?;

            if bytes_read > MAX_MESSAGE_SIZE {
                return Err(eyre::eyre!("Response too large: more than {} bytes", MAX_MESSAGE_SIZE));
            }

            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Read timeout")??;

        let response: DaemonResponse =
            serde_json::from_str(response_line.trim()).context("Failed to parse daemon response")?;

        debug!(?response, "DaemonClient: received response");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::listener::{create_listener_at, read_message, send_response};
    use crate::ipc::messages::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_client_uses_default_timeout() {
        let client = DaemonClient::with_socket_path(PathBuf::from("/custom/path/daemon.sock"));
        assert_eq!(client.socket_path, PathBuf::from("/custom/path/daemon.sock"));
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_socket_exists_false() {
        let temp = TempDir::new().unwrap();
        let client = DaemonClient::with_socket_path(temp.path().join("nonexistent.sock"));
        assert!(!client.socket_exists());
    }

    #[tokio::test]
    async fn test_connect_fails_without_daemon() {
        let temp = TempDir::new().unwrap();
        let client = DaemonClient::with_socket_path(temp.path().join("missing.sock"));
        assert!(client.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_ping_pong_against_mock_listener() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("daemon.sock");
        let (listener, _) = create_listener_at(&socket_path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let msg = read_message(&mut stream).await.unwrap();
            assert_eq!(msg, DaemonMessage::Ping);
            let pong = DaemonResponse::Pong {
                version: "0.1.0".to_string(),
            };
            send_response(&mut stream, &pong).await.unwrap();
        });

        let client = DaemonClient::with_socket_path(socket_path);
        assert_eq!(client.ping().await.unwrap(), "0.1.0");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_response_becomes_err() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("daemon.sock");
        let (listener, _) = create_listener_at(&socket_path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_message(&mut stream).await.unwrap();
            let err = DaemonResponse::Error {
                kind: ErrorKind::NotFound,
                message: "Job not found: nope".to_string(),
            };
            send_response(&mut stream, &err).await.unwrap();
        });

        let client = DaemonClient::with_socket_path(socket_path);
        let err = client.status("nope").await.unwrap_err();
        assert!(err.to_string().contains("not_found"));
        server.await.unwrap();
    }
}
