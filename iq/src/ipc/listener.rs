//! IPC listener for the daemon side
//!
//! Socket lifecycle plus the read/write halves of the one-line protocol.

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, warn};

use super::messages::{DaemonMessage, DaemonResponse};
use super::MAX_MESSAGE_SIZE;

/// Create a listener at a specific path
///
/// Creates the parent directory and removes a stale socket left by a previous run.
pub fn create_listener_at(socket_path: &Path) -> Result<(UnixListener, PathBuf)> {
    debug!(?socket_path, "create_listener_at: creating IPC socket");

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
    }

    if socket_path.exists() {
        debug!(?socket_path, "create_listener_at: removing stale socket");
        std::fs::remove_file(socket_path).context("Failed to remove stale socket")?;
    }

    let listener = UnixListener::bind(socket_path).context("Failed to bind IPC socket")?;
    debug!(?socket_path, "create_listener_at: socket bound");

    Ok((listener, socket_path.to_path_buf()))
}

/// Remove the socket file on shutdown
pub fn cleanup_socket(socket_path: &Path) {
    if socket_path.exists() {
        debug!(?socket_path, "cleanup_socket: removing socket file");
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!(?socket_path, error = %e, "Failed to remove socket file");
        }
    }
}

/// Read one request line from the stream
pub async fn read_message(stream: &mut UnixStream) -> Result<DaemonMessage> {
    let mut reader = BufReader::new(stream).take(MAX_MESSAGE_SIZE as u64 + 1);
    let mut line = String::new();

    let bytes_read = reader
        .read_line(&mut line)
        .await
        .context("Failed to read IPC message")?;

    if bytes_read > MAX_MESSAGE_SIZE {
        return Err(eyre::eyre!("Message too large: more than {} bytes", MAX_MESSAGE_SIZE));
    }

    if line.is_empty() {
        return Err(eyre::eyre!("Empty message received"));
    }

    let msg: DaemonMessage = serde_json::from_str(line.trim()).context("Failed to parse IPC message")?;
    debug!(?msg, "read_message: parsed message");

    Ok(msg)
}

/// Send a response on the stream
pub async fn send_response(stream: &mut UnixStream, response: &DaemonResponse) -> Result<()> {
    let response_json = serde_json::to_string(response).context("Failed to serialize response")?;
    stream
        .write_all(response_json.as_bytes())
        .await
        .context("Failed to write response")?;
    stream.write_all(b"\n").await.context("Failed to write newline")?;
    stream.flush().await.context("Failed to flush response")?;
    debug!(?response, "send_response: sent response");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_listener_creates_parent_dir() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("subdir").join("daemon.sock");

        let (_, path) = create_listener_at(&socket_path).unwrap();
        assert_eq!(path, socket_path);
        assert!(socket_path.exists());
    }

    #[tokio::test]
    async fn test_create_listener_removes_stale_socket() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("daemon.sock");
        std::fs::write(&socket_path, "stale").unwrap();

        assert!(create_listener_at(&socket_path).is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_socket() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("daemon.sock");
        let (_listener, path) = create_listener_at(&socket_path).unwrap();

        cleanup_socket(&path);
        assert!(!socket_path.exists());
    }

    #[tokio::test]
    async fn test_read_message_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("daemon.sock");
        let (listener, _) = create_listener_at(&socket_path).unwrap();

        let client = tokio::spawn({
            let socket_path = socket_path.clone();
            async move {
                let mut stream = UnixStream::connect(&socket_path).await.unwrap();
                stream.write_all(b"not json\n").await.unwrap();
                stream.flush().await.unwrap();
            }
        });

        let (mut stream, _) = listener.accept().await.unwrap();
        assert!(read_message(&mut stream).await.is_err());
        client.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_message_and_respond() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("daemon.sock");
        let (listener, _) = create_listener_at(&socket_path).unwrap();

        let client = tokio::spawn({
            let socket_path = socket_path.clone();
            async move {
                let mut stream = UnixStream::connect(&socket_path).await.unwrap();
                stream.write_all(b"{\"type\":\"Ping\"}\n").await.unwrap();
                stream.flush().await.unwrap();

                let mut reader = BufReader::new(stream);
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                serde_json::from_str::<DaemonResponse>(line.trim()).unwrap()
            }
        });

        let (mut stream, _) = listener.accept().await.unwrap();
        let msg = read_message(&mut stream).await.unwrap();
        assert_eq!(msg, DaemonMessage::Ping);
        send_response(&mut stream, &DaemonResponse::Ok).await.unwrap();

        assert_eq!(client.await.unwrap(), DaemonResponse::Ok);
    }
}
