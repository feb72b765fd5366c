//! Inter-Process Communication between the CLI and the daemon
//!
//! Unix Domain Socket carrying one JSON request line and one JSON response
//! line per connection.

use std::path::PathBuf;

pub mod client;
pub mod listener;
pub mod messages;

pub use client::DaemonClient;
pub use listener::{cleanup_socket, create_listener_at, read_message, send_response};
pub use messages::{DaemonMessage, DaemonResponse, ErrorKind};

/// Maximum size of a single message line
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Get the default socket path for daemon IPC
pub fn get_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("ingestq")
        .join("daemon.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_path_ends_with_daemon_sock() {
        let path = get_socket_path();
        assert!(path.ends_with("ingestq/daemon.sock"));
    }
}
