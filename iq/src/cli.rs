//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::{ItemId, Priority};

/// ingestq - priority batch ingestion daemon
#[derive(Parser)]
#[command(
    name = "iq",
    about = "Priority-scheduled batch ingestion with a rate-limited worker",
    version = env!("CARGO_PKG_VERSION"),
    after_help = after_help()
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Daemon socket path
    #[arg(short, long, global = true, help = "Daemon socket path")]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground
    Daemon,

    /// Submit item IDs as a new job
    Ingest {
        /// Item IDs, in processing order
        #[arg(required = true, allow_negative_numbers = true)]
        ids: Vec<ItemId>,

        /// Priority class (high, medium, low)
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
    },

    /// Show a job's status and batches
    Status {
        /// Job ID returned by `ingest`
        job_id: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show queue and scheduler counters
    Stats {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Ping the daemon to check if it's alive and responsive
    Ping,

    /// Ask the daemon to shut down
    Stop,
}

/// Where the daemon writes its log
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ingestq")
        .join("logs")
        .join("ingestq.log")
}

fn after_help() -> String {
    format!("Logs are written to: {}", get_log_path().display())
}

/// Output format for status/stats commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_daemon() {
        let cli = Cli::parse_from(["iq", "daemon"]);
        assert!(matches!(cli.command, Command::Daemon));
    }

    #[test]
    fn test_cli_parse_ingest_defaults_to_medium() {
        let cli = Cli::parse_from(["iq", "ingest", "1", "2", "3"]);
        match cli.command {
            Command::Ingest { ids, priority } => {
                assert_eq!(ids, vec![1, 2, 3]);
                assert_eq!(priority, Priority::Medium);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_ingest_with_priority() {
        let cli = Cli::parse_from(["iq", "ingest", "-p", "HIGH", "7"]);
        assert!(matches!(
            cli.command,
            Command::Ingest {
                priority: Priority::High,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_parse_ingest_accepts_negative_ids() {
        let cli = Cli::parse_from(["iq", "ingest", "1", "-5"]);
        assert!(matches!(cli.command, Command::Ingest { ref ids, .. } if ids == &vec![1, -5]));
    }

    #[test]
    fn test_cli_parse_ingest_requires_ids() {
        assert!(Cli::try_parse_from(["iq", "ingest"]).is_err());
    }

    #[test]
    fn test_cli_parse_status_json() {
        let cli = Cli::parse_from(["iq", "status", "abc", "--format", "json"]);
        match cli.command {
            Command::Status { job_id, format } => {
                assert_eq!(job_id, "abc");
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from(["iq", "ping", "--socket", "/tmp/x.sock", "-l", "debug"]);
        assert_eq!(cli.socket, Some(PathBuf::from("/tmp/x.sock")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("table".parse::<OutputFormat>().is_err());
    }
}
