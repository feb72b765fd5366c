//! iq - ingestq command-line entry point
//!
//! Runs the daemon or talks to a running one over IPC.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use ingestq::cli::{Cli, Command, OutputFormat, get_log_path};
use ingestq::config::Config;
use ingestq::daemon::{Daemon, resolve_socket_path};
use ingestq::domain::{BatchStatus, ItemId, JobStatus, Priority};
use ingestq::ipc::DaemonClient;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let socket_path = resolve_socket_path(cli.socket.clone(), &config);

    debug!(command = ?cli.command, ?socket_path, "main: dispatching command");
    match cli.command {
        Command::Daemon => cmd_daemon(config, socket_path).await,
        Command::Ingest { ids, priority } => cmd_ingest(socket_path, ids, priority).await,
        Command::Status { job_id, format } => cmd_status(socket_path, &job_id, format).await,
        Command::Stats { format } => cmd_stats(socket_path, format).await,
        Command::Ping => cmd_ping(socket_path).await,
        Command::Stop => cmd_stop(socket_path).await,
    }
}

/// Run the daemon in the foreground until SIGINT/SIGTERM or a Shutdown request
async fn cmd_daemon(config: Config, socket_path: PathBuf) -> Result<()> {
    debug!(?socket_path, "cmd_daemon: called");
    let client = DaemonClient::with_socket_path(socket_path.clone());
    if client.socket_exists() && client.ping().await.is_ok() {
        println!("ingestq daemon is already running at {}", socket_path.display());
        return Ok(());
    }

    println!("ingestq daemon listening on {}", socket_path.display());
    info!("Daemon starting...");
    Daemon::new(config, socket_path).run(shutdown_signal()).await
}

/// Resolves on the first SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigint, mut sigterm) = match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to install signal handlers, falling back to ctrl_c");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigint.recv() => warn!("SIGINT received"),
            _ = sigterm.recv() => warn!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn connect(socket_path: PathBuf) -> Result<DaemonClient> {
    let client = DaemonClient::with_socket_path(socket_path);
    if !client.socket_exists() {
        return Err(eyre::eyre!("ingestq daemon is not running (start it with `iq daemon`)"));
    }
    Ok(client)
}

async fn cmd_ingest(socket_path: PathBuf, ids: Vec<ItemId>, priority: Priority) -> Result<()> {
    debug!(count = ids.len(), %priority, "cmd_ingest: called");
    let client = connect(socket_path)?;
    let job_id = client.ingest(ids, priority).await?;
    println!("{}", job_id);
    Ok(())
}

fn paint_job(status: JobStatus) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        JobStatus::NotStarted => text.dimmed(),
        JobStatus::InProgress => text.yellow(),
        JobStatus::Completed => text.green(),
        JobStatus::Failed => text.red(),
    }
}

fn paint_batch(status: BatchStatus) -> colored::ColoredString {
    let text = status.to_string();
    match status {
        BatchStatus::NotStarted => text.dimmed(),
        BatchStatus::InProgress => text.yellow(),
        BatchStatus::Completed => text.green(),
        BatchStatus::Failed => text.red(),
    }
}

async fn cmd_status(socket_path: PathBuf, job_id: &str, format: OutputFormat) -> Result<()> {
    debug!(%job_id, ?format, "cmd_status: called");
    let client = connect(socket_path)?;
    let report = client.status(job_id).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Job {}: {}", report.job_id.bold(), paint_job(report.status));
            for batch in &report.batches {
                let items: Vec<String> = batch.items.iter().map(|i| i.to_string()).collect();
                println!("  {}  {}  [{}]", batch.batch_id, paint_batch(batch.status), items.join(", "));
            }
        }
    }
    Ok(())
}

async fn cmd_stats(socket_path: PathBuf, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_stats: called");
    let client = connect(socket_path)?;
    let (store, scheduler) = client.stats().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({ "store": store, "scheduler": scheduler });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("ingestq Stats");
            println!("-------------");
            println!("Jobs:        {}", store.jobs);
            println!("Batches:     {}", store.batches);
            println!("Queued:      {}", store.queued);
            println!("In progress: {}", store.in_progress);
            println!();
            println!("Scheduler:   {:?}", scheduler.state);
            if let Some(batch_id) = &scheduler.current_batch {
                println!("Current:     {}", batch_id);
            }
            println!("Dispatched:  {}", scheduler.total_dispatched);
            println!("Completed:   {}", scheduler.total_completed.to_string().green());
            println!("Failed:      {}", scheduler.total_failed.to_string().red());
        }
    }
    Ok(())
}

/// Ping the daemon via IPC to check if it's alive and responsive
async fn cmd_ping(socket_path: PathBuf) -> Result<()> {
    debug!("cmd_ping: called");
    let client = DaemonClient::with_socket_path(socket_path);
    if !client.socket_exists() {
        println!("ingestq daemon is not running");
        return Ok(());
    }

    match client.ping().await {
        Ok(version) => {
            println!("Daemon is alive and responsive");
            println!("Version: {}", version);
        }
        Err(e) => {
            debug!(error = %e, "cmd_ping: ping failed");
            println!("Socket exists but the daemon is not responding");
            println!("Error: {}", e);
        }
    }
    Ok(())
}

/// Stop the daemon via IPC and wait for the socket to disappear
async fn cmd_stop(socket_path: PathBuf) -> Result<()> {
    debug!("cmd_stop: called");
    let client = DaemonClient::with_socket_path(socket_path);
    if !client.socket_exists() {
        println!("ingestq daemon is not running");
        return Ok(());
    }

    client.shutdown().await?;

    let mut attempts = 0;
    while client.socket_exists() && attempts < 50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        attempts += 1;
    }

    if client.socket_exists() {
        println!("Shutdown requested; daemon is still finishing its current batch");
    } else {
        println!("ingestq daemon stopped");
    }
    Ok(())
}
