//! Daemon runtime
//!
//! Wires the state actor, the scheduler task and the IPC listener together,
//! serves requests until asked to stop, then shuts everything down in order.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::ipc::{self, DaemonMessage, DaemonResponse, ErrorKind};
use crate::processor::{Processor, create_processor};
use crate::scheduler::{Scheduler, StatsHandle};
use crate::service::{IngestionService, StatusService};
use crate::state::StateManager;

/// How long a connection may take to deliver its request line
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a connection handler needs
#[derive(Clone)]
struct RequestContext {
    request_timeout: Duration,
    ingest: IngestionService,
    status: StatusService,
    state: StateManager,
    scheduler_stats: StatsHandle,
    stop_tx: mpsc::Sender<()>,
}

/// A configured daemon, ready to run
pub struct Daemon {
    config: Config,
    socket_path: PathBuf,
    processor: Option<Arc<dyn Processor>>,
    request_timeout: Duration,
}

impl Daemon {
    pub fn new(config: Config, socket_path: PathBuf) -> Self {
        Self {
            config,
            socket_path,
            processor: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Use this processor instead of the one built from config
    pub fn with_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Answer connections that send no request within `timeout` with an error
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Serve until `shutdown_signal` resolves or a client sends `Shutdown`
    pub async fn run<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        debug!(socket_path = ?self.socket_path, "Daemon::run: called");
        self.config.validate().context("Invalid configuration")?;

        let state = StateManager::spawn();
        info!("StateManager initialized");

        let processor = self
            .processor
            .unwrap_or_else(|| create_processor(&self.config.processor));

        let scheduler = Scheduler::new(self.config.scheduler.clone(), state.clone(), processor);
        let scheduler_stats = scheduler.stats_handle();
        let (scheduler_tx, scheduler_rx) = mpsc::channel::<()>(1);
        let mut scheduler_handle = tokio::spawn(scheduler.run(scheduler_rx));
        info!("Scheduler task started");

        let (listener, socket_path) = match ipc::create_listener_at(&self.socket_path) {
            Ok(bound) => bound,
            Err(e) => {
                scheduler_handle.abort();
                let _ = state.shutdown().await;
                return Err(e);
            }
        };
        info!(?socket_path, "IPC socket listening");

        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let ctx = RequestContext {
            request_timeout: self.request_timeout,
            ingest: IngestionService::new(state.clone(), self.config.scheduler.batch_size),
            status: StatusService::new(state.clone()),
            state: state.clone(),
            scheduler_stats,
            stop_tx,
        };

        tokio::pin!(shutdown_signal);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let ctx = ctx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, ctx).await {
                                    warn!(error = %e, "IPC connection failed");
                                }
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to accept IPC connection");
                        }
                    }
                }
                _ = stop_rx.recv() => {
                    info!("Shutdown requested over IPC");
                    break;
                }
                _ = &mut shutdown_signal => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("Daemon shutting down...");
        drop(listener);

        let _ = scheduler_tx.send(()).await;
        let shutdown_timeout = self.config.shutdown_timeout();
        match tokio::time::timeout(shutdown_timeout, &mut scheduler_handle).await {
            Ok(Ok(())) => debug!("Daemon::run: scheduler stopped"),
            Ok(Err(e)) => error!(error = %e, "Scheduler task panicked"),
            Err(_) => {
                warn!(
                    ?shutdown_timeout,
                    "Scheduler did not stop in time, aborting; the running batch stays in_progress"
                );
                scheduler_handle.abort();
            }
        }

        if let Err(e) = state.shutdown().await {
            warn!(error = %e, "StateManager shutdown failed");
        }

        ipc::cleanup_socket(&socket_path);
        info!("Daemon stopped");
        Ok(())
    }
}

/// Resolve the socket path: CLI flag, then config, then the default
pub fn resolve_socket_path(cli_socket: Option<PathBuf>, config: &Config) -> PathBuf {
    cli_socket
        .or_else(|| config.socket_path.clone())
        .unwrap_or_else(ipc::get_socket_path)
}

/// Serve one request on a connection
async fn handle_connection(mut stream: UnixStream, ctx: RequestContext) -> Result<()> {
    let read = tokio::time::timeout(ctx.request_timeout, ipc::read_message(&mut stream)).await;
    let response = match read {
        Ok(Ok(msg)) => handle_message(msg, &ctx).await,
        Err(_) => {
            debug!(timeout = ?ctx.request_timeout, "handle_connection: no request before timeout");
            DaemonResponse::Error {
                kind: ErrorKind::Validation,
                message: "Timed out waiting for request".to_string(),
            }
        }
        Ok(Err(e)) => {
            debug!(error = %e, "handle_connection: unreadable request");
            DaemonResponse::Error {
                kind: ErrorKind::Validation,
                message: format!("{:#}", e),
            }
        }
    };
    ipc::send_response(&mut stream, &response).await
}

async fn handle_message(msg: DaemonMessage, ctx: &RequestContext) -> DaemonResponse {
    debug!(?msg, "handle_message: called");
    match msg {
        DaemonMessage::Ingest { ids, priority } => match ctx.ingest.ingest(ids, priority).await {
            Ok(job_id) => DaemonResponse::Ingested { job_id },
            Err(e) => e.into(),
        },
        DaemonMessage::Status { job_id } => match ctx.status.status(&job_id).await {
            Ok(report) => report.into(),
            Err(e) => e.into(),
        },
        DaemonMessage::Stats => match ctx.state.stats().await {
            Ok(store) => DaemonResponse::Stats {
                store,
                scheduler: ctx.scheduler_stats.snapshot().await,
            },
            Err(e) => DaemonResponse::Error {
                kind: ErrorKind::Internal,
                message: e.to_string(),
            },
        },
        DaemonMessage::Ping => DaemonResponse::Pong {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        DaemonMessage::Shutdown => {
            let _ = ctx.stop_tx.try_send(());
            DaemonResponse::Ok
        }
    }
}
