//! Drowsiness Monitor Console
//!
//! Start/stop toggle for a monitoring session driven from a line-oriented
//! console, plus logging and metrics setup for the binary.

use anyhow::{Context, Result};
use drowsiness_monitor::{SessionController, SessionError};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::Future;
use std::net::SocketAddr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Console commands, one per input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start when idle, stop when running
    Toggle,
    Start,
    Stop,
    Status,
    Quit,
    Unknown,
}

impl Command {
    /// Parse a console line. An empty line toggles.
    pub fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "t" | "toggle" => Command::Toggle,
            "start" => Command::Start,
            "stop" => Command::Stop,
            "s" | "status" => Command::Status,
            "q" | "quit" | "exit" => Command::Quit,
            _ => Command::Unknown,
        }
    }
}

/// Initialize logging. `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .context("Failed to set tracing subscriber")
}

/// Serve Prometheus metrics on `addr`
pub fn install_metrics(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("Failed to start metrics exporter on {}", addr))?;
    info!("Metrics available on http://{}/metrics", addr);
    Ok(())
}

/// Apply one command. Returns false when the console should exit.
pub async fn apply(controller: &SessionController, command: Command) -> bool {
    match command {
        Command::Toggle => {
            if controller.state().is_running() {
                controller.stop().await;
            } else {
                start(controller).await;
            }
        }
        Command::Start => start(controller).await,
        Command::Stop => controller.stop().await,
        Command::Status => {
            info!(session_id = ?controller.session_id(), "Session {}", controller.state())
        }
        Command::Quit => return false,
        Command::Unknown => {
            warn!("Unknown command. Enter toggles monitoring, 'status' reports, 'q' quits")
        }
    }
    true
}

async fn start(controller: &SessionController) {
    match controller.start().await {
        Ok(session_id) => debug!(%session_id, "Session running"),
        // Camera failures are already on the status sink
        Err(SessionError::Permission(_)) => {}
        Err(e) => warn!("{}", e),
    }
}

/// Read commands until quit, end of input or `shutdown` resolves. The
/// session is always stopped before returning.
pub async fn run_console<R, S>(controller: &SessionController, input: R, shutdown: S) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read console input")? else {
                    debug!("Console input closed");
                    break;
                };
                if !apply(controller, Command::parse(&line)).await {
                    break;
                }
            }
        }
    }

    controller.stop().await;
    Ok(())
}
