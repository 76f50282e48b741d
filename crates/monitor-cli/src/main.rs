//! Drowsiness Monitor - Main Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use drowsiness_monitor::{MonitorConfig, SessionController, StatusEvent, StatusSink, TracingStatusSink};
use monitor_cli::{init_logging, install_metrics, run_console};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Watches a camera feed and sounds an alert when the driver gets drowsy
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "SLEEP_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// Start monitoring immediately instead of waiting for Enter
    #[arg(long)]
    autostart: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs)?;

    info!("=== Sleep Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = cli.metrics_addr {
        install_metrics(addr)?;
    }

    let config = MonitorConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    info!("Analysis endpoint: {}", config.analysis.endpoint);

    let sink = Arc::new(TracingStatusSink);
    let controller = SessionController::from_config(&config, sink.clone())
        .context("Failed to build session controller")?;

    sink.publish(&StatusEvent::Ready);
    info!("Press Enter to start or stop monitoring, 'q' to quit");

    if cli.autostart {
        monitor_cli::apply(&controller, monitor_cli::Command::Start).await;
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run_console(&controller, stdin, shutdown).await?;

    info!("Sleep monitor exiting");
    Ok(())
}
