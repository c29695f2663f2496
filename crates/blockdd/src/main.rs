//! blockdd - The blockd background service
//!
//! This is the main entry point for the blockdd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Core engine
//! - Browser bridge host
//! - IPC server

use anyhow::{Context, Result};
use blockd_config::load_config_or_default;
use blockd_util::default_config_path;
use blockdd::{Service, ServiceOptions};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// blockdd - Website blocking, focus mode and usage tracking service
#[derive(Parser, Debug)]
#[command(name = "blockdd")]
#[command(about = "Website blocking, focus mode and usage tracking service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/blockd/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set BLOCKD_SOCKET env var)
    #[arg(short, long, env = "BLOCKD_SOCKET")]
    socket: Option<PathBuf>,

    /// Data directory override (or set BLOCKD_DATA_DIR env var)
    #[arg(short, long, env = "BLOCKD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "blockdd starting"
    );

    let policy = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    info!(
        config_path = %args.config.display(),
        blocked = policy.blocking.blocked_domains.len(),
        focus_domains = policy.blocking.focus_domains.len(),
        "Configuration loaded"
    );

    let mut options = ServiceOptions::from_policy(policy);
    if let Some(socket) = args.socket {
        options.socket_path = socket;
    }
    if let Some(data_dir) = args.data_dir {
        options.data_dir = data_dir;
    }

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
    let mut sighup =
        signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down gracefully"),
            _ = sighup.recv() => info!("Received SIGHUP, shutting down gracefully"),
        }
    };

    let service = Service::new(options).await?;
    info!(socket_path = %service.socket_path().display(), "IPC server started");
    service.run(shutdown).await
}
