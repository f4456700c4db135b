//! note-gate
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                  NOTE GATE                   │
//!   Client Request      │  ┌────────┐   ┌────────┐   ┌──────────────┐  │
//!   ────────────────────┼─▶│  http  │──▶│  gate  │──▶│    proxy     │──┼──▶ Upstream app
//!                       │  │ server │   │        │   │  (pass-thru) │  │
//!                       │  └────────┘   └───┬────┘   └──────────────┘  │
//!   Redirects  ◀────────┼───────────────────┤                          │
//!                       │             ┌─────┴──────┐                   │
//!                       │             ▼            ▼                   │
//!                       │        ┌────────┐   ┌────────┐               │
//!                       │        │  auth  │   │ notes  │               │
//!                       │        └───┬────┘   └───┬────┘               │
//!                       └────────────┼────────────┼────────────────────┘
//!                                    ▼            ▼
//!                              Auth service   Upstream /api/*
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use note_gate::config::loader::{apply_env_overrides, load_config};
use note_gate::config::validation::validate_config;
use note_gate::config::watcher::ConfigWatcher;
use note_gate::config::{ConfigError, GateConfig};
use note_gate::observability::{logging, metrics};
use note_gate::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "note-gate")]
#[command(about = "Sign-in gate and reverse proxy for the notes app", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the configuration when the file changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = GateConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        auth_url = %config.auth.url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        _ => {
            let (_, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config)?;

    tokio::spawn(async move {
        shutdown.trigger_on_signal().await;
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
