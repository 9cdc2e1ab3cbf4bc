//! Dashboard relay server.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │               DASHBOARD RELAY                │
//!   Dashboard client      │  ┌──────────┐   ┌────────────────────────┐   │
//!   ──── GET /events ─────┼─▶│  http    │──▶│ relay session (1/conn) │   │
//!   ◀─── SSE messages ────┼──│  server  │◀──│ decoder ◀── upstream   │◀──┼── controller /sse
//!                         │  │          │   └────────────────────────┘   │
//!   ──── GET /api/* ──────┼─▶│ loaders  │──────────────────────────────▶─┼── controller REST
//!                         │  └──────────┘                                │
//!                         │  config · observability · lifecycle          │
//!                         └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use dashboard_relay::config::loader;
use dashboard_relay::config::watcher::ConfigWatcher;
use dashboard_relay::http::HttpServer;
use dashboard_relay::lifecycle::{signals, Shutdown};
use dashboard_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "dashboard-relay")]
#[command(about = "Relays backend deployment events to dashboard clients", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults plus RELAY_* environment when omitted.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Watch the config file and apply session settings to new sessions.
    /// Listener, client timeouts and observability still need a restart.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = loader::load(args.config.as_deref())?;
    logging::init(&config.observability.log_level);

    tracing::info!("dashboard-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        sse_url = ?config.upstream.sse_url,
        api_url = ?config.upstream.api_url,
        auth_enabled = config.auth.dashboard_secret.is_some(),
        "Configuration loaded"
    );
    if config.upstream.sse_url.is_none() {
        tracing::warn!("No upstream SSE URL configured; /events will close immediately");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher handle alive for the life of the server.
    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            (Some(watcher.run()?), updates)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, shutdown.token())?;
    let server_shutdown = shutdown.subscribe();

    let server_task = tokio::spawn(server.run(listener, config_updates, server_shutdown));
    signals::shutdown_on_signal(&shutdown).await;
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
