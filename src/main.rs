//! Dashboard gateway
//!
//! Runs the dashboard's listeners and, optionally, a single front door in
//! front of them.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                 FRONT DOOR                     │
//!     Client Request     │  ┌──────────┐    ┌──────────────┐             │
//!     ───────────────────┼─▶│ listener │───▶│ route table  │             │
//!                        │  └──────────┘    └──────┬───────┘             │
//!                        │          ┌──────────────┼──────────────┐      │
//!                        │          ▼              ▼              ▼      │
//!                        │   ┌────────────┐ ┌────────────┐ ┌───────────┐ │
//!                        │   │ api / ui / │ │ websocket  │ │   oauth   │ │
//!                        │   │  metrics   │ │   hook     │ │   hook    │ │
//!                        │   │   proxy    │ └────────────┘ └───────────┘ │
//!                        │   └─────┬──────┘                               │
//!                        └─────────┼──────────────────────────────────────┘
//!                                  ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │  Web UI  │   │ REST/API │   │ metrics  │   │   RPC    │
//!        └──────────┘   └──────────┘   └──────────┘   └──────────┘
//!                 each on its own address, its own task
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::{response::Html, Router};
use clap::Parser;

use dashboard_gateway::config::{load_config, ConfigWatcher, DashboardConfig};
use dashboard_gateway::lifecycle::shutdown_signal;
use dashboard_gateway::observability::logging;
use dashboard_gateway::{Hooks, Orchestrator};

#[derive(Parser)]
#[command(name = "dashboard-gateway")]
#[command(about = "Self-hosted dashboard listeners behind an optional single front door", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init(cli.log_level.as_deref().unwrap_or(&config.log_level));

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        "dashboard-gateway starting"
    );
    tracing::debug!(config = ?config, "Configuration loaded");

    if cli.check {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    let hooks = Hooks::new(status_page(&config), Router::new());
    let orchestrator = Arc::new(Orchestrator::new(config, hooks));

    // Keep the watcher alive for the life of the process.
    let (watcher, mut config_updates) = ConfigWatcher::new(&cli.config);
    let _watcher = match watcher.run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload unavailable");
            None
        }
    };

    let reloader = orchestrator.clone();
    tokio::spawn(async move {
        while let Some(config) = config_updates.recv().await {
            if let Err(e) = reloader.reload(config).await {
                tracing::error!(error = %e, "Failed to rebuild listeners");
                std::process::exit(1);
            }
        }
    });

    let stopper = orchestrator.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        stopper.stop().await;
    });

    if let Err(e) = orchestrator.run().await {
        tracing::error!(error = %e, "Failed to start dashboard");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Minimal Web UI used when no UI bundle is wired in.
fn status_page(config: &DashboardConfig) -> Router {
    let base = format!("{}/", config.subpath);
    let page = Html(format!(
        "<!DOCTYPE html><html><head><title>Dashboard</title></head>\
         <body><h1>Dashboard</h1><p>Serving under <code>{}</code>.</p></body></html>",
        base
    ));
    Router::new().fallback(move || {
        let page = page.clone();
        async move { page }
    })
}
