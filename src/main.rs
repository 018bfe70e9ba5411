// streamwatch - Operator console for live stream monitoring
//
// Admins and agents watch live streams for policy violations. The console
// authenticates against the monitoring API, resolves a role and drives the
// role's views, each backed by polling loops or request/refresh flows.
//
// Architecture:
// - API client (reqwest): cookie-session JSON/multipart calls
// - Components: session, CRUD managers, assignment, dashboard, logs,
//   detection harnesses, scraper; each holds snapshots it replaces wholesale
// - Pollers (tokio): cancellable repeating tasks owned by the active view
// - TUI (ratatui): renders snapshots; session changes arrive over mpsc
// - Demo backend (axum): in-memory API for trying the console out

mod api;
mod assignment;
mod cli;
mod config;
mod console;
mod dashboard;
mod demo;
mod detection;
mod events;
mod headless;
mod log_viewer;
mod logging;
mod poller;
mod resources;
mod scraper;
mod session;
mod tui;
mod util;

use anyhow::{Context, Result};
use api::ApiClient;
use config::Config;
use logging::LogBuffer;

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --path, --reset)
    // If a command was handled, exit early
    let Some(cli) = cli::handle_cli()? else {
        return Ok(());
    };

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    // Load configuration first to determine TUI vs headless mode
    let mut config = Config::from_env();
    cli.apply(&mut config);

    // Create log buffer for TUI mode
    let log_buffer = LogBuffer::new();

    // Keep the file writer guard alive for the whole program
    let _file_guard = logging::init(&config.logging, config.enable_tui, &log_buffer);

    tracing::info!(version = config::VERSION, "streamwatch starting");

    // Demo mode: serve the in-memory API and point the console at it
    let demo = if config.demo_mode {
        let backend = demo::DemoBackend::start(config.demo_bind)
            .await
            .context("Failed to start demo backend")?;
        config.api_url = backend.url();
        tracing::info!(url = %config.api_url, "Demo backend listening (admin/admin, agent/agent)");
        Some(backend)
    } else {
        None
    };

    let api = ApiClient::new(&config.api_url).context("Invalid API URL")?;
    tracing::info!(
        api = api.base_url(),
        dashboard_secs = config.polling.dashboard_secs,
        logs_secs = config.polling.logs_secs,
        "Console configured"
    );

    // Run the TUI in the main task
    // This blocks until the user quits (presses 'q')
    let outcome = if config.enable_tui {
        tracing::info!("Starting TUI");
        if let Err(e) = tui::run_tui(api, log_buffer, config).await {
            tracing::error!("TUI error: {:?}", e);
        }
        Ok(())
    } else {
        tracing::info!("TUI disabled, running in headless mode");
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
        };
        headless::run(&config, api, shutdown).await.inspect_err(|e| {
            tracing::error!("Headless console stopped: {:#}", e);
        })
    };

    tracing::info!("Shutting down...");

    if let Some(backend) = demo {
        backend.shutdown().await;
    }

    tracing::info!("Shutdown complete");
    outcome
}
