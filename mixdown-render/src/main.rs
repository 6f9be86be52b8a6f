//! Mixdown render service - main entry point
//!
//! HTTP service accepting mixing sessions for preview rendering. Requests
//! are validated, resolved into a mix plan and tracked as asynchronous
//! jobs; callers poll job status (or subscribe to SSE events) and download
//! the rendered artifact when the job completes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mixdown_common::config::ServiceConfig;
use mixdown_render::api;
use mixdown_render::ledger::JobLedger;
use mixdown_render::orchestrator::RenderOrchestrator;
use mixdown_render::render::offline::OfflineRenderer;

/// Command-line arguments for mixdown-render
#[derive(Parser, Debug)]
#[command(name = "mixdown-render")]
#[command(about = "Preview render service for Mixdown sessions")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = "MIXDOWN_PORT")]
    port: Option<u16>,

    /// Directory for rendered preview artifacts (overrides config file)
    #[arg(short, long, env = "MIXDOWN_ARTIFACT_DIR")]
    artifact_dir: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, env = "MIXDOWN_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mixdown_render=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments and resolve configuration
    let args = Args::parse();
    let mut config = ServiceConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = args.artifact_dir {
        config.artifact_dir = dir;
    }

    info!("Starting Mixdown render service on port {}", config.port);
    info!("Artifact directory: {}", config.artifact_dir.display());

    tokio::fs::create_dir_all(&config.artifact_dir)
        .await
        .context("Failed to create artifact directory")?;

    // Job ledger with background TTL sweep
    let ledger = Arc::new(JobLedger::new(config.event_capacity));
    ledger.spawn_sweeper(
        Duration::from_secs(config.sweep_interval_secs),
        Duration::from_secs(config.job_retention_secs),
    );

    // Orchestrator wired to the bundled offline engine
    let renderer = Arc::new(OfflineRenderer::new(config.artifact_dir.clone()));
    let orchestrator = Arc::new(RenderOrchestrator::new(
        Arc::clone(&ledger),
        renderer,
        config.max_concurrent_renders,
        Duration::from_secs(config.stage_timeout_secs),
    ));
    info!(
        "Render orchestrator initialized ({} worker slot(s), {}s stage timeout)",
        config.max_concurrent_renders, config.stage_timeout_secs
    );

    // Build the application router
    let app_state = api::AppState {
        orchestrator,
        ledger,
        port: config.port,
    };
    let app = api::create_router(app_state);

    // Create socket address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Starting HTTP server on {}", addr);

    // Create and run the server
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
