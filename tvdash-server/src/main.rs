//! tvdash-server - Local dashboard server
//!
//! Serves the bundled front-end apps, a landing page and a health endpoint on
//! the first free port starting at 9978.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tvdash_common::logging::init_tracing;
use tvdash_server::config::{Args, ConfigSource, ServerConfig};
use tvdash_server::listener::bind_with_fallback;
use tvdash_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it carries the logging settings
    let (config, config_source) = ServerConfig::load(&args).context("Failed to load configuration")?;

    init_tracing(&config.logging, args.debug, &["tower_http=debug"])
        .context("Failed to initialize logging")?;

    // Log build identification immediately after tracing init
    info!(
        "Starting tvdash-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_source {
        ConfigSource::File(path) => info!("Config file: {}", path.display()),
        ConfigSource::Missing(path) => warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        ),
        ConfigSource::Defaults => info!("No config file, using built-in defaults"),
    }
    info!("Apps directory: {}", config.apps_dir.display());
    if !config.apps_dir.is_dir() {
        error!(
            "Apps directory {} does not exist; only the landing page and health check will work",
            config.apps_dir.display()
        );
    }

    let state = AppState::from_config(&config).context("Failed to initialize server state")?;
    if state.proxy.is_some() {
        info!("Proxy enabled at /proxy/ (allowed hosts: {:?})", config.proxy.allowed_hosts);
    }
    let app = build_router(state);

    let listener = bind_with_fallback(&config.host, config.port, config.port_attempts)
        .await
        .context("Failed to bind listening socket")?;
    let addr = listener.local_addr().context("Failed to read bound address")?;
    info!("tvdash-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

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
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
