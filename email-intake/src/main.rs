//! Email intake web server.
//!
//! Serves `POST /email_intake` and writes every accepted payload, plus its
//! summary, to the configured blob container.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use email_intake::{router, AppState, AzureBlobStore, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("email_intake_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        storage_configured = config.storage_configured(),
        blob_container = %config.blob_container,
        function_key_configured = config.function_key.is_some(),
        storage_timeout_ms = config.storage_timeout_ms,
        max_body_bytes = config.max_body_bytes,
        "config_loaded"
    );

    // Intake requests answer 500 until a connection string is provided
    let store = match config.blob_connection_string.as_deref() {
        Some(connection_string) => {
            let store = AzureBlobStore::from_connection_string(
                connection_string,
                config.blob_container.clone(),
                Duration::from_millis(config.storage_timeout_ms),
            )
            .context("Invalid BLOB_CONNECTION_STRING")?;
            info!(container = %store.container(), "blob_store_created");
            Some(store)
        }
        None => {
            warn!("blob_connection_string_not_set");
            None
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, store));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "email_intake_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("email_intake_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "ctrl_c_handler_install_failed");
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
                warn!(error = %e, "sigterm_handler_install_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("email_intake_server_shutting_down");
}
