//! Scholarship Service
//!
//! Entry point: loads configuration, runs migrations, starts the session
//! cleanup task and serves the HTTP API until SIGINT/SIGTERM.

use scholarship_service::config::{Config, LogFormat};
use scholarship_service::observability::{self, metrics::init_metrics_recorder};
use scholarship_service::routes::{self, AppState};
use scholarship_service::services::LocalFileStore;
use scholarship_service::tasks::start_session_cleanup;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Per-statement timeout applied to every pooled connection.
const STATEMENT_TIMEOUT_SECONDS: u32 = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            observability::init_tracing(LogFormat::Text);
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    observability::init_tracing(config.log_format);

    info!("Starting Scholarship Service");
    info!(
        bind_address = %config.bind_address,
        session_ttl_hours = config.session_ttl_hours,
        max_upload_bytes = config.max_upload_bytes,
        storage_dir = %config.storage_dir.display(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    info!("Connecting to database...");
    let db_url = add_statement_timeout(&config.database_url, STATEMENT_TIMEOUT_SECONDS);
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&db_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;
    info!("Database connection established");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| {
            error!("Failed to run database migrations: {}", e);
            e
        })?;
    info!("Database migrations applied");

    tokio::fs::create_dir_all(&config.storage_dir)
        .await
        .map_err(|e| {
            error!("Failed to create storage directory: {}", e);
            e
        })?;
    let file_store = Arc::new(LocalFileStore::new(config.storage_dir.clone()));

    let cancel_token = CancellationToken::new();
    let cleanup_handle = tokio::spawn(start_session_cleanup(
        db_pool.clone(),
        config.session_cleanup_interval_seconds,
        cancel_token.clone(),
    ));

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState::new(db_pool, config, file_store)?);
    let app = routes::build_routes(state, metrics_handle);

    info!("Scholarship Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    cancel_token.cancel();
    if let Err(e) = cleanup_handle.await {
        warn!("Session cleanup task ended abnormally: {}", e);
    }

    info!("Scholarship Service shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM, after the optional `SC_DRAIN_SECONDS` wait.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("SC_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    }
}

/// Append a `statement_timeout` option to the database URL.
fn add_statement_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}options=-c%20statement_timeout%3D{timeout_secs}s")
}
