//! HTTP server initialization and runtime setup.
//!
//! Handles the database pool, migrations, log worker spawning, and the Axum
//! server lifecycle.

use crate::api::routes::app_router;
use crate::application::services::MappingService;
use crate::config::Config;
use crate::domain::log_worker::run_log_worker;
use crate::infrastructure::persistence::{PgMappingRepository, PgRedirectLogRepository};
use crate::state::AppState;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Background redirect log worker
/// - Axum HTTP server with graceful shutdown on Ctrl+C
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_pool(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    let (log_tx, log_rx) = mpsc::channel(config.log_queue_capacity);

    let pool_arc = Arc::new(pool);
    let mapping_repository = Arc::new(PgMappingRepository::new(pool_arc.clone()));
    let log_repository = Arc::new(PgRedirectLogRepository::new(pool_arc));

    let worker = tokio::spawn(run_log_worker(log_rx, log_repository));
    tracing::info!("Redirect log worker started");

    let mapping_service = Arc::new(MappingService::new(
        mapping_repository,
        config.portal_id,
        config.mapping_refresh(),
    ));

    let state = AppState::new(
        mapping_service,
        log_tx,
        config.portal_id,
        config.redirect_mode(),
    )
    .with_behind_proxy(config.behind_proxy)
    .with_diagnostics_token(config.diagnostics_token.clone());

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // the router (and with it every sender) is gone: the worker drains and exits
    if let Err(e) = worker.await {
        tracing::error!("Redirect log worker panicked: {}", e);
    }

    Ok(())
}

/// Builds the connection pool from the `DB_*` pool settings.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn connect_pool(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
