//! # Courier Server
//!
//! Wires the order service to `PostgreSQL` and serves it over HTTP.
//!
//! Startup order:
//! 1. Load [`Config`](config::Config) from the environment
//! 2. Connect the pool and apply migrations
//! 3. Build the [`OrderService`] over the `PostgreSQL` collaborators
//! 4. Serve the router until SIGINT/SIGTERM

pub mod config;
pub mod metrics;

use anyhow::Context;
use axum::Router;
use config::{Config, PostgresConfig};
use courier_core::{OrderService, SystemClock};
use courier_postgres::{PostgresCatalog, PostgresDriverDirectory, PostgresOrderStore};
use courier_web::{AppState, build_router};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// Open the connection pool and, unless disabled, apply migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn connect_database(config: &PostgresConfig) -> anyhow::Result<PgPool> {
    tracing::info!(
        database = config.url.split('@').next_back().unwrap_or("unknown"),
        "Connecting to PostgreSQL"
    );
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .connect(&config.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    if config.run_migrations {
        courier_postgres::migrate(&pool).await?;
    } else {
        tracing::info!("Skipping migrations");
    }
    Ok(pool)
}

/// Build the order service over `pool`.
#[must_use]
pub fn build_service(pool: &PgPool, config: &Config) -> OrderService {
    OrderService::new(
        Arc::new(PostgresOrderStore::new(pool.clone())),
        Arc::new(PostgresCatalog::new(pool.clone())),
        Arc::new(PostgresDriverDirectory::new(pool.clone())),
        Arc::new(SystemClock),
    )
    .with_settings(config.orders.settings())
}

/// Build the full application router over `pool`.
#[must_use]
pub fn build_app(pool: &PgPool, config: &Config) -> Router {
    build_router(AppState::new(build_service(pool, config)))
}
