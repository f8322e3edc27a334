//! `PostgreSQL` storage for the Courier order service.
//!
//! This crate implements the storage collaborators from `courier-core` on top
//! of a shared sqlx connection pool:
//!
//! - [`PostgresOrderStore`]: orders, line items and ratings
//! - [`PostgresCatalog`]: store coordinates and product prices
//! - [`PostgresDriverDirectory`]: driver eligibility on the `users` table
//!
//! Every guarded order change is a single conditional `UPDATE ... WHERE ...
//! RETURNING` statement, so two drivers claiming the same order race on the
//! row lock and exactly one of them sees a returned row.
//!
//! # Example
//!
//! ```ignore
//! use courier_postgres::{connect, migrate, PostgresOrderStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect("postgres://localhost/courier", 10).await?;
//!     migrate(&pool).await?;
//!     let orders = PostgresOrderStore::new(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod drivers;
mod orders;
mod rows;

pub use catalog::PostgresCatalog;
pub use drivers::PostgresDriverDirectory;
pub use orders::PostgresOrderStore;

use courier_core::StoreError;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the database is unreachable.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))
}

/// Apply the bundled schema migrations.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}
