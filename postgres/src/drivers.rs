//! Driver eligibility stored on the `users` table.

use crate::rows::db;
use courier_core::StoreError;
use courier_core::driver::{DriverDirectory, DriverProfile, DriverStatus};
use courier_core::order::UserId;
use courier_core::store::StoreFuture;
use sqlx::postgres::PgPool;

type DriverRow = (i64, String, bool, bool);

/// Driver profiles: users with the `employer` role.
#[derive(Clone)]
pub struct PostgresDriverDirectory {
    pool: PgPool,
}

impl PostgresDriverDirectory {
    /// Create a directory over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn profile((id, status, is_online, is_available): DriverRow) -> Result<DriverProfile, StoreError> {
    let status = DriverStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown driver status: {status}")))?;
    Ok(DriverProfile {
        id: UserId::new(id),
        status,
        is_online,
        is_available,
    })
}

impl DriverDirectory for PostgresDriverDirectory {
    fn find_driver(&self, id: UserId) -> StoreFuture<'_, Option<DriverProfile>> {
        Box::pin(async move {
            let row: Option<DriverRow> = sqlx::query_as(
                r"
                SELECT id, status, is_online, is_available
                FROM users
                WHERE id = $1 AND role = 'employer'
                ",
            )
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

            row.map(profile).transpose()
        })
    }

    fn save_driver(&self, driver: DriverProfile) -> StoreFuture<'_, DriverProfile> {
        Box::pin(async move {
            let row: Option<DriverRow> = sqlx::query_as(
                r"
                UPDATE users
                SET status = $2, is_online = $3, is_available = $4
                WHERE id = $1 AND role = 'employer'
                RETURNING id, status, is_online, is_available
                ",
            )
            .bind(driver.id.get())
            .bind(driver.status.as_str())
            .bind(driver.is_online)
            .bind(driver.is_available)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

            let saved = row
                .map(profile)
                .transpose()?
                .ok_or_else(|| StoreError::Database(format!("driver {} does not exist", driver.id)))?;
            tracing::info!(driver_id = %saved.id, status = %saved.status, "Driver status updated");
            Ok(saved)
        })
    }
}
