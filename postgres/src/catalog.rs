//! Store and product lookups.

use crate::rows::db;
use courier_core::StoreError;
use courier_core::catalog::{Catalog, ProductSnapshot, StoreLocation};
use courier_core::geo::GeoPoint;
use courier_core::order::{ProductId, StoreId};
use courier_core::store::StoreFuture;
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;

/// Read-only catalog over the `stores` and `products` tables.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Create a catalog over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Catalog for PostgresCatalog {
    fn find_store(&self, id: StoreId) -> StoreFuture<'_, Option<StoreLocation>> {
        Box::pin(async move {
            let row: Option<(i64, Option<f64>, Option<f64>)> =
                sqlx::query_as("SELECT id, latitude, longitude FROM stores WHERE id = $1")
                    .bind(id.get())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(db)?;

            Ok(row.map(|(id, latitude, longitude)| StoreLocation {
                id: StoreId::new(id),
                location: latitude
                    .zip(longitude)
                    .map(|(lat, lng)| GeoPoint::new(lat, lng)),
            }))
        })
    }

    fn find_products(&self, ids: Vec<ProductId>) -> StoreFuture<'_, Vec<ProductSnapshot>> {
        Box::pin(async move {
            let ids: Vec<i64> = ids.iter().map(ProductId::get).collect();
            let rows: Vec<(i64, Decimal)> =
                sqlx::query_as("SELECT id, price FROM products WHERE id = ANY($1)")
                    .bind(&ids)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db)?;

            Ok(rows
                .into_iter()
                .map(|(id, price)| ProductSnapshot {
                    id: ProductId::new(id),
                    price,
                })
                .collect())
        })
    }
}
