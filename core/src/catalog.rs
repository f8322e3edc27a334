//! Read-only view of the store and product catalog.

use crate::geo::GeoPoint;
use crate::order::{ProductId, StoreId};
use crate::store::StoreFuture;
use rust_decimal::Decimal;

/// A store as seen by order creation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreLocation {
    /// Store id.
    pub id: StoreId,
    /// Store coordinates, when the store has published them.
    pub location: Option<GeoPoint>,
}

/// Product price at the time of lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSnapshot {
    /// Product id.
    pub id: ProductId,
    /// Current catalog price.
    pub price: Decimal,
}

/// Catalog lookups consumed when a store order is placed.
pub trait Catalog: Send + Sync {
    /// Find a store.
    fn find_store(&self, id: StoreId) -> StoreFuture<'_, Option<StoreLocation>>;

    /// Look up products. Unknown ids are absent from the result.
    fn find_products(&self, ids: Vec<ProductId>) -> StoreFuture<'_, Vec<ProductSnapshot>>;
}
