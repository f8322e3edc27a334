//! In-memory order collaborators
//!
//! Provides fast, deterministic stand-ins for the storage and lookup traits:
//! - [`InMemoryOrderStore`]: `OrderStore` behind a single mutex
//! - [`InMemoryCatalog`]: stores and product prices
//! - [`InMemoryDriverDirectory`]: driver profiles
//! - [`RecordingNotifier`]: captures emitted events

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use courier_core::catalog::{Catalog, ProductSnapshot, StoreLocation};
use courier_core::driver::{DriverDirectory, DriverProfile, DriverStatus};
use courier_core::error::StoreError;
use courier_core::geo::GeoPoint;
use courier_core::notify::{OrderEvent, OrderNotifier};
use courier_core::order::{
    ItemId, Milestones, Order, OrderId, OrderItem, ProductId, Rating, StoreId, UserId,
};
use courier_core::store::{
    ItemUpdate, NewOrder, NewRating, OrderChange, OrderFilter, OrderGuard, OrderStore, StoreFuture,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

fn ready<'a, T: Send + 'a>(result: Result<T, StoreError>) -> StoreFuture<'a, T> {
    Box::pin(std::future::ready(result))
}

#[derive(Debug, Default)]
struct OrderTables {
    orders: BTreeMap<OrderId, Order>,
    ratings: Vec<Rating>,
    next_order_id: i64,
    next_item_id: i64,
    next_rating_id: i64,
    fail_on_item: Option<usize>,
    offline: bool,
}

/// In-memory order store for fast, deterministic testing.
///
/// All tables live behind one mutex, so every method, including the
/// compare-and-set in [`OrderStore::update_order`], is atomic.
///
/// # Example
///
/// ```
/// use courier_testing::InMemoryOrderStore;
///
/// let store = InMemoryOrderStore::new();
/// assert!(store.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<Mutex<OrderTables>>,
}

impl InMemoryOrderStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert_order` fail while writing item `index`
    /// (0-based). Used to exercise creation rollback.
    pub fn fail_on_item(&self, index: usize) {
        self.tables.lock().unwrap().fail_on_item = Some(index);
    }

    /// Make `ping` fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.tables.lock().unwrap().offline = offline;
    }

    /// Number of stored orders
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.lock().unwrap().orders.len()
    }

    /// Check if the store holds no orders
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored items across all orders
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.tables
            .lock()
            .unwrap()
            .orders
            .values()
            .map(|o| o.items.len())
            .sum()
    }

    /// Number of stored ratings
    #[must_use]
    pub fn rating_count(&self) -> usize {
        self.tables.lock().unwrap().ratings.len()
    }

    /// Snapshot of an order, bypassing the service
    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<Order> {
        self.tables.lock().unwrap().orders.get(&id).cloned()
    }

    fn insert(&self, new: NewOrder) -> Result<Order, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let fail_on_item = tables.fail_on_item.take();

        let order_id = OrderId::new(tables.next_order_id + 1);
        let mut next_item = tables.next_item_id;
        let mut items = Vec::with_capacity(new.items.len());
        for (index, item) in new.items.into_iter().enumerate() {
            if fail_on_item == Some(index) {
                return Err(StoreError::Database(format!(
                    "injected failure inserting item {index}"
                )));
            }
            next_item += 1;
            items.push(OrderItem {
                id: ItemId::new(next_item),
                order_id,
                kind: item.kind,
                product_id: item.product_id,
                custom_name: item.custom_name,
                quantity: item.quantity,
                price: item.price,
                special_instructions: item.special_instructions,
            });
        }

        let order = Order {
            id: order_id,
            customer_id: new.customer_id,
            employer_id: None,
            store_id: new.store_id,
            order_type: new.order_type,
            status: courier_core::OrderStatus::Pending,
            address: new.address,
            destination: new.destination,
            pickup_address: new.pickup_address,
            pickup: new.pickup,
            subtotal: new.subtotal,
            delivery_fee: new.delivery_fee,
            total: new.total,
            payment_method: new.payment_method,
            phone: new.phone,
            notes: new.notes,
            distance_km: new.distance_km,
            milestones: Milestones::default(),
            tracking: None,
            rating: None,
            review: None,
            created_at: new.created_at,
            updated_at: new.created_at,
            items,
        };

        tables.next_order_id = order_id.get();
        tables.next_item_id = next_item;
        tables.orders.insert(order_id, order.clone());
        Ok(order)
    }

    fn rate(&self, new: NewRating) -> Result<Option<Rating>, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.ratings.iter().any(|r| r.order_id == new.order_id) {
            return Ok(None);
        }
        tables.next_rating_id += 1;
        let rating = Rating {
            id: tables.next_rating_id,
            order_id: new.order_id,
            customer_id: new.customer_id,
            store_id: new.store_id,
            rating: new.rating,
            review: new.review,
            created_at: new.created_at,
        };
        let order = tables.orders.get_mut(&new.order_id).ok_or_else(|| {
            StoreError::Database(format!("order {} does not exist", new.order_id))
        })?;
        order.rating = Some(rating.rating);
        order.review.clone_from(&rating.review);
        tables.ratings.push(rating.clone());
        Ok(Some(rating))
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert_order(&self, order: NewOrder) -> StoreFuture<'_, Order> {
        ready(self.insert(order))
    }

    fn find_order(&self, id: OrderId) -> StoreFuture<'_, Option<Order>> {
        ready(Ok(self.get(id)))
    }

    fn list_orders(&self, filter: OrderFilter) -> StoreFuture<'_, Vec<Order>> {
        let mut orders: Vec<Order> = self
            .tables
            .lock()
            .unwrap()
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        ready(Ok(orders))
    }

    fn update_order(
        &self,
        id: OrderId,
        guard: OrderGuard,
        change: OrderChange,
    ) -> StoreFuture<'_, Option<Order>> {
        let mut tables = self.tables.lock().unwrap();
        let updated = tables
            .orders
            .get_mut(&id)
            .filter(|order| guard.matches(order))
            .map(|order| {
                change.apply(order);
                order.clone()
            });
        ready(Ok(updated))
    }

    fn delete_order(&self, id: OrderId) -> StoreFuture<'_, bool> {
        let mut tables = self.tables.lock().unwrap();
        let removed = tables.orders.remove(&id).is_some();
        tables.ratings.retain(|r| r.order_id != id);
        ready(Ok(removed))
    }

    fn insert_rating(&self, rating: NewRating) -> StoreFuture<'_, Option<Rating>> {
        ready(self.rate(rating))
    }

    fn find_item(&self, id: ItemId) -> StoreFuture<'_, Option<OrderItem>> {
        let item = self
            .tables
            .lock()
            .unwrap()
            .orders
            .values()
            .flat_map(|o| o.items.iter())
            .find(|i| i.id == id)
            .cloned();
        ready(Ok(item))
    }

    fn update_item(&self, id: ItemId, update: ItemUpdate) -> StoreFuture<'_, Option<OrderItem>> {
        let mut tables = self.tables.lock().unwrap();
        let item = tables
            .orders
            .values_mut()
            .flat_map(|o| o.items.iter_mut())
            .find(|i| i.id == id)
            .map(|item| {
                update.apply(item);
                item.clone()
            });
        ready(Ok(item))
    }

    fn delete_item(&self, id: ItemId) -> StoreFuture<'_, bool> {
        let mut tables = self.tables.lock().unwrap();
        let removed = tables.orders.values_mut().any(|order| {
            let before = order.items.len();
            order.items.retain(|i| i.id != id);
            order.items.len() != before
        });
        ready(Ok(removed))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        if self.tables.lock().unwrap().offline {
            ready(Err(StoreError::Database("store is offline".to_string())))
        } else {
            ready(Ok(()))
        }
    }
}

/// In-memory catalog of stores and product prices.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCatalog {
    stores: Arc<Mutex<HashMap<StoreId, StoreLocation>>>,
    products: Arc<Mutex<HashMap<ProductId, Decimal>>>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store, with or without coordinates.
    #[must_use]
    pub fn with_store(self, id: i64, location: Option<GeoPoint>) -> Self {
        let id = StoreId::new(id);
        self.stores
            .lock()
            .unwrap()
            .insert(id, StoreLocation { id, location });
        self
    }

    /// Register a product price.
    #[must_use]
    pub fn with_product(self, id: i64, price: Decimal) -> Self {
        self.products
            .lock()
            .unwrap()
            .insert(ProductId::new(id), price);
        self
    }
}

impl Catalog for InMemoryCatalog {
    fn find_store(&self, id: StoreId) -> StoreFuture<'_, Option<StoreLocation>> {
        ready(Ok(self.stores.lock().unwrap().get(&id).cloned()))
    }

    fn find_products(&self, ids: Vec<ProductId>) -> StoreFuture<'_, Vec<ProductSnapshot>> {
        let products = self.products.lock().unwrap();
        let found = ids
            .into_iter()
            .filter_map(|id| products.get(&id).map(|&price| ProductSnapshot { id, price }))
            .collect();
        ready(Ok(found))
    }
}

/// In-memory driver profiles.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDriverDirectory {
    drivers: Arc<Mutex<HashMap<UserId, DriverProfile>>>,
}

impl InMemoryDriverDirectory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile.
    #[must_use]
    pub fn with_driver(self, profile: DriverProfile) -> Self {
        self.drivers.lock().unwrap().insert(profile.id, profile);
        self
    }

    /// Register an active, online, available driver.
    #[must_use]
    pub fn with_active_driver(self, id: i64) -> Self {
        self.with_driver(DriverProfile {
            id: UserId::new(id),
            status: DriverStatus::Active,
            is_online: true,
            is_available: true,
        })
    }

    /// Current profile of a driver
    #[must_use]
    pub fn get(&self, id: i64) -> Option<DriverProfile> {
        self.drivers.lock().unwrap().get(&UserId::new(id)).copied()
    }
}

impl DriverDirectory for InMemoryDriverDirectory {
    fn find_driver(&self, id: UserId) -> StoreFuture<'_, Option<DriverProfile>> {
        ready(Ok(self.drivers.lock().unwrap().get(&id).copied()))
    }

    fn save_driver(&self, profile: DriverProfile) -> StoreFuture<'_, DriverProfile> {
        self.drivers.lock().unwrap().insert(profile.id, profile);
        ready(Ok(profile))
    }
}

/// Notifier that keeps every event for later assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<OrderEvent>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl OrderNotifier for RecordingNotifier {
    fn notify(&self, event: &OrderEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::OrderStatus;
    use courier_core::environment::Clock;
    use courier_core::order::{ItemKind, OrderType};
    use courier_core::store::NewOrderItem;

    fn new_order(items: usize) -> NewOrder {
        NewOrder {
            customer_id: UserId::new(1),
            store_id: None,
            order_type: OrderType::CustomDelivery,
            address: "1 Main St".to_string(),
            destination: None,
            pickup_address: Some("2 Side St".to_string()),
            pickup: None,
            subtotal: Decimal::ZERO,
            delivery_fee: Decimal::ZERO,
            total: Decimal::ZERO,
            payment_method: "cash".to_string(),
            phone: "555".to_string(),
            notes: None,
            distance_km: None,
            created_at: crate::test_clock().now(),
            items: (0..items)
                .map(|_| NewOrderItem {
                    kind: ItemKind::Custom,
                    product_id: None,
                    custom_name: Some("box".to_string()),
                    quantity: 1,
                    price: Decimal::ZERO,
                    special_instructions: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn failed_insert_leaves_nothing_behind() {
        let store = InMemoryOrderStore::new();
        store.fail_on_item(1);

        assert!(store.insert_order(new_order(3)).await.is_err());
        assert!(store.is_empty());
        assert_eq!(store.item_count(), 0);

        // the injected failure is one-shot
        let order = store.insert_order(new_order(3)).await.unwrap();
        assert_eq!(order.id, OrderId::new(1));
        assert_eq!(order.items.len(), 3);
    }

    #[tokio::test]
    async fn guarded_update_only_applies_when_guard_holds() {
        let store = InMemoryOrderStore::new();
        let order = store.insert_order(new_order(1)).await.unwrap();
        let at = crate::test_clock().now();

        let wrong = store
            .update_order(
                order.id,
                OrderGuard::status(OrderStatus::Confirmed),
                OrderChange::at(at).with_status(OrderStatus::Preparing),
            )
            .await
            .unwrap();
        assert!(wrong.is_none());

        let claimed = store
            .update_order(
                order.id,
                OrderGuard::claimable_by(UserId::new(9)),
                OrderChange::at(at)
                    .with_status(OrderStatus::Confirmed)
                    .with_employer(UserId::new(9)),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claimed.status, OrderStatus::Confirmed);
        assert_eq!(claimed.milestones.assigned_at, Some(at));
    }
}
