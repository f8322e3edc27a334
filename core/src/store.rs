//! Order persistence abstraction.
//!
//! Every mutation of an existing order goes through
//! [`OrderStore::update_order`], a compare-and-set: the change is applied only
//! if the row still satisfies the [`OrderGuard`] at write time, and the
//! updated order is returned. A `None` result means another request got there
//! first. Implementations must evaluate the guard and apply the change as one
//! atomic step (a conditional `UPDATE ... WHERE ... RETURNING` in SQL, a held
//! lock in memory).
//!
//! # Implementations
//!
//! - `PostgresOrderStore` (in `courier-postgres`): production storage
//! - `InMemoryOrderStore` (in `courier-testing`): fast, deterministic tests

use crate::error::StoreError;
use crate::geo::GeoPoint;
use crate::lifecycle::{Milestone, OrderStatus};
use crate::order::{
    DeliveryTracking, ItemId, ItemKind, Order, OrderId, OrderItem, OrderType, ProductId, Rating,
    StoreId, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by storage collaborators.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// A validated, priced order ready to be inserted with its items.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    /// Owning customer.
    pub customer_id: UserId,
    /// Source store, for store orders.
    pub store_id: Option<StoreId>,
    /// Order classification.
    pub order_type: OrderType,
    /// Delivery address.
    pub address: String,
    /// Delivery coordinates.
    pub destination: Option<GeoPoint>,
    /// Pickup address.
    pub pickup_address: Option<String>,
    /// Pickup coordinates.
    pub pickup: Option<GeoPoint>,
    /// Sum of line totals.
    pub subtotal: Decimal,
    /// Delivery fee.
    pub delivery_fee: Decimal,
    /// `subtotal + delivery_fee`.
    pub total: Decimal,
    /// Payment method label.
    pub payment_method: String,
    /// Contact phone.
    pub phone: String,
    /// Customer notes.
    pub notes: Option<String>,
    /// Distance recorded with the order.
    pub distance_km: Option<f64>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Items, inserted in order.
    pub items: Vec<NewOrderItem>,
}

/// A line item to insert alongside a [`NewOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    /// Item kind marker.
    pub kind: ItemKind,
    /// Catalog product.
    pub product_id: Option<ProductId>,
    /// Free-form name.
    pub custom_name: Option<String>,
    /// Quantity.
    pub quantity: u32,
    /// Unit price snapshot.
    pub price: Decimal,
    /// Handling notes.
    pub special_instructions: Option<String>,
}

/// Match on an order's `employer_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmployerMatch {
    /// Any value, including none.
    #[default]
    Any,
    /// Exactly this driver.
    Is(UserId),
    /// No driver yet, or this driver.
    UnassignedOr(UserId),
}

impl EmployerMatch {
    /// Evaluate against an order's `employer_id`.
    #[must_use]
    pub fn matches(&self, employer_id: Option<UserId>) -> bool {
        match self {
            Self::Any => true,
            Self::Is(driver) => employer_id == Some(*driver),
            Self::UnassignedOr(driver) => employer_id.is_none() || employer_id == Some(*driver),
        }
    }
}

/// Preconditions an order row must still satisfy when a change is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderGuard {
    /// Allowed current statuses.
    pub statuses: Vec<OrderStatus>,
    /// Constraint on the assigned driver.
    pub employer: EmployerMatch,
    /// Required owning customer.
    pub customer: Option<UserId>,
}

impl OrderGuard {
    /// Guard on a single expected status.
    #[must_use]
    pub fn status(status: OrderStatus) -> Self {
        Self::statuses(&[status])
    }

    /// Guard on any of `statuses`.
    #[must_use]
    pub fn statuses(statuses: &[OrderStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            employer: EmployerMatch::Any,
            customer: None,
        }
    }

    /// The claim predicate: pending, and unassigned or pre-assigned to `driver`.
    #[must_use]
    pub fn claimable_by(driver: UserId) -> Self {
        Self::status(OrderStatus::Pending).with_employer(EmployerMatch::UnassignedOr(driver))
    }

    /// Add a driver constraint.
    #[must_use]
    pub fn with_employer(mut self, employer: EmployerMatch) -> Self {
        self.employer = employer;
        self
    }

    /// Add an owner constraint.
    #[must_use]
    pub fn owned_by(mut self, customer: UserId) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Evaluate the guard against an order.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.statuses.contains(&order.status)
            && self.employer.matches(order.employer_id)
            && self.customer.is_none_or(|customer| customer == order.customer_id)
    }
}

/// Fields to write when a guard holds.
///
/// Milestones are derived: entering a status stamps its milestone, binding a
/// driver stamps `assigned_at`. Stamps never overwrite an existing value.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderChange {
    /// New status.
    pub status: Option<OrderStatus>,
    /// Driver to bind.
    pub employer_id: Option<UserId>,
    /// New tracked position.
    pub location: Option<GeoPoint>,
    /// Time of the change.
    pub at: DateTime<Utc>,
}

impl OrderChange {
    /// A change that only records the time.
    #[must_use]
    pub const fn at(at: DateTime<Utc>) -> Self {
        Self {
            status: None,
            employer_id: None,
            location: None,
            at,
        }
    }

    /// Move to `status`.
    #[must_use]
    pub const fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Bind `driver`.
    #[must_use]
    pub const fn with_employer(mut self, driver: UserId) -> Self {
        self.employer_id = Some(driver);
        self
    }

    /// Record a tracked position.
    #[must_use]
    pub const fn with_location(mut self, position: GeoPoint) -> Self {
        self.location = Some(position);
        self
    }

    /// Milestones this change stamps.
    #[must_use]
    pub fn milestones(&self) -> Vec<Milestone> {
        let mut stamps = Vec::with_capacity(2);
        if self.employer_id.is_some() {
            stamps.push(Milestone::Assigned);
        }
        if let Some(milestone) = self.status.and_then(|s| s.milestone()) {
            stamps.push(milestone);
        }
        stamps
    }

    /// Apply the change to an in-memory order.
    pub fn apply(&self, order: &mut Order) {
        for milestone in self.milestones() {
            order.milestones.stamp(milestone, self.at);
        }
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(driver) = self.employer_id {
            order.employer_id = Some(driver);
        }
        if let Some(position) = self.location {
            order.tracking = Some(DeliveryTracking {
                position,
                updated_at: self.at,
            });
        }
        order.updated_at = self.at;
    }
}

/// Query over orders. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    /// Owning customer.
    pub customer_id: Option<UserId>,
    /// Assigned driver constraint.
    pub employer: EmployerMatch,
    /// Allowed statuses; empty means any.
    pub statuses: Vec<OrderStatus>,
    /// Order classification.
    pub order_type: Option<OrderType>,
    /// Created at or after.
    pub created_from: Option<DateTime<Utc>>,
    /// Created strictly before.
    pub created_before: Option<DateTime<Utc>>,
}

impl OrderFilter {
    /// Evaluate the filter against an order.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        self.customer_id.is_none_or(|c| c == order.customer_id)
            && self.employer.matches(order.employer_id)
            && (self.statuses.is_empty() || self.statuses.contains(&order.status))
            && self.order_type.is_none_or(|t| t == order.order_type)
            && self.created_from.is_none_or(|from| order.created_at >= from)
            && self.created_before.is_none_or(|before| order.created_at < before)
    }
}

/// Partial update of a line item. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemUpdate {
    /// New quantity.
    pub quantity: Option<u32>,
    /// New unit price.
    pub price: Option<Decimal>,
    /// New handling notes.
    pub special_instructions: Option<String>,
}

impl ItemUpdate {
    /// Apply to an in-memory item.
    pub fn apply(&self, item: &mut OrderItem) {
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(notes) = &self.special_instructions {
            item.special_instructions = Some(notes.clone());
        }
    }
}

/// A rating to attach to a delivered order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRating {
    /// Rated order.
    pub order_id: OrderId,
    /// Rating customer.
    pub customer_id: UserId,
    /// Rated store.
    pub store_id: StoreId,
    /// Score, `1..=5`.
    pub rating: u8,
    /// Optional review.
    pub review: Option<String>,
    /// When it was given.
    pub created_at: DateTime<Utc>,
}

/// Order persistence.
///
/// # Dyn Compatibility
///
/// Methods return [`StoreFuture`] instead of using `async fn` so the service
/// can hold an `Arc<dyn OrderStore>`.
pub trait OrderStore: Send + Sync {
    /// Insert an order and all of its items atomically.
    ///
    /// Either the order and every item become visible, or nothing does.
    fn insert_order(&self, order: NewOrder) -> StoreFuture<'_, Order>;

    /// Load an order with its items.
    fn find_order(&self, id: OrderId) -> StoreFuture<'_, Option<Order>>;

    /// List orders matching `filter`, newest first.
    fn list_orders(&self, filter: OrderFilter) -> StoreFuture<'_, Vec<Order>>;

    /// Apply `change` if the order still satisfies `guard`.
    ///
    /// Returns the updated order, or `None` if the order is missing or the
    /// guard no longer holds.
    fn update_order(
        &self,
        id: OrderId,
        guard: OrderGuard,
        change: OrderChange,
    ) -> StoreFuture<'_, Option<Order>>;

    /// Delete an order together with its items and rating.
    ///
    /// Returns `false` if there was nothing to delete.
    fn delete_order(&self, id: OrderId) -> StoreFuture<'_, bool>;

    /// Attach a rating and copy it onto the order.
    ///
    /// Returns `None` if the order already has a rating.
    fn insert_rating(&self, rating: NewRating) -> StoreFuture<'_, Option<Rating>>;

    /// Load a single line item.
    fn find_item(&self, id: ItemId) -> StoreFuture<'_, Option<OrderItem>>;

    /// Apply a partial item update. `None` if the item does not exist.
    fn update_item(&self, id: ItemId, update: ItemUpdate) -> StoreFuture<'_, Option<OrderItem>>;

    /// Delete a line item. Returns `false` if it did not exist.
    fn delete_item(&self, id: ItemId) -> StoreFuture<'_, bool>;

    /// Round-trip to the backing store, for readiness probes.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn employer_match() {
        let me = UserId::new(1);
        let other = UserId::new(2);

        assert!(EmployerMatch::Any.matches(None));
        assert!(EmployerMatch::Is(me).matches(Some(me)));
        assert!(!EmployerMatch::Is(me).matches(None));
        assert!(EmployerMatch::UnassignedOr(me).matches(None));
        assert!(EmployerMatch::UnassignedOr(me).matches(Some(me)));
        assert!(!EmployerMatch::UnassignedOr(me).matches(Some(other)));
    }

    #[test]
    fn claim_change_stamps_assigned_and_confirmed() {
        let change = OrderChange::at(Utc::now())
            .with_status(OrderStatus::Confirmed)
            .with_employer(UserId::new(3));
        assert_eq!(
            change.milestones(),
            vec![Milestone::Assigned, Milestone::Confirmed]
        );
    }

    #[test]
    fn location_change_stamps_nothing() {
        let change = OrderChange::at(Utc::now()).with_location(GeoPoint::new(1.0, 2.0));
        assert!(change.milestones().is_empty());
    }
}
