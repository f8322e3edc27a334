//! Order operations for customers, drivers, and admins.
//!
//! [`OrderService`] is the single entry point the HTTP layer talks to. Every
//! operation takes the authenticated [`Actor`] explicitly; nothing is read
//! from ambient state.
//!
//! # Writes
//!
//! Reads are used to pick the right error, never to authorize a write. Each
//! write carries its own [`OrderGuard`], so a request that loses a race to
//! another request fails with [`OrderError::StateConflict`] instead of
//! overwriting it.

use crate::actor::{Actor, Role};
use crate::catalog::Catalog;
use crate::creation::{
    CreateOrder, CreationPolicy, FieldChecker, MAX_AMOUNT, MAX_INSTRUCTIONS_LEN, MAX_QUANTITY,
    MAX_REVIEW_LEN,
};
use crate::driver::{DriverDirectory, DriverProfile, DriverStatus};
use crate::environment::Clock;
use crate::error::{OrderError, ValidationErrors};
use crate::lifecycle::{OrderStatus, ensure_transition};
use crate::notify::{OrderEvent, OrderNotifier, TracingNotifier};
use crate::order::{ItemId, Order, OrderId, OrderItem, OrderType, Rating, UserId};
use crate::stats::{self, DriverDashboard, PerformanceStats, WaterTankStats, WeeklyPerformance};
use crate::store::{
    EmployerMatch, ItemUpdate, NewRating, OrderChange, OrderFilter, OrderGuard, OrderStore,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Default delivery radius for store orders.
pub const DEFAULT_MAX_DELIVERY_DISTANCE_KM: f64 = 17.0;

const CONCURRENT_MODIFICATION: &str = "Order was modified by another request. Please retry.";

/// Tunable business rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSettings {
    /// Store orders farther than this from the store are rejected.
    pub max_delivery_distance_km: f64,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            max_delivery_distance_km: DEFAULT_MAX_DELIVERY_DISTANCE_KM,
        }
    }
}

/// Result of a successful creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedOrder {
    /// The stored order with its items.
    pub order: Order,
    /// Customer-to-store distance, for store orders.
    pub distance_km: Option<f64>,
}

/// Body of a rating request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatingRequest {
    /// Score, `1..=5`.
    pub rating: Option<i64>,
    /// Optional review, up to 500 characters.
    pub review: Option<String>,
}

/// Order lifecycle operations.
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    catalog: Arc<dyn Catalog>,
    drivers: Arc<dyn DriverDirectory>,
    notifier: Arc<dyn OrderNotifier>,
    clock: Arc<dyn Clock>,
    settings: OrderSettings,
}

impl OrderService {
    /// Create a service with the default settings and a logging notifier.
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderStore>,
        catalog: Arc<dyn Catalog>,
        drivers: Arc<dyn DriverDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            drivers,
            notifier: Arc::new(TracingNotifier),
            clock,
            settings: OrderSettings::default(),
        }
    }

    /// Replace the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn OrderNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the settings.
    #[must_use]
    pub const fn with_settings(mut self, settings: OrderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> OrderSettings {
        self.settings
    }

    /// Check that the backing store answers.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Persistence`] when the store is unreachable.
    pub async fn ping(&self) -> Result<(), OrderError> {
        Ok(self.store.ping().await?)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Customer operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Place an order of any type.
    ///
    /// Store orders must reference a store with known coordinates within the
    /// configured radius of the delivery point. Product items are priced from
    /// the catalog. The order and its items are inserted atomically.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Validation`] for malformed input or unknown store/products
    /// - [`OrderError::DistanceExceeded`] when the store is too far away
    /// - [`OrderError::Persistence`] when the insert fails; nothing is written
    pub async fn create_order(
        &self,
        actor: &Actor,
        request: CreateOrder,
    ) -> Result<CreatedOrder, OrderError> {
        actor.require(Role::Customer)?;
        let draft = request.into_draft()?;

        let mut distance_km = None;
        let mut prices = HashMap::new();

        if let Some(store_id) = draft.store_id {
            let store = self.catalog.find_store(store_id).await?.ok_or_else(|| {
                ValidationErrors::single("store_id", "The selected store_id is invalid.")
            })?;
            let Some(origin) = store.location else {
                return Err(
                    ValidationErrors::single("store_id", "Store location is not available.").into(),
                );
            };
            let Some(destination) = draft.destination else {
                return Err(ValidationErrors::single("latitude", "The latitude field is required.").into());
            };

            let distance = destination.distance_to(&origin);
            let max_km = self.settings.max_delivery_distance_km;
            if distance > max_km {
                tracing::info!(
                    store_id = %store_id,
                    distance_km = distance,
                    max_km,
                    "Store order rejected: outside delivery radius"
                );
                return Err(OrderError::DistanceExceeded {
                    distance_km: distance,
                    max_km,
                });
            }
            distance_km = Some(distance);

            let ids = draft.product_ids();
            if !ids.is_empty() {
                prices = self
                    .catalog
                    .find_products(ids)
                    .await?
                    .into_iter()
                    .map(|p| (p.id, p.price))
                    .collect();
            }
        }

        let order_type = draft.order_type;
        let new_order = draft.into_new_order(actor.id, &prices, distance_km, self.clock.now())?;
        let order = self.store.insert_order(new_order).await.inspect_err(|e| {
            tracing::error!(error = %e, order_type = %order_type, "Failed to create order");
        })?;

        metrics::counter!("courier.orders.created", "order_type" => order_type.as_str())
            .increment(1);
        tracing::info!(
            order_id = %order.id,
            customer_id = %actor.id,
            order_type = %order_type,
            items = order.items.len(),
            total = %order.total,
            "Order created"
        );
        self.notifier.notify(&OrderEvent::Created {
            order_id: order.id,
            customer_id: actor.id,
            order_type,
        });

        Ok(CreatedOrder { order, distance_km })
    }

    /// The customer's orders, newest first, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-customers.
    pub async fn list_customer_orders(
        &self,
        actor: &Actor,
        order_type: Option<OrderType>,
    ) -> Result<Vec<Order>, OrderError> {
        actor.require(Role::Customer)?;
        let filter = OrderFilter {
            customer_id: Some(actor.id),
            order_type,
            ..OrderFilter::default()
        };
        Ok(self.store.list_orders(filter).await?)
    }

    /// One of the customer's orders.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] when the order is missing, owned by
    /// someone else, or of another type than `order_type`.
    pub async fn customer_order(
        &self,
        actor: &Actor,
        id: OrderId,
        order_type: Option<OrderType>,
    ) -> Result<Order, OrderError> {
        actor.require(Role::Customer)?;
        self.owned_order(actor, id, order_type).await
    }

    /// Cancel one of the customer's orders.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] when the order is not visible to the customer
    /// - [`OrderError::StateConflict`] once the order is on its way or finished
    pub async fn cancel_by_customer(
        &self,
        actor: &Actor,
        id: OrderId,
        order_type: Option<OrderType>,
    ) -> Result<Order, OrderError> {
        actor.require(Role::Customer)?;
        let order = self.owned_order(actor, id, order_type).await?;
        ensure_cancellable(&order)?;

        let guard = OrderGuard::statuses(&OrderStatus::CANCELLABLE).owned_by(actor.id);
        let updated = self.apply(id, guard, self.change().with_status(OrderStatus::Cancelled)).await?;
        self.status_changed(&order, &updated, actor);
        Ok(updated)
    }

    /// Rate a delivered store order. Each order can be rated once.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Validation`] for a score outside `1..=5` or an overlong review
    /// - [`OrderError::NotFound`] when the order is not the customer's
    /// - [`OrderError::StateConflict`] when the order is not delivered
    /// - [`OrderError::MissingStore`] for orders without a store
    /// - [`OrderError::AlreadyRated`] on a second rating
    pub async fn rate_order(
        &self,
        actor: &Actor,
        id: OrderId,
        request: RatingRequest,
    ) -> Result<Rating, OrderError> {
        actor.require(Role::Customer)?;

        let mut check = FieldChecker::default();
        let score = check.rating("rating", request.rating);
        let review = check.optional_text("review", request.review, MAX_REVIEW_LEN);
        check.finish()?;

        let order = self.owned_order(actor, id, None).await?;
        if order.status != OrderStatus::Delivered {
            return Err(OrderError::StateConflict(format!(
                "Only delivered orders can be rated. Current status: {}",
                order.status
            )));
        }
        let store_id = order.store_id.ok_or(OrderError::MissingStore)?;
        if order.is_rated() {
            return Err(OrderError::AlreadyRated);
        }

        let rating = self
            .store
            .insert_rating(NewRating {
                order_id: id,
                customer_id: actor.id,
                store_id,
                rating: score,
                review,
                created_at: self.clock.now(),
            })
            .await?
            .ok_or(OrderError::AlreadyRated)?;

        metrics::counter!("courier.orders.ratings").increment(1);
        tracing::info!(order_id = %id, store_id = %store_id, rating = score, "Order rated");
        Ok(rating)
    }

    /// Aggregates over the customer's water-tank orders.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-customers.
    pub async fn water_tank_stats(&self, actor: &Actor) -> Result<WaterTankStats, OrderError> {
        let orders = self
            .list_customer_orders(actor, Some(OrderType::WaterTank))
            .await?;
        Ok(WaterTankStats::from_orders(&orders))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Driver operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Claim a pending order.
    ///
    /// The order must be pending and either unassigned or pre-assigned to the
    /// caller. The check and the write are one conditional update, so when
    /// two drivers race for the same order exactly one of them wins.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Forbidden`] when the driver cannot take orders right now
    /// - [`OrderError::NotFound`] when the order is missing or bound to another driver
    /// - [`OrderError::StateConflict`] when the order is no longer pending
    pub async fn accept_order(&self, actor: &Actor, id: OrderId) -> Result<Order, OrderError> {
        actor.require(Role::Employer)?;
        let eligible = self
            .drivers
            .find_driver(actor.id)
            .await?
            .is_some_and(|profile| profile.can_accept_orders());
        if !eligible {
            return Err(OrderError::Forbidden(
                "Your driver account is not eligible to accept orders.".to_string(),
            ));
        }

        let change = self
            .change()
            .with_status(OrderStatus::Confirmed)
            .with_employer(actor.id);
        let Some(order) = self
            .store
            .update_order(id, OrderGuard::claimable_by(actor.id), change)
            .await?
        else {
            return Err(self.explain_failed_claim(actor, id).await);
        };

        metrics::counter!("courier.orders.claimed").increment(1);
        tracing::info!(order_id = %id, driver_id = %actor.id, "Order accepted");
        self.notifier.notify(&OrderEvent::Assigned {
            order_id: id,
            driver_id: actor.id,
        });
        self.notifier.notify(&OrderEvent::StatusChanged {
            order_id: id,
            from: OrderStatus::Pending,
            to: OrderStatus::Confirmed,
        });
        Ok(order)
    }

    async fn explain_failed_claim(&self, actor: &Actor, id: OrderId) -> OrderError {
        let current = match self.store.find_order(id).await {
            Ok(Some(order)) => order,
            Ok(None) => return OrderError::order_not_found(id.get()),
            Err(e) => return e.into(),
        };
        if current.status == OrderStatus::Pending
            && current.employer_id.is_some_and(|driver| driver != actor.id)
        {
            return OrderError::order_not_found(id.get());
        }

        metrics::counter!("courier.orders.claim_conflicts").increment(1);
        tracing::warn!(
            order_id = %id,
            driver_id = %actor.id,
            status = %current.status,
            "Claim lost: order no longer available"
        );
        OrderError::StateConflict("Order is no longer available".to_string())
    }

    /// Move an assigned order to `target`.
    ///
    /// A pre-assigned `pending` order only leaves `pending` through
    /// [`Self::accept_order`] or [`Self::cancel_by_driver`], so the driver
    /// eligibility check always applies.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Forbidden`] when confirming while not eligible
    /// - [`OrderError::NotFound`] when the order is not assigned to the caller
    /// - [`OrderError::InvalidTransition`] when the table forbids the move
    /// - [`OrderError::StateConflict`] when the order changed underneath
    pub async fn transition(
        &self,
        actor: &Actor,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, OrderError> {
        actor.require(Role::Employer)?;
        let order = self.assigned_order(actor, id).await?;
        ensure_transition(order.status, target)?;
        if order.status == OrderStatus::Pending {
            // leaving pending is a claim or a cancel, with their own checks
            return match target {
                OrderStatus::Cancelled => self.cancel_by_driver(actor, id).await,
                _ => self.accept_order(actor, id).await,
            };
        }

        let guard = OrderGuard::status(order.status).with_employer(EmployerMatch::Is(actor.id));
        let updated = self.apply(id, guard, self.change().with_status(target)).await?;
        self.status_changed(&order, &updated, actor);
        Ok(updated)
    }

    /// Shortcut for `on_the_way → delivered`.
    ///
    /// # Errors
    ///
    /// As [`Self::transition`], plus [`OrderError::StateConflict`] unless the
    /// order is currently on its way.
    pub async fn mark_delivered(&self, actor: &Actor, id: OrderId) -> Result<Order, OrderError> {
        actor.require(Role::Employer)?;
        let order = self.assigned_order(actor, id).await?;
        if order.status != OrderStatus::OnTheWay {
            return Err(OrderError::StateConflict(format!(
                "Order must be on the way to be marked as delivered. Current status: {}",
                order.status
            )));
        }
        self.transition(actor, id, OrderStatus::Delivered).await
    }

    /// Cancel an order assigned to the caller.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] when the order is not assigned to the caller
    /// - [`OrderError::StateConflict`] once the order is on its way or finished
    pub async fn cancel_by_driver(&self, actor: &Actor, id: OrderId) -> Result<Order, OrderError> {
        actor.require(Role::Employer)?;
        let order = self.assigned_order(actor, id).await?;
        ensure_cancellable(&order)?;

        let guard = OrderGuard::statuses(&OrderStatus::CANCELLABLE)
            .with_employer(EmployerMatch::Is(actor.id));
        let updated = self.apply(id, guard, self.change().with_status(OrderStatus::Cancelled)).await?;
        self.status_changed(&order, &updated, actor);
        Ok(updated)
    }

    /// Record the driver's current position on an in-flight order.
    ///
    /// Last write wins; no history is kept.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Validation`] for coordinates out of range
    /// - [`OrderError::NotFound`] when the order is not assigned to the caller
    /// - [`OrderError::StateConflict`] when the order is not in flight
    pub async fn update_location(
        &self,
        actor: &Actor,
        id: OrderId,
        latitude: f64,
        longitude: f64,
    ) -> Result<Order, OrderError> {
        actor.require(Role::Employer)?;
        let position = FieldChecker::position(("latitude", latitude), ("longitude", longitude))?;

        let order = self.assigned_order(actor, id).await?;
        if !OrderStatus::IN_FLIGHT.contains(&order.status) {
            return Err(OrderError::StateConflict(format!(
                "Location can only be updated for active deliveries. Current status: {}",
                order.status
            )));
        }

        let guard = OrderGuard::statuses(&OrderStatus::IN_FLIGHT)
            .with_employer(EmployerMatch::Is(actor.id));
        let updated = self.apply(id, guard, self.change().with_location(position)).await?;
        tracing::debug!(order_id = %id, driver_id = %actor.id, "Driver location updated");
        Ok(updated)
    }

    /// Every order assigned to the driver.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-drivers.
    pub async fn my_orders(&self, actor: &Actor) -> Result<Vec<Order>, OrderError> {
        self.driver_orders(actor, &[]).await
    }

    /// Assigned orders in flight.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-drivers.
    pub async fn active_deliveries(&self, actor: &Actor) -> Result<Vec<Order>, OrderError> {
        self.driver_orders(actor, &OrderStatus::IN_FLIGHT).await
    }

    /// Pending orders the driver can claim: the open pool plus orders
    /// pre-assigned to them.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-drivers.
    pub async fn available_orders(&self, actor: &Actor) -> Result<Vec<Order>, OrderError> {
        actor.require(Role::Employer)?;
        let filter = OrderFilter {
            employer: EmployerMatch::UnassignedOr(actor.id),
            statuses: vec![OrderStatus::Pending],
            ..OrderFilter::default()
        };
        Ok(self.store.list_orders(filter).await?)
    }

    /// Pending orders an admin pre-assigned to the driver.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-drivers.
    pub async fn admin_assigned_orders(&self, actor: &Actor) -> Result<Vec<Order>, OrderError> {
        self.driver_orders(actor, &[OrderStatus::Pending]).await
    }

    /// Finished orders.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-drivers.
    pub async fn delivery_history(&self, actor: &Actor) -> Result<Vec<Order>, OrderError> {
        self.driver_orders(actor, &[OrderStatus::Delivered, OrderStatus::Cancelled])
            .await
    }

    /// An order the driver may look at: assigned to them, or still in the
    /// open pool.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] for anything else.
    pub async fn driver_order(&self, actor: &Actor, id: OrderId) -> Result<Order, OrderError> {
        actor.require(Role::Employer)?;
        let order = self.load(id).await?;
        let open = order.status == OrderStatus::Pending && order.employer_id.is_none();
        if order.is_assigned_to(actor.id) || open {
            Ok(order)
        } else {
            Err(OrderError::order_not_found(id.get()))
        }
    }

    /// Assigned orders created today (UTC).
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-drivers.
    pub async fn todays_orders(&self, actor: &Actor) -> Result<Vec<Order>, OrderError> {
        actor.require(Role::Employer)?;
        let (from, before) = stats::day_bounds(self.clock.now());
        let filter = OrderFilter {
            employer: EmployerMatch::Is(actor.id),
            created_from: Some(from),
            created_before: Some(before),
            ..OrderFilter::default()
        };
        Ok(self.store.list_orders(filter).await?)
    }

    /// Counts for the driver dashboard.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-drivers.
    pub async fn driver_dashboard(&self, actor: &Actor) -> Result<DriverDashboard, OrderError> {
        let orders = self.my_orders(actor).await?;
        Ok(DriverDashboard::from_orders(&orders))
    }

    /// Completion rate and average delivery time.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-drivers.
    pub async fn performance_stats(&self, actor: &Actor) -> Result<PerformanceStats, OrderError> {
        let orders = self.my_orders(actor).await?;
        Ok(PerformanceStats::from_orders(&orders))
    }

    /// Results for the current Monday-to-Sunday week.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-drivers.
    pub async fn weekly_performance(
        &self,
        actor: &Actor,
    ) -> Result<WeeklyPerformance, OrderError> {
        actor.require(Role::Employer)?;
        let week_start = stats::week_start(self.clock.now());
        let from = week_start.and_time(chrono::NaiveTime::MIN).and_utc();
        let filter = OrderFilter {
            employer: EmployerMatch::Is(actor.id),
            created_from: Some(from),
            created_before: Some(from + chrono::Duration::days(7)),
            ..OrderFilter::default()
        };
        let orders = self.store.list_orders(filter).await?;
        Ok(WeeklyPerformance::from_orders(week_start, &orders))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Admin operations
    // ═══════════════════════════════════════════════════════════════════════

    /// All orders, optionally in one status.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-admins.
    pub async fn list_orders(
        &self,
        actor: &Actor,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        actor.require(Role::Admin)?;
        let filter = OrderFilter {
            statuses: status.into_iter().collect(),
            ..OrderFilter::default()
        };
        Ok(self.store.list_orders(filter).await?)
    }

    /// Any order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] when it does not exist.
    pub async fn admin_order(&self, actor: &Actor, id: OrderId) -> Result<Order, OrderError> {
        actor.require(Role::Admin)?;
        self.load(id).await
    }

    /// Pre-assign a pending order to a driver. The driver still has to
    /// accept it.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] for an unknown order or driver
    /// - [`OrderError::StateConflict`] unless the order is pending
    pub async fn assign_driver(
        &self,
        actor: &Actor,
        id: OrderId,
        driver_id: UserId,
    ) -> Result<Order, OrderError> {
        actor.require(Role::Admin)?;
        if self.drivers.find_driver(driver_id).await?.is_none() {
            return Err(OrderError::NotFound {
                resource: "Driver",
                id: driver_id.get(),
            });
        }
        let order = self.load(id).await?;
        if order.status != OrderStatus::Pending {
            return Err(OrderError::StateConflict(format!(
                "Only pending orders can be assigned. Current status: {}",
                order.status
            )));
        }

        let guard = OrderGuard::status(OrderStatus::Pending);
        let updated = self.apply(id, guard, self.change().with_employer(driver_id)).await?;
        tracing::info!(order_id = %id, driver_id = %driver_id, admin_id = %actor.id, "Order assigned by admin");
        self.notifier.notify(&OrderEvent::Assigned {
            order_id: id,
            driver_id,
        });
        Ok(updated)
    }

    /// Move any order to `target`, subject to the adjacency table.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] when the order does not exist
    /// - [`OrderError::InvalidTransition`] when the table forbids the move
    /// - [`OrderError::StateConflict`] when an unassigned order would leave
    ///   pending for anything but cancelled, or the order changed underneath
    pub async fn override_status(
        &self,
        actor: &Actor,
        id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, OrderError> {
        actor.require(Role::Admin)?;
        let order = self.load(id).await?;
        ensure_transition(order.status, target)?;
        if order.status == OrderStatus::Pending
            && target != OrderStatus::Cancelled
            && order.employer_id.is_none()
        {
            // no driver could ever see or progress it again
            return Err(OrderError::StateConflict(
                "Assign a driver before moving this order out of pending.".to_string(),
            ));
        }

        let updated = self
            .apply(id, OrderGuard::status(order.status), self.change().with_status(target))
            .await?;
        self.status_changed(&order, &updated, actor);
        Ok(updated)
    }

    /// Delete an order with its items and rating.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] when it does not exist.
    pub async fn delete_order(&self, actor: &Actor, id: OrderId) -> Result<(), OrderError> {
        actor.require(Role::Admin)?;
        if !self.store.delete_order(id).await? {
            return Err(OrderError::order_not_found(id.get()));
        }
        tracing::info!(order_id = %id, admin_id = %actor.id, "Order deleted");
        Ok(())
    }

    /// Items of an order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] when the order does not exist.
    pub async fn order_items(&self, actor: &Actor, id: OrderId) -> Result<Vec<OrderItem>, OrderError> {
        Ok(self.admin_order(actor, id).await?.items)
    }

    /// A single line item.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] when the item does not exist.
    pub async fn order_item(&self, actor: &Actor, id: ItemId) -> Result<OrderItem, OrderError> {
        actor.require(Role::Admin)?;
        self.store.find_item(id).await?.ok_or(OrderError::NotFound {
            resource: "Order item",
            id: id.get(),
        })
    }

    /// Edit an item. Totals of the order are left as they were.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Validation`] for a quantity or price out of range, or overlong notes
    /// - [`OrderError::NotFound`] when the item does not exist
    pub async fn update_item(
        &self,
        actor: &Actor,
        id: ItemId,
        update: ItemUpdate,
    ) -> Result<OrderItem, OrderError> {
        actor.require(Role::Admin)?;

        let mut errors = ValidationErrors::new();
        match update.quantity {
            Some(0) => errors.add("quantity", "The quantity must be at least 1."),
            Some(q) if q > MAX_QUANTITY => errors.add(
                "quantity",
                format!("The quantity may not be greater than {MAX_QUANTITY}."),
            ),
            _ => {}
        }
        match update.price {
            Some(p) if p < Decimal::ZERO => errors.add("price", "The price must be at least 0."),
            Some(p) if p > MAX_AMOUNT => errors.add(
                "price",
                format!("The price may not be greater than {MAX_AMOUNT}."),
            ),
            _ => {}
        }
        if update
            .special_instructions
            .as_ref()
            .is_some_and(|s| s.chars().count() > MAX_INSTRUCTIONS_LEN)
        {
            errors.add(
                "special_instructions",
                format!("The special_instructions may not be greater than {MAX_INSTRUCTIONS_LEN} characters."),
            );
        }
        errors.into_result()?;

        self.store
            .update_item(id, update)
            .await?
            .ok_or(OrderError::NotFound {
                resource: "Order item",
                id: id.get(),
            })
    }

    /// Replace only an item's special instructions.
    ///
    /// # Errors
    ///
    /// As [`Self::update_item`].
    pub async fn update_special_instructions(
        &self,
        actor: &Actor,
        id: ItemId,
        special_instructions: String,
    ) -> Result<OrderItem, OrderError> {
        let update = ItemUpdate {
            special_instructions: Some(special_instructions),
            ..ItemUpdate::default()
        };
        self.update_item(actor, id, update).await
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] when it does not exist.
    pub async fn delete_item(&self, actor: &Actor, id: ItemId) -> Result<(), OrderError> {
        actor.require(Role::Admin)?;
        if self.store.delete_item(id).await? {
            Ok(())
        } else {
            Err(OrderError::NotFound {
                resource: "Order item",
                id: id.get(),
            })
        }
    }

    /// Change a driver's account status. Eligible statuses also put the
    /// driver online and available.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] for an unknown driver.
    pub async fn set_driver_status(
        &self,
        actor: &Actor,
        driver_id: UserId,
        status: DriverStatus,
    ) -> Result<DriverProfile, OrderError> {
        actor.require(Role::Admin)?;
        let profile = self
            .drivers
            .find_driver(driver_id)
            .await?
            .ok_or(OrderError::NotFound {
                resource: "Driver",
                id: driver_id.get(),
            })?;
        let saved = self.drivers.save_driver(profile.with_status(status)).await?;
        tracing::info!(driver_id = %driver_id, status = %status, "Driver status updated");
        Ok(saved)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════════

    fn change(&self) -> OrderChange {
        OrderChange::at(self.clock.now())
    }

    async fn load(&self, id: OrderId) -> Result<Order, OrderError> {
        self.store
            .find_order(id)
            .await?
            .ok_or(OrderError::order_not_found(id.get()))
    }

    async fn owned_order(
        &self,
        actor: &Actor,
        id: OrderId,
        order_type: Option<OrderType>,
    ) -> Result<Order, OrderError> {
        let order = self.load(id).await?;
        if order.customer_id != actor.id || order_type.is_some_and(|t| t != order.order_type) {
            return Err(OrderError::order_not_found(id.get()));
        }
        Ok(order)
    }

    async fn assigned_order(&self, actor: &Actor, id: OrderId) -> Result<Order, OrderError> {
        let order = self.load(id).await?;
        if !order.is_assigned_to(actor.id) {
            return Err(OrderError::order_not_found(id.get()));
        }
        Ok(order)
    }

    async fn driver_orders(
        &self,
        actor: &Actor,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>, OrderError> {
        actor.require(Role::Employer)?;
        let filter = OrderFilter {
            employer: EmployerMatch::Is(actor.id),
            statuses: statuses.to_vec(),
            ..OrderFilter::default()
        };
        Ok(self.store.list_orders(filter).await?)
    }

    async fn apply(
        &self,
        id: OrderId,
        guard: OrderGuard,
        change: OrderChange,
    ) -> Result<Order, OrderError> {
        self.store
            .update_order(id, guard, change)
            .await?
            .ok_or_else(|| OrderError::StateConflict(CONCURRENT_MODIFICATION.to_string()))
    }

    fn status_changed(&self, before: &Order, after: &Order, actor: &Actor) {
        if before.status == after.status {
            return;
        }
        metrics::counter!("courier.orders.transitions", "to" => after.status.as_str()).increment(1);
        tracing::info!(
            order_id = %after.id,
            actor_id = %actor.id,
            role = %actor.role,
            from = %before.status,
            to = %after.status,
            "Order status changed"
        );
        self.notifier.notify(&OrderEvent::StatusChanged {
            order_id: after.id,
            from: before.status,
            to: after.status,
        });
    }
}

fn ensure_cancellable(order: &Order) -> Result<(), OrderError> {
    if OrderStatus::CANCELLABLE.contains(&order.status) {
        Ok(())
    } else {
        Err(OrderError::StateConflict(format!(
            "Order cannot be cancelled at this stage. Current status: {}",
            order.status
        )))
    }
}
