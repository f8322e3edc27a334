//! # Courier Core
//!
//! Domain model and order lifecycle for a multi-service delivery marketplace.
//!
//! Customers place store orders, custom deliveries, and water-tank orders;
//! drivers (employers) claim pending orders and advance them through the
//! fulfilment lifecycle; customers rate delivered store orders.
//!
//! ## Core Concepts
//!
//! - **Order**: The aggregate, with its line items and milestone timestamps
//! - **Lifecycle**: The status adjacency table every transition is checked against
//! - **Store**: Persistence behind a compare-and-set update primitive
//! - **Service**: [`OrderService`], the operations exposed to customers, drivers, and admins
//! - **Environment**: Injected collaborators (store, catalog, driver directory, clock)
//!
//! ## Concurrency
//!
//! Every state-changing write is a conditional update evaluated atomically by
//! the store ([`store::OrderStore::update_order`]). Two drivers racing to
//! claim one order cannot both win: exactly one update matches the
//! `pending`-and-unassigned guard.
//!
//! ## Example
//!
//! ```ignore
//! use courier_core::*;
//!
//! let service = OrderService::new(store, catalog, drivers, Arc::new(SystemClock));
//! let created = service.create_order(&Actor::customer(1), request).await?;
//! let claimed = service.accept_order(&Actor::driver(7), created.order.id).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actor;
pub mod catalog;
pub mod creation;
pub mod driver;
pub mod error;
pub mod geo;
pub mod lifecycle;
pub mod notify;
pub mod order;
pub mod service;
pub mod stats;
pub mod store;

pub use actor::{Actor, Role};
pub use error::{OrderError, StoreError, ValidationErrors};
pub use geo::GeoPoint;
pub use lifecycle::OrderStatus;
pub use order::{ItemId, Order, OrderId, OrderItem, OrderType, Rating, StoreId, UserId};
pub use service::{CreatedOrder, OrderService, OrderSettings};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use rust_decimal::Decimal;

/// Environment module - Injected dependencies
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use environment::{Clock, SystemClock};
