//! # Courier Testing
//!
//! Testing utilities for the Courier order service.
//!
//! This crate provides:
//! - Mock implementations of the environment traits (clocks)
//! - In-memory order store, catalog, and driver directory
//! - A recording notifier
//! - Fixtures: a wired-up [`TestMarketplace`] and ready-made requests
//!
//! ## Example
//!
//! ```ignore
//! use courier_testing::{TestMarketplace, fixtures};
//!
//! #[tokio::test]
//! async fn test_order_flow() {
//!     let market = TestMarketplace::new();
//!     let created = market
//!         .service
//!         .create_order(&fixtures::customer(), fixtures::water_tank_order())
//!         .await
//!         .unwrap();
//!     assert_eq!(market.store.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use courier_core::environment::Clock;

pub mod order_mocks;

pub use order_mocks::{
    InMemoryCatalog, InMemoryDriverDirectory, InMemoryOrderStore, RecordingNotifier,
};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use courier_testing::mocks::FixedClock;
    /// use courier_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that moves forward by a fixed step on every reading.
    ///
    /// Lets tests check ordering of timestamps written by successive calls.
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: chrono::Duration,
    }

    impl SteppingClock {
        /// Start at `start`, advancing `step` per call to `now`
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: chrono::Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        #[allow(clippy::unwrap_used)] // Test infrastructure
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap();
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Ready-made actors, coordinates, and creation requests.
///
/// The store sits in central Amman; [`NEAR`] is under 2 km away and
/// [`FAR`] about 67 km.
pub mod fixtures {
    use courier_core::Actor;
    use courier_core::creation::{
        CreateOrder, CustomDeliveryRequest, CustomItemRequest, StoreItemRequest,
        StoreOrderRequest, WaterTankItemRequest, WaterTankRequest,
    };
    use courier_core::geo::GeoPoint;
    use rust_decimal::Decimal;

    /// Customer used by most tests.
    pub const CUSTOMER_ID: i64 = 100;
    /// A second customer.
    pub const OTHER_CUSTOMER_ID: i64 = 101;
    /// First eligible driver.
    pub const DRIVER_A: i64 = 200;
    /// Second eligible driver.
    pub const DRIVER_B: i64 = 201;
    /// Admin user.
    pub const ADMIN_ID: i64 = 1;
    /// Store with coordinates.
    pub const STORE_ID: i64 = 10;
    /// Store without coordinates.
    pub const UNLOCATED_STORE_ID: i64 = 11;
    /// Catalog product priced 2.50.
    pub const PRODUCT_ID: i64 = 500;

    /// Store location.
    pub const STORE: GeoPoint = GeoPoint::new(31.9539, 35.9106);
    /// Delivery point inside the radius.
    pub const NEAR: GeoPoint = GeoPoint::new(31.9650, 35.9250);
    /// Delivery point outside the radius.
    pub const FAR: GeoPoint = GeoPoint::new(32.5556, 35.8500);

    /// The default customer.
    #[must_use]
    pub const fn customer() -> Actor {
        Actor::customer(CUSTOMER_ID)
    }

    /// Driver A.
    #[must_use]
    pub const fn driver_a() -> Actor {
        Actor::driver(DRIVER_A)
    }

    /// Driver B.
    #[must_use]
    pub const fn driver_b() -> Actor {
        Actor::driver(DRIVER_B)
    }

    /// The admin.
    #[must_use]
    pub const fn admin() -> Actor {
        Actor::admin(ADMIN_ID)
    }

    /// Store order for three units of [`PRODUCT_ID`] delivered to `to`.
    #[must_use]
    pub fn store_order(to: GeoPoint) -> CreateOrder {
        CreateOrder::Store(StoreOrderRequest {
            store_id: Some(STORE_ID),
            address: Some("12 Rainbow Street".to_string()),
            latitude: Some(to.latitude),
            longitude: Some(to.longitude),
            items: Some(vec![StoreItemRequest {
                product_id: Some(PRODUCT_ID),
                quantity: Some(3),
                ..StoreItemRequest::default()
            }]),
            delivery_fee: Some(Decimal::ONE),
            payment_method: Some("cash_on_delivery".to_string()),
            phone: Some("0790000000".to_string()),
            ..StoreOrderRequest::default()
        })
    }

    /// Point-to-point delivery of one parcel.
    #[must_use]
    pub fn custom_delivery() -> CreateOrder {
        CreateOrder::CustomDelivery(CustomDeliveryRequest {
            pickup_address: Some("Abdali Mall".to_string()),
            delivery_address: Some("Sweifieh, Building 4".to_string()),
            delivery_latitude: Some(NEAR.latitude),
            delivery_longitude: Some(NEAR.longitude),
            items: Some(vec![CustomItemRequest {
                description: Some("Documents envelope".to_string()),
                quantity: Some(1),
                price: Some(Decimal::new(400, 2)),
                special_instructions: None,
            }]),
            delivery_fee: Some(Decimal::new(150, 2)),
            payment_method: Some("cash_on_delivery".to_string()),
            phone: Some("0790000001".to_string()),
            ..CustomDeliveryRequest::default()
        })
    }

    /// Water-tank order with two items: 5.00 × 2 and 3.50 × 1, fee 2.00.
    #[must_use]
    pub fn water_tank_order() -> CreateOrder {
        CreateOrder::WaterTank(WaterTankRequest {
            delivery_address: Some("Khalda, Street 8".to_string()),
            delivery_latitude: Some(NEAR.latitude),
            delivery_longitude: Some(NEAR.longitude),
            water_station_address: Some("Al-Noor Water Station".to_string()),
            items: Some(vec![
                WaterTankItemRequest {
                    custom_name: Some("Large tank".to_string()),
                    quantity: Some(2),
                    price: Some(Decimal::new(500, 2)),
                    special_instructions: None,
                },
                WaterTankItemRequest {
                    custom_name: Some("Small tank".to_string()),
                    quantity: Some(1),
                    price: Some(Decimal::new(350, 2)),
                    special_instructions: Some("Roof tank".to_string()),
                },
            ]),
            subtotal: Some(Decimal::new(1350, 2)),
            total: Some(Decimal::new(1550, 2)),
            delivery_fee: Some(Decimal::new(200, 2)),
            payment_method: Some("cash_on_delivery".to_string()),
            phone: Some("0790000002".to_string()),
            ..WaterTankRequest::default()
        })
    }
}

/// A fully wired [`OrderService`](courier_core::OrderService) over
/// in-memory collaborators.
pub mod harness {
    use crate::fixtures;
    use crate::mocks::test_clock;
    use crate::order_mocks::{
        InMemoryCatalog, InMemoryDriverDirectory, InMemoryOrderStore, RecordingNotifier,
    };
    use courier_core::OrderService;
    use courier_core::environment::Clock;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    /// Service plus handles on every collaborator.
    ///
    /// Seeded with [`fixtures::STORE_ID`], [`fixtures::UNLOCATED_STORE_ID`],
    /// [`fixtures::PRODUCT_ID`], and two active drivers.
    #[derive(Clone)]
    pub struct TestMarketplace {
        /// The service under test.
        pub service: OrderService,
        /// Order storage.
        pub store: InMemoryOrderStore,
        /// Catalog.
        pub catalog: InMemoryCatalog,
        /// Driver profiles.
        pub drivers: InMemoryDriverDirectory,
        /// Captured events.
        pub notifier: RecordingNotifier,
    }

    impl TestMarketplace {
        /// Marketplace on the fixed test clock.
        #[must_use]
        pub fn new() -> Self {
            Self::with_clock(Arc::new(test_clock()))
        }

        /// Marketplace on a caller-supplied clock.
        #[must_use]
        pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
            let store = InMemoryOrderStore::new();
            let catalog = InMemoryCatalog::new()
                .with_store(fixtures::STORE_ID, Some(fixtures::STORE))
                .with_store(fixtures::UNLOCATED_STORE_ID, None)
                .with_product(fixtures::PRODUCT_ID, Decimal::new(250, 2));
            let drivers = InMemoryDriverDirectory::new()
                .with_active_driver(fixtures::DRIVER_A)
                .with_active_driver(fixtures::DRIVER_B);
            let notifier = RecordingNotifier::new();

            let service = OrderService::new(
                Arc::new(store.clone()),
                Arc::new(catalog.clone()),
                Arc::new(drivers.clone()),
                clock,
            )
            .with_notifier(Arc::new(notifier.clone()));

            Self {
                service,
                store,
                catalog,
                drivers,
                notifier,
            }
        }
    }

    impl Default for TestMarketplace {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use courier_core::OrderStatus;
    use courier_core::geo::GeoPoint;
    use proptest::prelude::*;

    /// Any order status.
    pub fn order_status() -> impl Strategy<Value = OrderStatus> {
        proptest::sample::select(OrderStatus::ALL.to_vec())
    }

    /// Any valid coordinate pair.
    pub fn geo_point() -> impl Strategy<Value = GeoPoint> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| GeoPoint::new(lat, lng))
    }
}

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use harness::TestMarketplace;
pub use mocks::{FixedClock, SteppingClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_stepping_clock_advances() {
        let clock = SteppingClock::new(test_clock().now(), chrono::Duration::minutes(5));
        let first = clock.now();
        let second = clock.now();
        assert_eq!(second - first, chrono::Duration::minutes(5));
    }

    #[test]
    fn test_fixture_distances() {
        let near = fixtures::STORE.distance_to(&fixtures::NEAR);
        let far = fixtures::STORE.distance_to(&fixtures::FAR);
        assert!(near < 17.0, "near point is {near} km away");
        assert!(far > 17.0, "far point is {far} km away");
    }
}
