//! Ratings, driver dashboards, and the admin back office.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect
#![allow(clippy::panic)] // Tests can panic

use courier_core::creation::CreateOrder;
use courier_core::driver::DriverStatus;
use courier_core::environment::Clock;
use courier_core::service::RatingRequest;
use courier_core::store::ItemUpdate;
use courier_core::{Decimal, ItemId, OrderError, OrderId, OrderStatus, UserId};
use courier_testing::fixtures::{
    self, NEAR, admin, custom_delivery, customer, driver_a, driver_b, store_order,
    water_tank_order,
};
use courier_testing::{SteppingClock, TestMarketplace, test_clock};
use std::sync::Arc;

async fn place(market: &TestMarketplace, request: CreateOrder) -> OrderId {
    market
        .service
        .create_order(&customer(), request)
        .await
        .unwrap()
        .order
        .id
}

async fn deliver(market: &TestMarketplace, id: OrderId) {
    let driver = driver_a();
    market.service.accept_order(&driver, id).await.unwrap();
    for next in [OrderStatus::Preparing, OrderStatus::OnTheWay] {
        market.service.transition(&driver, id, next).await.unwrap();
    }
    market.service.mark_delivered(&driver, id).await.unwrap();
}

fn five_stars() -> RatingRequest {
    RatingRequest {
        rating: Some(5),
        review: Some("Fast and friendly".to_string()),
    }
}

#[tokio::test]
async fn test_delivered_store_order_is_rated_once() {
    let market = TestMarketplace::new();
    let id = place(&market, store_order(NEAR)).await;
    deliver(&market, id).await;

    let rating = market
        .service
        .rate_order(&customer(), id, five_stars())
        .await
        .unwrap();
    assert_eq!(rating.rating, 5);
    assert_eq!(rating.store_id.get(), fixtures::STORE_ID);

    let again = market
        .service
        .rate_order(&customer(), id, five_stars())
        .await
        .unwrap_err();
    assert!(matches!(again, OrderError::AlreadyRated));
    assert_eq!(again.to_string(), "You have already rated this order.");

    assert_eq!(market.store.rating_count(), 1);
    let order = market.store.get(id).unwrap();
    assert_eq!(order.rating, Some(5));
    assert_eq!(order.review.as_deref(), Some("Fast and friendly"));
}

#[tokio::test]
async fn test_undelivered_orders_cannot_be_rated() {
    let market = TestMarketplace::new();
    let id = place(&market, store_order(NEAR)).await;

    for step in [None, Some(OrderStatus::Confirmed), Some(OrderStatus::Preparing)] {
        match step {
            None => {}
            Some(OrderStatus::Confirmed) => {
                market.service.accept_order(&driver_a(), id).await.unwrap();
            }
            Some(next) => {
                market.service.transition(&driver_a(), id, next).await.unwrap();
            }
        }
        let err = market
            .service
            .rate_order(&customer(), id, five_stars())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::StateConflict(_)));
    }
    assert_eq!(market.store.rating_count(), 0);
}

#[tokio::test]
async fn test_rating_requires_a_store() {
    let market = TestMarketplace::new();
    let id = place(&market, custom_delivery()).await;
    deliver(&market, id).await;

    let err = market
        .service
        .rate_order(&customer(), id, five_stars())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::MissingStore));
}

#[tokio::test]
async fn test_rating_is_scoped_and_validated() {
    let market = TestMarketplace::new();
    let id = place(&market, store_order(NEAR)).await;
    deliver(&market, id).await;

    let stranger = courier_core::Actor::customer(fixtures::OTHER_CUSTOMER_ID);
    let err = market
        .service
        .rate_order(&stranger, id, five_stars())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::NotFound { .. }));

    for score in [Some(0), Some(6), None] {
        let err = market
            .service
            .rate_order(
                &customer(),
                id,
                RatingRequest {
                    rating: score,
                    review: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Validation(ref e) if e.contains("rating")));
    }

    let long_review = RatingRequest {
        rating: Some(4),
        review: Some("x".repeat(501)),
    };
    let err = market
        .service
        .rate_order(&customer(), id, long_review)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::Validation(ref e) if e.contains("review")));
    assert_eq!(market.store.rating_count(), 0);
}

#[tokio::test]
async fn test_available_orders_show_open_pool_and_own_preassignments() {
    let market = TestMarketplace::new();
    let service = &market.service;
    let open = place(&market, water_tank_order()).await;
    let mine = place(&market, water_tank_order()).await;
    let theirs = place(&market, water_tank_order()).await;
    service.assign_driver(&admin(), mine, driver_a().id).await.unwrap();
    service.assign_driver(&admin(), theirs, driver_b().id).await.unwrap();

    let mut available: Vec<OrderId> = service
        .available_orders(&driver_a())
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    available.sort();
    assert_eq!(available, vec![open, mine]);

    let assigned = service.admin_assigned_orders(&driver_a()).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].id, mine);

    assert!(service.driver_order(&driver_a(), open).await.is_ok());
    assert!(service.driver_order(&driver_a(), mine).await.is_ok());
    assert!(matches!(
        service.driver_order(&driver_a(), theirs).await.unwrap_err(),
        OrderError::NotFound { .. }
    ));
}

#[tokio::test]
async fn test_driver_views_and_dashboard() {
    let market = TestMarketplace::new();
    let service = &market.service;
    let driver = driver_a();

    let delivered = place(&market, water_tank_order()).await;
    deliver(&market, delivered).await;

    let active = place(&market, water_tank_order()).await;
    service.accept_order(&driver, active).await.unwrap();

    let cancelled = place(&market, water_tank_order()).await;
    service.accept_order(&driver, cancelled).await.unwrap();
    service.cancel_by_driver(&driver, cancelled).await.unwrap();

    assert_eq!(service.my_orders(&driver).await.unwrap().len(), 3);
    let in_flight = service.active_deliveries(&driver).await.unwrap();
    assert_eq!(in_flight.len(), 1);
    assert_eq!(in_flight[0].id, active);
    assert_eq!(service.delivery_history(&driver).await.unwrap().len(), 2);
    assert_eq!(service.todays_orders(&driver).await.unwrap().len(), 3);
    assert!(service.my_orders(&driver_b()).await.unwrap().is_empty());

    let dashboard = service.driver_dashboard(&driver).await.unwrap();
    assert_eq!(dashboard.total_orders, 3);
    assert_eq!(dashboard.active_orders, 1);
    assert_eq!(dashboard.completed_orders, 1);
    assert_eq!(dashboard.cancelled_orders, 1);

    let perf = service.performance_stats(&driver).await.unwrap();
    assert_eq!(perf.total_deliveries, 1);
    assert_eq!(perf.total_assigned_orders, 3);
    assert!((perf.completion_rate - 33.33).abs() < 1e-9);
    // the fixed clock never moves
    assert_eq!(perf.average_delivery_minutes, Some(0));

    let weekly = service.weekly_performance(&driver).await.unwrap();
    assert_eq!(weekly.week_start.to_string(), "2024-12-30");
    assert_eq!(weekly.week_end.to_string(), "2025-01-05");
    assert_eq!(weekly.total_orders, 3);
    assert_eq!(weekly.delivered_orders, 1);
    assert_eq!(weekly.cancelled_orders, 1);
}

#[tokio::test]
async fn test_average_delivery_time_uses_assignment_and_delivery_stamps() {
    let clock = SteppingClock::new(test_clock().now(), chrono::Duration::minutes(10));
    let market = TestMarketplace::with_clock(Arc::new(clock));
    let id = place(&market, water_tank_order()).await;
    // accept, preparing, on the way, delivered: 30 minutes from accept to delivery
    deliver(&market, id).await;

    let perf = market.service.performance_stats(&driver_a()).await.unwrap();
    assert_eq!(perf.average_delivery_minutes, Some(30));
    assert!((perf.completion_rate - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_admin_assignment_is_pending_only() {
    let market = TestMarketplace::new();
    let service = &market.service;
    let id = place(&market, water_tank_order()).await;

    let order = service.assign_driver(&admin(), id, driver_b().id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.employer_id, Some(driver_b().id));
    assert_eq!(order.milestones.assigned_at, Some(test_clock().now()));

    // reassignment while still pending is allowed
    service.assign_driver(&admin(), id, driver_a().id).await.unwrap();
    service.accept_order(&driver_a(), id).await.unwrap();

    let err = service
        .assign_driver(&admin(), id, driver_b().id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::StateConflict(_)));

    let unknown = service
        .assign_driver(&admin(), id, UserId::new(9_999))
        .await
        .unwrap_err();
    assert!(matches!(unknown, OrderError::NotFound { resource: "Driver", .. }));
}

#[tokio::test]
async fn test_admin_override_follows_the_table() {
    let market = TestMarketplace::new();
    let service = &market.service;
    let id = place(&market, water_tank_order()).await;

    let err = service
        .override_status(&admin(), id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Delivered
        }
    ));

    let unassigned = service
        .override_status(&admin(), id, OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(unassigned, OrderError::StateConflict(_)));
    assert_eq!(market.store.get(id).unwrap().status, OrderStatus::Pending);

    service.assign_driver(&admin(), id, driver_a().id).await.unwrap();
    let order = service
        .override_status(&admin(), id, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.employer_id, Some(driver_a().id));
    assert!(order.milestones.confirmed_at.is_some());

    let not_admin = service
        .override_status(&driver_a(), id, OrderStatus::Preparing)
        .await
        .unwrap_err();
    assert!(matches!(not_admin, OrderError::Forbidden(_)));
}

#[tokio::test]
async fn test_admin_can_cancel_an_unassigned_order() {
    let market = TestMarketplace::new();
    let id = place(&market, water_tank_order()).await;

    let order = market
        .service
        .override_status(&admin(), id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert!(order.employer_id.is_none());
}

#[tokio::test]
async fn test_admin_lists_and_deletes_orders() {
    let market = TestMarketplace::new();
    let service = &market.service;
    let pending = place(&market, water_tank_order()).await;
    let confirmed = place(&market, custom_delivery()).await;
    service.accept_order(&driver_a(), confirmed).await.unwrap();

    assert_eq!(service.list_orders(&admin(), None).await.unwrap().len(), 2);
    let only_pending = service
        .list_orders(&admin(), Some(OrderStatus::Pending))
        .await
        .unwrap();
    assert_eq!(only_pending.len(), 1);
    assert_eq!(only_pending[0].id, pending);

    service.delete_order(&admin(), pending).await.unwrap();
    assert!(market.store.get(pending).is_none());
    let again = service.delete_order(&admin(), pending).await.unwrap_err();
    assert!(matches!(again, OrderError::NotFound { .. }));
    let missing = service.admin_order(&admin(), pending).await.unwrap_err();
    assert!(matches!(missing, OrderError::NotFound { .. }));
}

#[tokio::test]
async fn test_admin_edits_items() {
    let market = TestMarketplace::new();
    let service = &market.service;
    let id = place(&market, water_tank_order()).await;
    let items = service.order_items(&admin(), id).await.unwrap();
    let first = items[0].id;
    let second = items[1].id;

    let updated = service
        .update_item(
            &admin(),
            first,
            ItemUpdate {
                quantity: Some(4),
                price: Some(Decimal::new(600, 2)),
                special_instructions: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.quantity, 4);
    assert_eq!(updated.price, Decimal::new(600, 2));

    let noted = service
        .update_special_instructions(&admin(), first, "Leave by the gate".to_string())
        .await
        .unwrap();
    assert_eq!(noted.special_instructions.as_deref(), Some("Leave by the gate"));
    assert_eq!(noted.quantity, 4);

    let shown = service.order_item(&admin(), first).await.unwrap();
    assert_eq!(shown.order_id, id);
    assert_eq!(shown.special_instructions.as_deref(), Some("Leave by the gate"));
    let not_admin = service.order_item(&driver_a(), first).await.unwrap_err();
    assert!(matches!(not_admin, OrderError::Forbidden(_)));

    let oversized = service
        .update_item(
            &admin(),
            first,
            ItemUpdate {
                quantity: Some(u32::MAX),
                price: Some(Decimal::MAX),
                special_instructions: None,
            },
        )
        .await
        .unwrap_err();
    match oversized {
        OrderError::Validation(errors) => {
            assert!(errors.contains("quantity"));
            assert!(errors.contains("price"));
        }
        other => panic!("expected validation error, got {other}"),
    }

    let invalid = service
        .update_item(
            &admin(),
            first,
            ItemUpdate {
                quantity: Some(0),
                price: Some(Decimal::new(-1, 0)),
                special_instructions: None,
            },
        )
        .await
        .unwrap_err();
    match invalid {
        OrderError::Validation(errors) => {
            assert!(errors.contains("quantity"));
            assert!(errors.contains("price"));
        }
        other => panic!("expected validation error, got {other}"),
    }

    service.delete_item(&admin(), second).await.unwrap();
    assert_eq!(service.order_items(&admin(), id).await.unwrap().len(), 1);
    let gone = service.delete_item(&admin(), second).await.unwrap_err();
    assert!(matches!(gone, OrderError::NotFound { resource: "Order item", .. }));
    let unseen = service.order_item(&admin(), second).await.unwrap_err();
    assert!(matches!(unseen, OrderError::NotFound { resource: "Order item", .. }));
    let missing = service
        .update_item(&admin(), ItemId::new(9_999), ItemUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(missing, OrderError::NotFound { .. }));
}

#[tokio::test]
async fn test_driver_status_controls_eligibility() {
    let market = TestMarketplace::new();
    let service = &market.service;
    let driver_id = driver_a().id;

    let suspended = service
        .set_driver_status(&admin(), driver_id, DriverStatus::Suspended)
        .await
        .unwrap();
    assert!(!suspended.is_online && !suspended.is_available);

    let approved = service
        .set_driver_status(&admin(), driver_id, DriverStatus::Approved)
        .await
        .unwrap();
    assert!(approved.can_accept_orders());
    assert_eq!(market.drivers.get(fixtures::DRIVER_A), Some(approved));

    let unknown = service
        .set_driver_status(&admin(), UserId::new(9_999), DriverStatus::Active)
        .await
        .unwrap_err();
    assert!(matches!(unknown, OrderError::NotFound { .. }));
}

#[tokio::test]
async fn test_readiness_ping_reports_store_outage() {
    let market = TestMarketplace::new();
    assert!(market.service.ping().await.is_ok());

    market.store.set_offline(true);
    assert!(matches!(
        market.service.ping().await.unwrap_err(),
        OrderError::Persistence(_)
    ));
}
