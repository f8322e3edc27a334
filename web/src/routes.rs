//! Router configuration.

use crate::handlers::{admin, customer, driver, health_check, readiness_check};
use crate::middleware::correlation_id;
use crate::state::AppState;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// - `/health`, `/ready`: probes, no identity required
/// - `/api/customer/...`: ordering, tracking, cancelling, rating
/// - `/api/driver/...`: claiming and progressing deliveries
/// - `/api/admin/...`: back-office
pub fn build_router(state: AppState) -> Router {
    let customer_routes = Router::new()
        .route(
            "/orders",
            post(customer::create_store_order).get(customer::list_orders),
        )
        .route("/orders/:id", get(customer::show_order))
        .route("/orders/:id/cancel", post(customer::cancel_order))
        .route("/orders/:id/rate", post(customer::rate_order))
        .route(
            "/custom-orders",
            post(customer::create_custom_order).get(customer::custom::list),
        )
        .route("/custom-orders/:id", get(customer::custom::show))
        .route("/custom-orders/:id/cancel", post(customer::custom::cancel))
        .route(
            "/water-tank-orders",
            post(customer::create_water_tank_order).get(customer::water_tank::list),
        )
        .route("/water-tank-orders/stats", get(customer::water_tank_stats))
        .route("/water-tank-orders/:id", get(customer::water_tank::show))
        .route(
            "/water-tank-orders/:id/cancel",
            post(customer::water_tank::cancel),
        );

    let driver_routes = Router::new()
        .route("/orders", get(driver::my_orders))
        .route("/orders/active", get(driver::active_deliveries))
        .route("/orders/available", get(driver::available_orders))
        .route("/orders/assigned", get(driver::admin_assigned_orders))
        .route("/orders/history", get(driver::delivery_history))
        .route("/orders/today", get(driver::todays_orders))
        .route("/orders/:id", get(driver::show_order))
        .route("/orders/:id/accept", post(driver::accept_order))
        .route("/orders/:id/status", put(driver::update_status))
        .route("/orders/:id/deliver", post(driver::mark_delivered))
        .route("/orders/:id/location", put(driver::update_location))
        .route("/orders/:id/cancel", post(driver::cancel_order))
        .route("/dashboard", get(driver::dashboard))
        .route("/performance", get(driver::performance))
        .route("/performance/weekly", get(driver::weekly_performance));

    let admin_routes = Router::new()
        .route("/orders", get(admin::list_orders))
        .route(
            "/orders/:id",
            get(admin::show_order).delete(admin::delete_order),
        )
        .route("/orders/:id/assign", post(admin::assign_driver))
        .route("/orders/:id/status", put(admin::override_status))
        .route("/orders/:id/items", get(admin::order_items))
        .route(
            "/order-items/:id",
            get(admin::show_item)
                .put(admin::update_item)
                .delete(admin::delete_item),
        )
        .route(
            "/order-items/:id/special-instructions",
            put(admin::update_special_instructions),
        )
        .route("/drivers/:id/status", put(admin::set_driver_status));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api/customer", customer_routes)
        .nest("/api/driver", driver_routes)
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id))
        .with_state(state)
}
