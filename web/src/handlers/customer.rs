//! Customer endpoints: placing, tracking, cancelling and rating orders.
//!
//! The three order types share the list/show/cancel handlers; the per-type
//! routes pin the order type so a water-tank id is not visible under
//! `/custom-orders`.

use crate::WebResult;
use crate::extractors::{CurrentActor, JsonBody};
use crate::response::{ApiResponse, created, ok, ok_with};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use courier_core::creation::{
    CreateOrder, CustomDeliveryRequest, StoreOrderRequest, WaterTankRequest,
};
use courier_core::service::RatingRequest;
use courier_core::stats::WaterTankStats;
use courier_core::{CreatedOrder, Order, OrderId, OrderType, Rating};
use serde::Deserialize;

/// Optional `?order_type=` filter.
#[derive(Debug, Default, Deserialize)]
pub struct OrderTypeQuery {
    /// Restrict to one order type.
    pub order_type: Option<OrderType>,
}

type Created = (StatusCode, Json<ApiResponse<CreatedOrder>>);

/// `POST /api/customer/orders`
pub async fn create_store_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(request): JsonBody<StoreOrderRequest>,
) -> WebResult<Created> {
    let order = state
        .orders
        .create_order(&actor, CreateOrder::Store(request))
        .await?;
    Ok(created("Order placed successfully", order))
}

/// `POST /api/customer/custom-orders`
pub async fn create_custom_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(request): JsonBody<CustomDeliveryRequest>,
) -> WebResult<Created> {
    let order = state
        .orders
        .create_order(&actor, CreateOrder::CustomDelivery(request))
        .await?;
    Ok(created("Custom order created successfully", order))
}

/// `POST /api/customer/water-tank-orders`
pub async fn create_water_tank_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    JsonBody(request): JsonBody<WaterTankRequest>,
) -> WebResult<Created> {
    let order = state
        .orders
        .create_order(&actor, CreateOrder::WaterTank(request))
        .await?;
    Ok(created("Water tank order created successfully", order))
}

/// `GET /api/customer/orders`
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<OrderTypeQuery>,
) -> WebResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state
        .orders
        .list_customer_orders(&actor, query.order_type)
        .await?;
    Ok(ok(orders))
}

/// `GET /api/customer/orders/:id`
pub async fn show_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> WebResult<Json<ApiResponse<Order>>> {
    let order = state
        .orders
        .customer_order(&actor, OrderId::new(id), None)
        .await?;
    Ok(ok(order))
}

/// `POST /api/customer/orders/:id/cancel`
pub async fn cancel_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> WebResult<Json<ApiResponse<Order>>> {
    let order = state
        .orders
        .cancel_by_customer(&actor, OrderId::new(id), None)
        .await?;
    Ok(ok_with("Order cancelled successfully", order))
}

/// `POST /api/customer/orders/:id/rate`
pub async fn rate_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<RatingRequest>,
) -> WebResult<(StatusCode, Json<ApiResponse<Rating>>)> {
    let rating = state
        .orders
        .rate_order(&actor, OrderId::new(id), request)
        .await?;
    Ok(created("Thank you for your rating!", rating))
}

/// Handlers pinned to one order type.
macro_rules! typed_views {
    ($module:ident, $order_type:expr) => {
        #[doc = concat!("List, show and cancel for `", stringify!($module), "` orders.")]
        pub mod $module {
            use super::*;

            /// List own orders of this type.
            pub async fn list(
                State(state): State<AppState>,
                CurrentActor(actor): CurrentActor,
            ) -> WebResult<Json<ApiResponse<Vec<Order>>>> {
                let orders = state
                    .orders
                    .list_customer_orders(&actor, Some($order_type))
                    .await?;
                Ok(ok(orders))
            }

            /// Show an own order of this type.
            pub async fn show(
                State(state): State<AppState>,
                CurrentActor(actor): CurrentActor,
                Path(id): Path<i64>,
            ) -> WebResult<Json<ApiResponse<Order>>> {
                let order = state
                    .orders
                    .customer_order(&actor, OrderId::new(id), Some($order_type))
                    .await?;
                Ok(ok(order))
            }

            /// Cancel an own order of this type.
            pub async fn cancel(
                State(state): State<AppState>,
                CurrentActor(actor): CurrentActor,
                Path(id): Path<i64>,
            ) -> WebResult<Json<ApiResponse<Order>>> {
                let order = state
                    .orders
                    .cancel_by_customer(&actor, OrderId::new(id), Some($order_type))
                    .await?;
                Ok(ok_with("Order cancelled successfully", order))
            }
        }
    };
}

typed_views!(custom, OrderType::CustomDelivery);
typed_views!(water_tank, OrderType::WaterTank);

/// `GET /api/customer/water-tank-orders/stats`
pub async fn water_tank_stats(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> WebResult<Json<ApiResponse<WaterTankStats>>> {
    Ok(ok(state.orders.water_tank_stats(&actor).await?))
}
