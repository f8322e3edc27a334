//! Back-office endpoints.

use crate::WebResult;
use crate::error::AppError;
use crate::extractors::{CurrentActor, JsonBody};
use crate::handlers::driver::StatusRequest;
use crate::response::{ApiResponse, ok, ok_with};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use courier_core::driver::{DriverProfile, DriverStatus};
use courier_core::store::ItemUpdate;
use courier_core::{ItemId, Order, OrderId, OrderItem, OrderStatus, UserId, ValidationErrors};
use serde::Deserialize;

type OrderResponse = WebResult<Json<ApiResponse<Order>>>;

/// Optional `?status=` filter.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Restrict to one status.
    pub status: Option<OrderStatus>,
}

/// Body of `POST /orders/:id/assign`.
#[derive(Debug, Default, Deserialize)]
pub struct AssignRequest {
    /// Driver to pre-assign.
    pub driver_id: Option<i64>,
}

/// Body of `PUT /order-items/:id/special-instructions`.
#[derive(Debug, Default, Deserialize)]
pub struct InstructionsRequest {
    /// New handling notes.
    pub special_instructions: Option<String>,
}

/// Body of `PUT /drivers/:id/status`.
#[derive(Debug, Default, Deserialize)]
pub struct DriverStatusRequest {
    /// New account status.
    pub status: Option<String>,
}

/// `GET /api/admin/orders`
pub async fn list_orders(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<StatusQuery>,
) -> WebResult<Json<ApiResponse<Vec<Order>>>> {
    Ok(ok(state.orders.list_orders(&actor, query.status).await?))
}

/// `GET /api/admin/orders/:id`
pub async fn show_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> OrderResponse {
    Ok(ok(state.orders.admin_order(&actor, OrderId::new(id)).await?))
}

/// `POST /api/admin/orders/:id/assign`
pub async fn assign_driver(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<AssignRequest>,
) -> OrderResponse {
    let driver_id = request.driver_id.ok_or_else(|| {
        AppError::validation(ValidationErrors::single(
            "driver_id",
            "The driver id field is required.",
        ))
    })?;
    let order = state
        .orders
        .assign_driver(&actor, OrderId::new(id), UserId::new(driver_id))
        .await?;
    Ok(ok_with("Driver assigned successfully", order))
}

/// `PUT /api/admin/orders/:id/status`
pub async fn override_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<StatusRequest>,
) -> OrderResponse {
    let target = request.target()?;
    let order = state
        .orders
        .override_status(&actor, OrderId::new(id), target)
        .await?;
    Ok(ok_with("Order status updated successfully", order))
}

/// `DELETE /api/admin/orders/:id`
pub async fn delete_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> WebResult<Json<ApiResponse<()>>> {
    state.orders.delete_order(&actor, OrderId::new(id)).await?;
    Ok(ok_with("Order deleted successfully", ()))
}

/// `GET /api/admin/orders/:id/items`
pub async fn order_items(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> WebResult<Json<ApiResponse<Vec<OrderItem>>>> {
    Ok(ok(state.orders.order_items(&actor, OrderId::new(id)).await?))
}

/// `GET /api/admin/order-items/:id`
pub async fn show_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> WebResult<Json<ApiResponse<OrderItem>>> {
    Ok(ok(state.orders.order_item(&actor, ItemId::new(id)).await?))
}

/// `PUT /api/admin/order-items/:id`
pub async fn update_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(update): JsonBody<ItemUpdate>,
) -> WebResult<Json<ApiResponse<OrderItem>>> {
    let item = state
        .orders
        .update_item(&actor, ItemId::new(id), update)
        .await?;
    Ok(ok_with("Order item updated successfully", item))
}

/// `PUT /api/admin/order-items/:id/special-instructions`
pub async fn update_special_instructions(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<InstructionsRequest>,
) -> WebResult<Json<ApiResponse<OrderItem>>> {
    let notes = request.special_instructions.ok_or_else(|| {
        AppError::validation(ValidationErrors::single(
            "special_instructions",
            "The special instructions field is required.",
        ))
    })?;
    let item = state
        .orders
        .update_special_instructions(&actor, ItemId::new(id), notes)
        .await?;
    Ok(ok_with("Special instructions updated successfully", item))
}

/// `DELETE /api/admin/order-items/:id`
pub async fn delete_item(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> WebResult<Json<ApiResponse<()>>> {
    state.orders.delete_item(&actor, ItemId::new(id)).await?;
    Ok(ok_with("Order item deleted successfully", ()))
}

/// `PUT /api/admin/drivers/:id/status`
pub async fn set_driver_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<DriverStatusRequest>,
) -> WebResult<Json<ApiResponse<DriverProfile>>> {
    let status = request
        .status
        .as_deref()
        .and_then(DriverStatus::parse)
        .ok_or_else(|| {
            AppError::validation(ValidationErrors::single(
                "status",
                "The selected status is invalid.",
            ))
        })?;
    let driver = state
        .orders
        .set_driver_status(&actor, UserId::new(id), status)
        .await?;
    Ok(ok_with("Driver status updated successfully", driver))
}
