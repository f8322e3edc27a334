//! Driver endpoints: claiming, progressing and tracking deliveries, plus
//! the driver's own reports.

use crate::WebResult;
use crate::error::AppError;
use crate::extractors::{CurrentActor, JsonBody};
use crate::response::{ApiResponse, ok, ok_with};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use courier_core::stats::{DriverDashboard, PerformanceStats, WeeklyPerformance};
use courier_core::{Order, OrderId, OrderStatus, ValidationErrors};
use serde::Deserialize;

type OrderResponse = WebResult<Json<ApiResponse<Order>>>;
type OrdersResponse = WebResult<Json<ApiResponse<Vec<Order>>>>;

/// Body of `PUT /orders/:id/status`.
#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    /// Target status, in its storage spelling.
    pub status: Option<String>,
}

impl StatusRequest {
    /// Parse the requested status, or report it as a field error.
    ///
    /// # Errors
    ///
    /// Returns a 422 when the status is missing or unknown.
    pub fn target(&self) -> Result<OrderStatus, AppError> {
        let Some(raw) = self.status.as_deref() else {
            return Err(AppError::validation(ValidationErrors::single(
                "status",
                "The status field is required.",
            )));
        };
        OrderStatus::parse(raw).ok_or_else(|| {
            AppError::validation(ValidationErrors::single(
                "status",
                "The selected status is invalid.",
            ))
        })
    }
}

/// Body of `PUT /orders/:id/location`.
#[derive(Debug, Default, Deserialize)]
pub struct LocationRequest {
    /// Current latitude.
    pub latitude: Option<f64>,
    /// Current longitude.
    pub longitude: Option<f64>,
}

/// `GET /api/driver/orders`
pub async fn my_orders(State(state): State<AppState>, CurrentActor(actor): CurrentActor) -> OrdersResponse {
    Ok(ok(state.orders.my_orders(&actor).await?))
}

/// `GET /api/driver/orders/active`
pub async fn active_deliveries(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> OrdersResponse {
    Ok(ok(state.orders.active_deliveries(&actor).await?))
}

/// `GET /api/driver/orders/available`
pub async fn available_orders(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> OrdersResponse {
    Ok(ok(state.orders.available_orders(&actor).await?))
}

/// `GET /api/driver/orders/assigned`
pub async fn admin_assigned_orders(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> OrdersResponse {
    Ok(ok(state.orders.admin_assigned_orders(&actor).await?))
}

/// `GET /api/driver/orders/history`
pub async fn delivery_history(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> OrdersResponse {
    Ok(ok(state.orders.delivery_history(&actor).await?))
}

/// `GET /api/driver/orders/today`
pub async fn todays_orders(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> OrdersResponse {
    Ok(ok(state.orders.todays_orders(&actor).await?))
}

/// `GET /api/driver/orders/:id`
pub async fn show_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> OrderResponse {
    Ok(ok(state.orders.driver_order(&actor, OrderId::new(id)).await?))
}

/// `POST /api/driver/orders/:id/accept`
pub async fn accept_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> OrderResponse {
    let order = state.orders.accept_order(&actor, OrderId::new(id)).await?;
    Ok(ok_with("Order accepted successfully", order))
}

/// `PUT /api/driver/orders/:id/status`
pub async fn update_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<StatusRequest>,
) -> OrderResponse {
    let target = request.target()?;
    let order = state
        .orders
        .transition(&actor, OrderId::new(id), target)
        .await?;
    Ok(ok_with("Order status updated successfully", order))
}

/// `POST /api/driver/orders/:id/deliver`
pub async fn mark_delivered(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> OrderResponse {
    let order = state.orders.mark_delivered(&actor, OrderId::new(id)).await?;
    Ok(ok_with("Order marked as delivered", order))
}

/// `PUT /api/driver/orders/:id/location`
pub async fn update_location(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
    JsonBody(request): JsonBody<LocationRequest>,
) -> OrderResponse {
    let mut errors = ValidationErrors::new();
    if request.latitude.is_none() {
        errors.add("latitude", "The latitude field is required.");
    }
    if request.longitude.is_none() {
        errors.add("longitude", "The longitude field is required.");
    }
    let (Some(latitude), Some(longitude)) = (request.latitude, request.longitude) else {
        return Err(AppError::validation(errors));
    };

    let order = state
        .orders
        .update_location(&actor, OrderId::new(id), latitude, longitude)
        .await?;
    Ok(ok_with("Location updated successfully", order))
}

/// `POST /api/driver/orders/:id/cancel`
pub async fn cancel_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<i64>,
) -> OrderResponse {
    let order = state.orders.cancel_by_driver(&actor, OrderId::new(id)).await?;
    Ok(ok_with("Order cancelled successfully", order))
}

/// `GET /api/driver/dashboard`
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> WebResult<Json<ApiResponse<DriverDashboard>>> {
    Ok(ok(state.orders.driver_dashboard(&actor).await?))
}

/// `GET /api/driver/performance`
pub async fn performance(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> WebResult<Json<ApiResponse<PerformanceStats>>> {
    Ok(ok(state.orders.performance_stats(&actor).await?))
}

/// `GET /api/driver/performance/weekly`
pub async fn weekly_performance(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> WebResult<Json<ApiResponse<WeeklyPerformance>>> {
    Ok(ok(state.orders.weekly_performance(&actor).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn status_request_parses_known_statuses() {
        let request = StatusRequest {
            status: Some("on_the_way".to_string()),
        };
        assert_eq!(request.target().unwrap(), OrderStatus::OnTheWay);
    }

    #[test]
    fn status_request_rejects_unknown_or_missing() {
        for status in [None, Some("shipped".to_string())] {
            let err = StatusRequest { status }.target().unwrap_err();
            assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }
}
