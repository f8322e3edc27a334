//! Error responses.
//!
//! Every failure leaves the service as a JSON body of the form
//!
//! ```json
//! { "success": false, "code": "VALIDATION_ERROR", "message": "...", "errors": { "phone": ["..."] } }
//! ```
//!
//! [`AppError`] maps each [`OrderError`] kind to an HTTP status code and a
//! stable machine-readable code.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use courier_core::{OrderError, ValidationErrors};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Order>, AppError> {
///     let order = state.orders.admin_order(&actor, id).await?;
///     Ok(Json(order))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    errors: Option<ValidationErrors>,
    distance: Option<f64>,
    /// Internal cause, logged and never sent to the client.
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            errors: None,
            distance: None,
            source: None,
        }
    }

    /// Attach an internal cause.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 422 with a field-level error map. The message is the first field error.
    #[must_use]
    pub fn validation(errors: ValidationErrors) -> Self {
        let message = errors
            .first_message()
            .unwrap_or("The given data was invalid.")
            .to_string();
        Self {
            errors: Some(errors),
            ..Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
        }
    }

    /// 500 with a generic client message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            message,
        )
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(errors) => Self::validation(errors),
            OrderError::DistanceExceeded { distance_km, .. } => Self {
                distance: Some(round2(distance_km)),
                ..Self::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "DISTANCE_EXCEEDED",
                    err.to_string(),
                )
            },
            OrderError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
            }
            OrderError::Forbidden(message) => {
                Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
            }
            OrderError::StateConflict(message) => {
                Self::new(StatusCode::CONFLICT, "CONFLICT", message)
            }
            OrderError::InvalidTransition { .. } => {
                Self::new(StatusCode::CONFLICT, "INVALID_TRANSITION", err.to_string())
            }
            OrderError::AlreadyRated => {
                Self::new(StatusCode::BAD_REQUEST, "ALREADY_RATED", err.to_string())
            }
            OrderError::MissingStore => {
                Self::new(StatusCode::BAD_REQUEST, "MISSING_STORE", err.to_string())
            }
            OrderError::Persistence(_) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(err))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(ValidationErrors::single("body", rejection.body_text()))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<f64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Internal server error"
                ),
            }
        }
        metrics::counter!("courier.http.errors", "code" => self.code).increment(1);

        let body = ErrorBody {
            success: false,
            code: self.code,
            message: self.message,
            errors: self.errors,
            distance: self.distance,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::OrderStatus;

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn test_order_errors_map_to_status_codes() {
        let cases = [
            (
                OrderError::Validation(ValidationErrors::single("phone", "required")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                OrderError::DistanceExceeded {
                    distance_km: 20.0,
                    max_km: 17.0,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (OrderError::order_not_found(1), StatusCode::NOT_FOUND),
            (OrderError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (
                OrderError::StateConflict("taken".into()),
                StatusCode::CONFLICT,
            ),
            (
                OrderError::InvalidTransition {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Pending,
                },
                StatusCode::CONFLICT,
            ),
            (OrderError::AlreadyRated, StatusCode::BAD_REQUEST),
            (OrderError::MissingStore, StatusCode::BAD_REQUEST),
            (
                OrderError::Persistence("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_persistence_details_stay_internal() {
        let err = AppError::from(OrderError::Persistence("password=hunter2".into()));
        assert_eq!(err.to_string(), "[INTERNAL_SERVER_ERROR] An internal error occurred");
    }

    #[test]
    fn test_distance_is_rounded_for_display() {
        let err = AppError::from(OrderError::DistanceExceeded {
            distance_km: 18.456,
            max_km: 17.0,
        });
        assert_eq!(err.code(), "DISTANCE_EXCEEDED");
        assert_eq!(err.distance, Some(18.46));
    }
}
