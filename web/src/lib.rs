//! Axum HTTP surface for the Courier order service.
//!
//! Handlers are thin: they extract the caller and the request body, call one
//! [`OrderService`](courier_core::OrderService) operation, and wrap the result
//! in the JSON envelope.
//!
//! # Request Flow
//!
//! 1. **Correlate**: the middleware tags the request with a correlation id
//! 2. **Identify**: [`CurrentActor`] reads the caller from gateway headers
//! 3. **Extract** path, query and JSON body
//! 4. **Run** the service operation
//! 5. **Map** the result to `{"success": true, "data": ...}` or an [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use courier_web::{AppState, build_router};
//!
//! let app = build_router(AppState::new(order_service));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use extractors::{CorrelationId, CurrentActor, JsonBody, USER_ID_HEADER, USER_ROLE_HEADER};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id};
pub use response::ApiResponse;
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
