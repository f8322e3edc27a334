//! Custom Axum extractors.
//!
//! - [`CurrentActor`]: the authenticated caller, as asserted by the gateway
//! - [`CorrelationId`]: the request correlation id
//! - [`JsonBody`]: JSON body whose rejections become validation errors
//!
//! Authentication happens upstream. The gateway forwards the verified user
//! id and role in the [`USER_ID_HEADER`] and [`USER_ROLE_HEADER`] headers and
//! this service trusts them.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use courier_core::{Actor, Role, UserId};
use uuid::Uuid;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the authenticated user role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The authenticated caller.
///
/// Rejects with 401 when either header is missing or malformed.
///
/// # Example
///
/// ```ignore
/// async fn handler(CurrentActor(actor): CurrentActor) -> String {
///     format!("{} {}", actor.role, actor.id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(Self)
    }
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let id = header(USER_ID_HEADER)
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::unauthorized("Unauthenticated."))?;
    let role = header(USER_ROLE_HEADER)
        .and_then(|s| Role::parse(s.trim()))
        .ok_or_else(|| AppError::unauthorized("Unauthenticated."))?;

    Ok(Actor::new(UserId::new(id), role))
}

/// Correlation ID for request tracing.
///
/// Reads the id stored by
/// [`correlation_id`](crate::middleware::correlation_id), then the
/// `X-Correlation-ID` header, and generates a new one as a last resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Resolve from a request's headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let id = headers
            .get(crate::middleware::CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);
        Self(id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .copied()
            .unwrap_or_else(|| Self::from_headers(&parts.headers)))
    }
}

/// `Json<T>` whose parse failures are reported as 422 validation errors.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(builder: axum::http::request::Builder) -> Result<CurrentActor, AppError> {
        let (mut parts, ()) = builder.body(()).expect("Valid request").into_parts();
        CurrentActor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_actor_from_headers() {
        let actor = extract(
            Request::builder()
                .header(USER_ID_HEADER, "42")
                .header(USER_ROLE_HEADER, "employer"),
        )
        .await
        .expect("Should extract");

        assert_eq!(actor.0, Actor::driver(42));
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let err = extract(Request::builder().header(USER_ROLE_HEADER, "admin"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = extract(
            Request::builder()
                .header(USER_ID_HEADER, "7")
                .header(USER_ROLE_HEADER, "driver"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header(crate::middleware::CORRELATION_ID_HEADER, uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let (mut parts, ()) = Request::builder()
            .body(())
            .expect("Valid request")
            .into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_ne!(correlation_id.0, Uuid::nil());
    }
}
