//! Success envelope.

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Body of every successful response: `{"success": true, "message"?, "data"}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// Optional confirmation text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    /// Payload.
    pub data: T,
}

/// 200 with `data`.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: None,
        data,
    })
}

/// 200 with `data` and a confirmation message.
pub fn ok_with<T: Serialize>(message: &'static str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: Some(message),
        data,
    })
}

/// 201 with `data` and a confirmation message.
pub fn created<T: Serialize>(message: &'static str, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok_with(message, data))
}
