//! HTTP handlers and the shared response envelope.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod health;
pub(crate) mod notes;

/// Uniform body shape for every endpoint: `{success, data?, error?}`.
#[derive(Serialize, ToSchema)]
pub(crate) struct ApiEnvelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// 200 with a data payload.
pub(crate) fn ok(data: Value) -> Response {
    (
        StatusCode::OK,
        Json(ApiEnvelope {
            success: true,
            data: Some(data),
            error: None,
        }),
    )
        .into_response()
}

/// 200 with no payload beyond the success flag.
pub(crate) fn ok_empty() -> Response {
    (
        StatusCode::OK,
        Json(ApiEnvelope {
            success: true,
            data: None,
            error: None,
        }),
    )
        .into_response()
}

/// Error response; the status carries the classification, the body the message.
pub(crate) fn fail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiEnvelope {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

/// 429 with the fixed cooldown hint callers retry after.
pub(crate) fn rate_limited(message: impl Into<String>, retry_after_seconds: u64) -> Response {
    let mut response = fail(StatusCode::TOO_MANY_REQUESTS, message);
    if let Ok(value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
        response.headers_mut().insert(RETRY_AFTER, value);
    }
    response
}

/// Storage and signing failures all collapse to an opaque 500.
pub(crate) fn server_error() -> Response {
    fail(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}
