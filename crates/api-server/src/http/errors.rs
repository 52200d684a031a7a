use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::ApiError;

pub(super) fn bad_request_response(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.to_string(),
            details: None,
        }),
    )
        .into_response()
}

pub(super) fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError {
            error: "Unauthorized".to_string(),
            details: None,
        }),
    )
        .into_response()
}

pub(super) fn bad_gateway_response(message: &str) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ApiError {
            error: message.to_string(),
            details: None,
        }),
    )
        .into_response()
}

pub(super) fn backend_error_response(message: &str, details: Option<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            error: message.to_string(),
            details,
        }),
    )
        .into_response()
}
