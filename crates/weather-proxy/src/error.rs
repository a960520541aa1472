use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::upstream::UpstreamError;

/// Client-facing failures of the weather endpoint.
///
/// Every variant maps to a fixed structured body — upstream failure detail
/// stays in the server logs and never reaches the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing latitude or longitude")]
    MissingCoordinates,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Build a `{"error": ...}` JSON response with the given status.
pub fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        json!({ "error": message }).to_string(),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MissingCoordinates => error_body(
                StatusCode::BAD_REQUEST,
                "Missing latitude or longitude",
            ),
            ApiError::Upstream(_) => error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error fetching weather data",
            ),
        }
    }
}
