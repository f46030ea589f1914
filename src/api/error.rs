use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Request failures, each mapped to an HTTP status and a `detail` body.
///
/// Fetch and upload carry the collaborator's failure text; the full error
/// chain is only logged server-side.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    #[error("Invalid or missing API key")]
    InvalidApiKey,
    #[error("Missing 'video_url' in request body")]
    MissingVideoUrl,
    #[error("Error downloading or uploading video: {0}")]
    Fetch(String),
    #[error("Error downloading or uploading video: {0}")]
    Upload(String),
}

impl ApiError {
    pub fn to_err_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            ApiError::MissingVideoUrl => StatusCode::BAD_REQUEST,
            ApiError::Fetch(_) | ApiError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "detail": self.to_string() });
        (self.to_err_code(), Json(body)).into_response()
    }
}
