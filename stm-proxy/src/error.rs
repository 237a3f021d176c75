//! Error types for stm-proxy
//!
//! Every failing endpoint answers with `{ "error": message }` so the browser
//! client can surface the message without knowing the status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use stm_common::api::ErrorResponse;
use thiserror::Error;

use crate::spotify::SpotifyError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing or rejected credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),

    /// Upstream call failed where the endpoint reports a server fault
    #[error(transparent)]
    Upstream(#[from] SpotifyError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) | ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
