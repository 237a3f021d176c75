//! HTTP API handlers for stm-proxy

pub mod auth;
pub mod catalog;
pub mod health;
pub mod playlist;

pub use auth::{callback, login, refresh_token};
pub use catalog::{album_details, album_tracks, search};
pub use health::health_routes;
pub use playlist::create_playlist;

use crate::error::{ApiError, ApiResult};

/// Require a non-blank bearer token supplied by the browser
pub(crate) fn require_token(token: Option<String>) -> ApiResult<String> {
    match token {
        Some(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(ApiError::Unauthorized("Missing access token".to_string())),
    }
}
