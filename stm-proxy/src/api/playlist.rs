//! Playlist creation endpoint used when saving tiers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use stm_common::api::{CreatePlaylistRequest, CreatePlaylistResponse};

use super::require_token;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /create-playlist
///
/// Creates a private playlist for the token's user and fills it with the
/// given URIs in order. Any upstream failure is a 500 carrying its message.
pub async fn create_playlist(
    State(state): State<AppState>,
    payload: Result<Json<CreatePlaylistRequest>, JsonRejection>,
) -> ApiResult<Json<CreatePlaylistResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let token = require_token(Some(request.access_token))?;

    let url = state
        .spotify
        .save_playlist(&token, &request.name, &request.tracks)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(CreatePlaylistResponse { success: true, url }))
}
