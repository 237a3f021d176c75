//! Catalog endpoints: search, album track listing, album details

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use stm_common::api::SearchResponse;
use stm_common::{Album, Track};

use super::require_token;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumParams {
    pub album_id: Option<String>,
    pub access_token: Option<String>,
}

/// GET /search?q=&access_token=
///
/// Up to 10 tracks and 5 albums, fetched concurrently.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query parameter \"q\" is required".to_string()))?;
    let token = require_token(params.access_token)?;

    let results = state.spotify.search(&token, &query).await?;
    tracing::debug!(
        tracks = results.tracks.len(),
        albums = results.albums.len(),
        "Search complete"
    );
    Ok(Json(results))
}

/// GET /album-tracks?album_id=&access_token=
///
/// Upstream failures are reported as 400.
pub async fn album_tracks(
    State(state): State<AppState>,
    Query(params): Query<AlbumParams>,
) -> ApiResult<Json<Vec<Track>>> {
    let (album_id, token) = album_request(params)?;
    let tracks = state
        .spotify
        .album_tracks(&token, &album_id)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(tracks))
}

/// GET /album-details?album_id=&access_token=
pub async fn album_details(
    State(state): State<AppState>,
    Query(params): Query<AlbumParams>,
) -> ApiResult<Json<Album>> {
    let (album_id, token) = album_request(params)?;
    let album = state
        .spotify
        .album(&token, &album_id)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(album))
}

fn album_request(params: AlbumParams) -> ApiResult<(String, String)> {
    let album_id = params
        .album_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing album_id".to_string()))?;
    Ok((album_id, require_token(params.access_token)?))
}
