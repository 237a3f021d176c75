//! stm-proxy library - OAuth and catalog proxy for the tier maker
//!
//! Holds the OAuth client secret on the server side, forwards catalog and
//! playlist calls to the Spotify Web API with the caller's bearer token, and
//! serves the browser assets.

use axum::http::{header, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod error;
pub mod spotify;

use config::ProxyConfig;
use spotify::{SpotifyClient, SpotifyError};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Upstream Web API client
    pub spotify: Arc<SpotifyClient>,
    /// Resolved configuration
    pub config: Arc<ProxyConfig>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ProxyConfig) -> Result<Self, SpotifyError> {
        let spotify = SpotifyClient::new(&config)?;
        Ok(Self {
            spotify: Arc::new(spotify),
            config: Arc::new(config),
        })
    }
}

/// Build application router
///
/// API routes take precedence; any other path is served from the static
/// asset directory.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let cors = CorsLayer::new()
        .allow_origin(state.config.cors_origin.clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    let assets = ServeDir::new(&state.config.static_dir);

    Router::new()
        // OAuth code flow
        .route("/login", get(api::login))
        .route("/callback", get(api::callback))
        .route("/refresh_token", get(api::refresh_token))
        // Catalog
        .route("/search", get(api::search))
        .route("/album-tracks", get(api::album_tracks))
        .route("/album-details", get(api::album_details))
        // Playlists
        .route("/create-playlist", post(api::create_playlist))
        .merge(api::health_routes())
        .fallback_service(assets)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
