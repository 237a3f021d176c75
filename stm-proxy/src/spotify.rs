//! Spotify Web API client
//!
//! Thin wrapper over the accounts service (authorize/token) and the Web API
//! endpoints the proxy forwards. Every call takes the caller's bearer token;
//! the client itself holds only the OAuth client credentials.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use stm_common::api::SearchResponse;
use stm_common::{Album, Track};

use crate::config::{ClientCredentials, ProxyConfig};

const USER_AGENT: &str = concat!("stm-proxy/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const AUTH_SCOPE: &str = "user-read-private user-read-email playlist-modify-public playlist-modify-private";
pub const TRACK_SEARCH_LIMIT: u32 = 10;
pub const ALBUM_SEARCH_LIMIT: u32 = 5;
pub const ALBUM_TRACKS_LIMIT: u32 = 50;
pub const DEFAULT_PLAYLIST_NAME: &str = "My Tier List";
pub const PLAYLIST_DESCRIPTION: &str = "Created with Spotify Tier Maker";
/// Most URIs the Web API accepts in one "add items to playlist" call
pub const MAX_URIS_PER_ADD: usize = 100;

/// Spotify client errors
#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Spotify API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Absent on refresh grants unless the server rotates the token
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// One page of a paged listing; null entries are dropped
#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<Option<T>>,
}

impl<T> Paging<T> {
    fn into_items(self) -> Vec<T> {
        self.items.into_iter().flatten().collect()
    }
}

#[derive(Debug, Deserialize)]
struct TrackSearch {
    tracks: Paging<Track>,
}

#[derive(Debug, Deserialize)]
struct AlbumSearch {
    albums: Paging<Album>,
}

#[derive(Debug, Deserialize)]
struct CurrentUser {
    id: String,
}

#[derive(Debug, Serialize)]
struct NewPlaylist<'a> {
    name: &'a str,
    description: &'a str,
    public: bool,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    #[serde(default)]
    spotify: Option<String>,
}

/// Playlist object returned on creation
#[derive(Debug, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
    external_urls: ExternalUrls,
}

impl CreatedPlaylist {
    pub fn url(&self) -> Option<&str> {
        self.external_urls.spotify.as_deref()
    }
}

#[derive(Debug, Serialize)]
struct AddTracks<'a> {
    uris: &'a [String],
}

/// Error envelope used by the Web API: `{"error": {"status", "message"}}`
/// and by the accounts service: `{"error", "error_description"}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Api { error: ApiErrorDetail },
    Accounts {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ErrorBody {
    fn message(self) -> String {
        match self {
            ErrorBody::Api { error } => error.message,
            ErrorBody::Accounts {
                error_description: Some(description),
                ..
            } => description,
            ErrorBody::Accounts { error, .. } => error,
        }
    }
}

/// Spotify accounts + Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    accounts_base_url: String,
    api_base_url: String,
    credentials: ClientCredentials,
    redirect_uri: String,
}

impl SpotifyClient {
    pub fn new(config: &ProxyConfig) -> Result<Self, SpotifyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            accounts_base_url: config.accounts_base_url.clone(),
            api_base_url: config.api_base_url.clone(),
            credentials: config.credentials.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// Authorization URL the browser is sent to by `/login`
    pub fn authorize_url(&self, state: &str) -> Result<url::Url, SpotifyError> {
        url::Url::parse_with_params(
            &format!("{}/authorize", self.accounts_base_url),
            &[
                ("response_type", "code"),
                ("client_id", self.credentials.client_id.as_str()),
                ("scope", AUTH_SCOPE),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| SpotifyError::Parse(e.to_string()))
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SpotifyError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    /// Obtain a fresh access token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, SpotifyError> {
        self.token_request(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, SpotifyError> {
        let url = format!("{}/api/token", self.accounts_base_url);
        tracing::debug!(url = %url, grant_type = ?form.first().map(|(_, v)| *v), "Requesting token");

        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        decode(response).await
    }

    /// Search tracks and albums concurrently
    pub async fn search(&self, access_token: &str, query: &str) -> Result<SearchResponse, SpotifyError> {
        let track_limit = TRACK_SEARCH_LIMIT.to_string();
        let album_limit = ALBUM_SEARCH_LIMIT.to_string();
        let track_params = [("q", query), ("type", "track"), ("limit", track_limit.as_str())];
        let album_params = [("q", query), ("type", "album"), ("limit", album_limit.as_str())];
        let (tracks, albums) = tokio::try_join!(
            self.api_get::<TrackSearch>(
                access_token,
                "/search",
                &track_params,
            ),
            self.api_get::<AlbumSearch>(
                access_token,
                "/search",
                &album_params,
            ),
        )?;

        Ok(SearchResponse {
            tracks: tracks.tracks.into_items(),
            albums: albums.albums.into_items(),
        })
    }

    /// First page of an album's tracks
    ///
    /// Album track objects carry no album reference; callers fill it in.
    pub async fn album_tracks(&self, access_token: &str, album_id: &str) -> Result<Vec<Track>, SpotifyError> {
        validate_id(album_id)?;
        let limit = ALBUM_TRACKS_LIMIT.to_string();
        let page: Paging<Track> = self
            .api_get(access_token, &format!("/albums/{}/tracks", album_id), &[("limit", limit.as_str())])
            .await?;
        Ok(page.into_items())
    }

    pub async fn album(&self, access_token: &str, album_id: &str) -> Result<Album, SpotifyError> {
        validate_id(album_id)?;
        self.api_get(access_token, &format!("/albums/{}", album_id), &[])
            .await
    }

    pub async fn current_user_id(&self, access_token: &str) -> Result<String, SpotifyError> {
        let user: CurrentUser = self.api_get(access_token, "/me", &[]).await?;
        Ok(user.id)
    }

    /// Create a private playlist for `user_id`
    pub async fn create_playlist(
        &self,
        access_token: &str,
        user_id: &str,
        name: &str,
    ) -> Result<CreatedPlaylist, SpotifyError> {
        let url = format!("{}/users/{}/playlists", self.api_base_url, encode_segment(user_id));
        let body = NewPlaylist {
            name,
            description: PLAYLIST_DESCRIPTION,
            public: false,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        decode(response).await
    }

    /// Append `uris` to a playlist, in batches of [`MAX_URIS_PER_ADD`]
    pub async fn add_tracks(&self, access_token: &str, playlist_id: &str, uris: &[String]) -> Result<(), SpotifyError> {
        let url = format!("{}/playlists/{}/tracks", self.api_base_url, encode_segment(playlist_id));

        for batch in uris.chunks(MAX_URIS_PER_ADD) {
            let response = self
                .http_client
                .post(&url)
                .bearer_auth(access_token)
                .json(&AddTracks { uris: batch })
                .send()
                .await
                .map_err(|e| SpotifyError::Network(e.to_string()))?;

            check_status(response).await?;
        }
        Ok(())
    }

    /// Create a playlist named `name` holding `uris`, returning its external URL
    ///
    /// A blank name falls back to "My Tier List". Tracks are only added when
    /// `uris` is non-empty.
    pub async fn save_playlist(&self, access_token: &str, name: &str, uris: &[String]) -> Result<String, SpotifyError> {
        let name = match name.trim() {
            "" => DEFAULT_PLAYLIST_NAME,
            _ => name,
        };

        let user_id = self.current_user_id(access_token).await?;
        let playlist = self.create_playlist(access_token, &user_id, name).await?;
        tracing::info!(playlist_id = %playlist.id, tracks = uris.len(), "Created playlist");

        if !uris.is_empty() {
            self.add_tracks(access_token, &playlist.id, uris).await?;
        }

        playlist
            .url()
            .map(str::to_string)
            .ok_or_else(|| SpotifyError::Parse("playlist response has no external URL".to_string()))
    }

    async fn api_get<T: serde::de::DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SpotifyError> {
        let url = format!("{}{}", self.api_base_url, path);
        tracing::debug!(url = %url, "Querying Spotify API");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| SpotifyError::Network(e.to_string()))?;

        decode(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SpotifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.message(),
        Err(_) if text.trim().is_empty() => status.canonical_reason().unwrap_or("Unknown error").to_string(),
        Err(_) => text,
    };
    tracing::warn!(status = status.as_u16(), message = %message, "Spotify request failed");
    Err(SpotifyError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, SpotifyError> {
    check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| SpotifyError::Parse(e.to_string()))
}

/// Catalog ids are base-62; anything else could rewrite the request path
fn validate_id(id: &str) -> Result<(), SpotifyError> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(SpotifyError::InvalidId(id.to_string()))
    }
}

fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}
