//! HTTP client for the tier maker proxy
//!
//! [`ProxyClient`] speaks the proxy's JSON API with the user's access token.
//! The session depends on the [`CatalogGateway`] trait rather than the
//! concrete client so it can run against an in-memory catalog in tests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use stm_common::api::{
    CreatePlaylistRequest, CreatePlaylistResponse, ErrorResponse, RefreshTokenResponse, SearchResponse,
    TokenFragment,
};
use stm_common::export::{ExportFailure, PlaylistExporter};
use stm_common::{Album, Track};

use crate::error::{ClientError, ClientResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Catalog lookups the session needs
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn search(&self, query: &str) -> ClientResult<SearchResponse>;

    /// Album track listing; tracks carry no album reference
    async fn album_tracks(&self, album_id: &str) -> ClientResult<Vec<Track>>;

    async fn album_details(&self, album_id: &str) -> ClientResult<Album>;
}

/// Proxy API client bound to one access token
pub struct ProxyClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Build a client from the fragment the OAuth callback redirected to
    ///
    /// Returns the client and the refresh token, if one was delivered.
    pub fn from_fragment(base_url: impl Into<String>, fragment: &str) -> ClientResult<(Self, Option<String>)> {
        let tokens = TokenFragment::parse(fragment)?;
        let access_token = tokens.access_token.unwrap_or_default();
        Ok((Self::new(base_url, access_token)?, tokens.refresh_token))
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Swap in a fresh access token obtained through `/refresh_token`
    pub async fn refresh(&mut self, refresh_token: &str) -> ClientResult<RefreshTokenResponse> {
        let response: RefreshTokenResponse = self
            .get_json("/refresh_token", &[("refresh_token", refresh_token)])
            .await?;
        self.access_token = response.access_token.clone();
        tracing::debug!(expires_in = ?response.expires_in, "Access token refreshed");
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Proxy request");

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        decode(response).await
    }
}

#[async_trait]
impl CatalogGateway for ProxyClient {
    async fn search(&self, query: &str) -> ClientResult<SearchResponse> {
        self.get_json("/search", &[("q", query), ("access_token", self.access_token.as_str())])
            .await
    }

    async fn album_tracks(&self, album_id: &str) -> ClientResult<Vec<Track>> {
        self.get_json(
            "/album-tracks",
            &[("album_id", album_id), ("access_token", self.access_token.as_str())],
        )
        .await
    }

    async fn album_details(&self, album_id: &str) -> ClientResult<Album> {
        self.get_json(
            "/album-details",
            &[("album_id", album_id), ("access_token", self.access_token.as_str())],
        )
        .await
    }
}

#[async_trait]
impl PlaylistExporter for ProxyClient {
    async fn create_playlist(&self, name: &str, uris: &[String]) -> Result<String, ExportFailure> {
        let request = CreatePlaylistRequest {
            access_token: self.access_token.clone(),
            name: name.to_string(),
            tracks: uris.to_vec(),
        };

        let result: ClientResult<CreatePlaylistResponse> = async {
            let response = self
                .http_client
                .post(format!("{}/create-playlist", self.base_url))
                .json(&request)
                .send()
                .await
                .map_err(|e| ClientError::Network(e.to_string()))?;
            decode(response).await
        }
        .await;

        match result {
            Ok(CreatePlaylistResponse { success: true, url }) => Ok(url),
            Ok(_) => Err(ExportFailure("Unknown error".to_string())),
            Err(e) => Err(ExportFailure(e.to_string())),
        }
    }
}

/// Decode a success body, or turn an `{error}` body into [`ClientError::Server`]
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fragment() {
        let (client, refresh) =
            ProxyClient::from_fragment("http://localhost:3000/", "#access_token=abc&refresh_token=def").unwrap();
        assert_eq!(client.access_token(), "abc");
        assert_eq!(refresh.as_deref(), Some("def"));
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_from_fragment_error() {
        let err = ProxyClient::from_fragment("http://localhost:3000", "#error=State+mismatch").err().unwrap();
        assert!(matches!(err, ClientError::Common(_)));
        assert!(err.to_string().contains("State mismatch"));
    }
}
