//! Shared API request/response types

use serde::{Deserialize, Serialize};

use crate::model::{Album, Track};
use crate::{Error, Result};

// ========================================
// Catalog
// ========================================

/// `GET /search` response: matching tracks and albums
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub albums: Vec<Album>,
}

// ========================================
// Playlists
// ========================================

/// `POST /create-playlist` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePlaylistRequest {
    pub access_token: String,
    #[serde(default)]
    pub name: String,
    /// Track URIs in playlist order
    #[serde(default)]
    pub tracks: Vec<String>,
}

/// `POST /create-playlist` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePlaylistResponse {
    pub success: bool,
    pub url: String,
}

// ========================================
// Auth
// ========================================

/// `GET /refresh_token` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Tokens handed to the browser in the URL fragment after the OAuth callback
///
/// # Examples
///
/// ```
/// use stm_common::api::TokenFragment;
///
/// let tokens = TokenFragment::parse("#access_token=abc&refresh_token=def").unwrap();
/// assert_eq!(tokens.access_token.as_deref(), Some("abc"));
/// assert_eq!(tokens.refresh_token.as_deref(), Some("def"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenFragment {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub error: Option<String>,
}

impl TokenFragment {
    /// Parse a fragment with or without its leading `#`
    ///
    /// Fails if the fragment carries an `error` or no access token.
    pub fn parse(fragment: &str) -> Result<Self> {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let mut tokens = Self::default();
        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "access_token" => tokens.access_token = value,
                "refresh_token" => tokens.refresh_token = value,
                "error" => tokens.error = value,
                _ => {}
            }
        }

        if let Some(error) = &tokens.error {
            return Err(Error::InvalidInput(format!("Authorization failed: {}", error)));
        }
        match tokens.access_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(tokens),
            _ => Err(Error::InvalidInput("No access token in URL fragment".to_string())),
        }
    }

    /// Serialize as a fragment body (without `#`)
    pub fn to_fragment(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Some(token) = &self.access_token {
            serializer.append_pair("access_token", token);
        }
        if let Some(token) = &self.refresh_token {
            serializer.append_pair("refresh_token", token);
        }
        if let Some(error) = &self.error {
            serializer.append_pair("error", error);
        }
        serializer.finish()
    }
}

/// Error body returned by every failing proxy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_tolerates_missing_lists() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.tracks.is_empty());
        assert!(response.albums.is_empty());
    }

    #[test]
    fn test_create_playlist_request_shape() {
        let request: CreatePlaylistRequest = serde_json::from_str(
            r#"{"access_token": "tok", "name": "My S Tier Playlist", "tracks": ["spotify:track:1"]}"#,
        )
        .unwrap();
        assert_eq!(request.access_token, "tok");
        assert_eq!(request.tracks, vec!["spotify:track:1".to_string()]);
    }

    #[test]
    fn test_fragment_error_is_rejected() {
        let err = TokenFragment::parse("error=State+mismatch").unwrap_err();
        assert!(err.to_string().contains("State mismatch"));
    }

    #[test]
    fn test_fragment_without_token_is_rejected() {
        assert!(TokenFragment::parse("#refresh_token=x").is_err());
        assert!(TokenFragment::parse("").is_err());
    }

    #[test]
    fn test_fragment_round_trip_escapes_values() {
        let tokens = TokenFragment {
            access_token: Some("a/b+c".to_string()),
            refresh_token: Some("r=1".to_string()),
            error: None,
        };
        let parsed = TokenFragment::parse(&tokens.to_fragment()).unwrap();
        assert_eq!(parsed, tokens);
    }
}
