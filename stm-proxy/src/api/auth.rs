//! OAuth authorization code flow
//!
//! `/login` issues a random state value, stores it in an HttpOnly cookie and
//! redirects to the authorize page. `/callback` checks the returned state
//! against the cookie, exchanges the code for tokens and hands them to the
//! browser in the URL fragment so they never reach server logs.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use stm_common::api::{RefreshTokenResponse, TokenFragment};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const STATE_COOKIE: &str = "spotify_auth_state";
pub const STATE_LENGTH: usize = 16;

/// Query parameters delivered by the authorization server
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshParams {
    pub refresh_token: Option<String>,
}

/// GET /login
pub async fn login(State(state): State<AppState>) -> ApiResult<Response> {
    let auth_state = random_state(STATE_LENGTH);
    let url = state
        .spotify
        .authorize_url(&auth_state)
        .map_err(|e| ApiError::Internal(format!("Authentication error: {}", e)))?;

    tracing::info!("Redirecting to authorization page");
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", STATE_COOKIE, auth_state);
    Ok(found(url.as_str(), &cookie))
}

/// GET /callback
///
/// Always redirects to `/`; the outcome travels in the fragment as either
/// `access_token`/`refresh_token` or `error`.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let stored = cookie_value(&headers, STATE_COOKIE);

    let fragment = match authorize(&state, params, stored.as_deref()).await {
        Ok(tokens) => {
            tracing::info!("Authorization complete");
            tokens
        }
        Err(message) => {
            tracing::warn!(error = %message, "Callback error");
            TokenFragment {
                error: Some(message),
                ..Default::default()
            }
        }
    };

    let clear = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", STATE_COOKIE);
    found(&format!("/#{}", fragment.to_fragment()), &clear)
}

async fn authorize(
    state: &AppState,
    params: CallbackParams,
    stored_state: Option<&str>,
) -> Result<TokenFragment, String> {
    if let Some(error) = params.error {
        return Err(format!("Spotify error: {}", error));
    }
    match (params.state.as_deref(), stored_state) {
        (Some(returned), Some(stored)) if !returned.is_empty() && returned == stored => {}
        _ => return Err("State mismatch".to_string()),
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| "Missing authorization code".to_string())?;

    let tokens = state
        .spotify
        .exchange_code(&code)
        .await
        .map_err(|e| e.to_string())?;

    Ok(TokenFragment {
        access_token: Some(tokens.access_token),
        refresh_token: tokens.refresh_token,
        error: None,
    })
}

/// GET /refresh_token
pub async fn refresh_token(
    State(state): State<AppState>,
    Query(params): Query<RefreshParams>,
) -> ApiResult<Json<RefreshTokenResponse>> {
    let refresh_token = params
        .refresh_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing refresh_token".to_string()))?;

    let tokens = state.spotify.refresh(&refresh_token).await?;
    Ok(Json(RefreshTokenResponse {
        access_token: tokens.access_token,
        expires_in: tokens.expires_in,
    }))
}

fn random_state(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// 302 redirect that also sets a cookie
fn found(location: &str, cookie: &str) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    match HeaderValue::from_str(location) {
        Ok(value) => {
            headers.insert(header::LOCATION, value);
        }
        Err(e) => {
            tracing::error!(error = %e, "Redirect location is not a valid header value");
            return ApiError::Internal("Authentication error".to_string()).into_response();
        }
    }
    if let Ok(value) = HeaderValue::from_str(cookie) {
        headers.insert(header::SET_COOKIE, value);
    }
    response
}

/// Value of cookie `name` from any `Cookie` header
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
