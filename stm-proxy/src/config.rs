//! Configuration for the proxy
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (each also readable from an environment variable)
//! 2. TOML configuration file (`--config`, else `~/.config/stm/config.toml`)
//! 3. Built-in defaults (code constants)
//!
//! A missing default config file is not an error; an explicitly named one is.
//! The OAuth client id and secret have no default and must come from one of
//! the first two sources.

use axum::http::HeaderValue;
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use stm_common::{Error, Result};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/callback";
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments for stm-proxy
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "stm-proxy")]
#[command(about = "OAuth and catalog proxy for the tier maker")]
#[command(version)]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "STM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Interface to bind
    #[arg(long, env = "STM_BIND_HOST")]
    pub bind_host: Option<String>,

    /// OAuth client id registered with the music service
    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Redirect URI registered for the OAuth callback
    #[arg(long, env = "REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Directory of static browser assets
    #[arg(long, env = "STM_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Origin allowed to make credentialed cross-origin requests
    #[arg(long, env = "STM_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "STM_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Configuration file contents; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub bind_host: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub cors_origin: Option<String>,
    /// Authorization server root (authorize and token endpoints)
    pub accounts_base_url: Option<String>,
    /// Web API root, including the version segment
    pub api_base_url: Option<String>,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

/// OAuth client credentials
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Fully resolved proxy configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub bind_host: String,
    pub port: u16,
    pub credentials: ClientCredentials,
    pub redirect_uri: String,
    pub static_dir: PathBuf,
    pub cors_origin: HeaderValue,
    pub accounts_base_url: String,
    pub api_base_url: String,
    pub log_level: String,
}

impl ProxyConfig {
    /// Load the config file (if any) and merge it with `args`
    ///
    /// Returns the resolved config and the path of the file that was read.
    pub fn load(args: &Args) -> Result<(Self, Option<PathBuf>)> {
        let (path, file) = match load_toml(args.config.as_deref())? {
            Some((path, file)) => (Some(path), file),
            None => (None, TomlConfig::default()),
        };
        Ok((Self::resolve(args, file)?, path))
    }

    /// Merge command-line values over file values over defaults
    pub fn resolve(args: &Args, file: TomlConfig) -> Result<Self> {
        let client_id = non_empty(args.client_id.clone())
            .or_else(|| non_empty(file.client_id))
            .ok_or_else(|| Error::Config("client_id is required (--client-id or SPOTIFY_CLIENT_ID)".to_string()))?;
        let client_secret = non_empty(args.client_secret.clone())
            .or_else(|| non_empty(file.client_secret))
            .ok_or_else(|| {
                Error::Config("client_secret is required (--client-secret or SPOTIFY_CLIENT_SECRET)".to_string())
            })?;

        let redirect_uri = args
            .redirect_uri
            .clone()
            .or(file.redirect_uri)
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());
        url::Url::parse(&redirect_uri)
            .map_err(|e| Error::Config(format!("Invalid redirect_uri '{}': {}", redirect_uri, e)))?;

        let cors_origin = args
            .cors_origin
            .clone()
            .or(file.cors_origin)
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());
        let cors_origin = HeaderValue::from_str(&cors_origin)
            .map_err(|e| Error::Config(format!("Invalid cors_origin '{}': {}", cors_origin, e)))?;

        Ok(Self {
            bind_host: args
                .bind_host
                .clone()
                .or(file.bind_host)
                .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            credentials: ClientCredentials {
                client_id,
                client_secret,
            },
            redirect_uri,
            static_dir: args
                .static_dir
                .clone()
                .or(file.static_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
            cors_origin,
            accounts_base_url: trim_base(file.accounts_base_url, DEFAULT_ACCOUNTS_BASE_URL),
            api_base_url: trim_base(file.api_base_url, DEFAULT_API_BASE_URL),
            log_level: args
                .log_level
                .clone()
                .or(file.logging.level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    /// `host:port` string for binding the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn trim_base(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Default configuration file path for the platform
///
/// `~/.config/stm/config.toml` on Linux; the platform config dir elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stm").join("config.toml"))
}

/// Read a TOML config file
///
/// An explicit path must exist. Without one, the default path is tried and
/// silently skipped when absent.
pub fn load_toml(explicit: Option<&Path>) -> Result<Option<(PathBuf, TomlConfig)>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Cannot read config file {}: {}", path.display(), e)))?;
    let config = toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))?;
    Ok(Some((path, config)))
}
