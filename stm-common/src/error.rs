//! Common error types for the tier maker

use thiserror::Error;

/// Common result type for tier maker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the proxy and client
#[derive(Error, Debug)]
pub enum Error {
    /// Proxy configuration could not be loaded or is incomplete
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed user input, such as a redirect fragment without a token
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
