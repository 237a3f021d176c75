//! Error types for the proxy client and session

use stm_common::placement::PlacementError;
use thiserror::Error;

/// Client result type
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// Proxy answered with a failure status; `message` is its `error` field
    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Track id is neither in the search results nor in the registry
    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Common(#[from] stm_common::Error),
}
