//! API module for JSON shapes shared by the proxy and its clients
//!
//! The proxy serializes these types and the client deserializes them, so both
//! sides agree on field names without a schema file.

pub mod types;

pub use types::{
    CreatePlaylistRequest, CreatePlaylistResponse, ErrorResponse, RefreshTokenResponse,
    SearchResponse, TokenFragment,
};
