//! stm-client - session layer for the tier maker
//!
//! Consumes the proxy's JSON API through [`ProxyClient`] and drives the
//! tier registry from user actions through [`Session`].

pub mod error;
pub mod gateway;
pub mod session;

pub use error::{ClientError, ClientResult};
pub use gateway::{CatalogGateway, ProxyClient};
pub use session::Session;
