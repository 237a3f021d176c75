//! # Tier Maker Common Library
//!
//! Shared code for the tier maker proxy and client including:
//! - Catalog models (tracks, albums) and duration formatting
//! - The track/tier registry and its single-placement index
//! - Drag-and-drop placement semantics
//! - Playlist export orchestration
//! - Registry change events (TierEvent enum + EventBus)
//! - JSON wire types shared by proxy and client

pub mod api;
pub mod error;
pub mod events;
pub mod export;
pub mod model;
pub mod placement;
pub mod registry;

pub use error::{Error, Result};
pub use model::{Album, Track, TrackId};
pub use registry::{Placement, Tier, TierId, TierRegistry};
