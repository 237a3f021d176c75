//! Catalog models shared by proxy and client
//!
//! Field names follow the catalog Web API JSON so the proxy can pass
//! upstream objects through without a translation layer. Every field is
//! optional on the wire; missing values fall back to display placeholders.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Placeholder shown when a track's album has no artwork
pub const TRACK_ART_PLACEHOLDER: &str = "https://via.placeholder.com/80?text=No+Image";

/// Placeholder used for canonical tier items without artwork
pub const TIER_ART_PLACEHOLDER: &str = "https://via.placeholder.com/300";

/// Placeholder shown for albums without artwork
pub const ALBUM_ART_PLACEHOLDER: &str = "https://via.placeholder.com/80";

pub const UNKNOWN_TRACK: &str = "Unknown Track";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Opaque catalog identifier of a track
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TrackId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Artist reference as embedded in tracks and albums
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Artwork image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Album summary embedded in a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// A playable catalog track
///
/// Immutable once fetched; the registry stores clones keyed by [`TrackId`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: TrackId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    /// Absent on album track listings; see [`Track::with_album_fallback`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub uri: String,
}

impl Track {
    /// Display title, falling back to "Unknown Track"
    pub fn title(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => UNKNOWN_TRACK,
        }
    }

    /// Artist names joined by ", ", falling back to "Unknown Artist"
    pub fn artist_line(&self) -> String {
        join_artists(&self.artists).unwrap_or_else(|| UNKNOWN_ARTIST.to_string())
    }

    pub fn album_name(&self) -> &str {
        self.album
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or(UNKNOWN_ALBUM)
    }

    /// First album image, if any
    pub fn art_url(&self) -> Option<&str> {
        self.album
            .as_ref()
            .and_then(|a| a.images.first())
            .map(|img| img.url.as_str())
    }

    pub fn duration_label(&self) -> String {
        format_duration(self.duration_ms)
    }

    /// Fill in album name and artwork from `fallback` where the track lacks them
    ///
    /// Values already present on the track win over the fallback.
    pub fn with_album_fallback(mut self, fallback: &AlbumRef) -> Self {
        let album = self.album.get_or_insert_with(AlbumRef::default);
        if album.id.is_none() {
            album.id = fallback.id.clone();
        }
        if album.name.is_none() {
            album.name = fallback.name.clone();
        }
        if album.images.is_empty() {
            album.images = fallback.images.clone();
        }
        self
    }
}

/// A catalog album as returned by search and album lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub total_tracks: Option<u32>,
}

impl Album {
    /// "Artist A, Artist B • 12 tracks" (count shown as "?" when unknown)
    pub fn summary_line(&self) -> String {
        let artists = join_artists(&self.artists).unwrap_or_default();
        let count = self
            .total_tracks
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!("{} • {} tracks", artists, count)
    }

    pub fn art_url(&self) -> &str {
        self.images
            .first()
            .map(|img| img.url.as_str())
            .unwrap_or(ALBUM_ART_PLACEHOLDER)
    }

    /// Album reference used to backfill tracks from an album listing
    pub fn as_album_ref(&self) -> AlbumRef {
        AlbumRef {
            id: Some(self.id.clone()),
            name: Some(self.name.clone()),
            images: self.images.clone(),
        }
    }
}

fn join_artists(artists: &[ArtistRef]) -> Option<String> {
    let names: Vec<&str> = artists
        .iter()
        .map(|a| a.name.as_str())
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

/// Format a track duration as `m:ss`
///
/// Milliseconds are floored to whole seconds.
///
/// # Examples
///
/// ```
/// use stm_common::model::format_duration;
///
/// assert_eq!(format_duration(0), "0:00");
/// assert_eq!(format_duration(61_000), "1:01");
/// assert_eq!(format_duration(215_999), "3:35");
/// ```
pub fn format_duration(duration_ms: u64) -> String {
    let seconds = duration_ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
