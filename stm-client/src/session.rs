//! Client session: search results plus the tier registry
//!
//! A [`Session`] owns the registry for one browser session and turns discrete
//! user actions (search, add album, drag, save) into registry operations.
//! Every user-visible outcome is published as a notice on the session's
//! [`EventBus`], next to the registry's own change events.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use stm_common::api::SearchResponse;
use stm_common::events::{EventBus, Notice, TierEvent};
use stm_common::export::{export_tiers, ExportError, ExportPlan, ExportReport, PlaylistExporter};
use stm_common::model::{AlbumRef, UNKNOWN_ALBUM};
use stm_common::placement::{self, DragSource, DropOutcome, DropTarget};
use stm_common::registry::LobbyOutcome;
use stm_common::{Album, TierRegistry, Track, TrackId};

use crate::error::{ClientError, ClientResult};
use crate::gateway::CatalogGateway;

pub const SEARCH_FAILED: &str = "Failed to search tracks";
pub const ALBUM_TRACKS_FAILED: &str = "Failed to get album tracks";

/// Event channel capacity for one session
pub const EVENT_CAPACITY: usize = 256;

pub struct Session<G> {
    gateway: G,
    registry: TierRegistry,
    events: EventBus,
    results: SearchResponse,
}

impl<G: CatalogGateway> Session<G> {
    /// New session with the default S..F tiers and an empty lobby
    pub fn new(gateway: G) -> Self {
        let events = EventBus::new(EVENT_CAPACITY);
        let mut registry = TierRegistry::with_default_tiers();
        registry.attach_events(events.clone());

        Self {
            gateway,
            registry,
            events,
            results: SearchResponse::default(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn registry(&self) -> &TierRegistry {
        &self.registry
    }

    /// Tier management (add, rename, delete, reorder) goes straight to the registry
    pub fn registry_mut(&mut self) -> &mut TierRegistry {
        &mut self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Registry changes and notices for the rendering layer
    pub fn subscribe(&self) -> broadcast::Receiver<TierEvent> {
        self.events.subscribe()
    }

    /// Current search results
    pub fn results(&self) -> &SearchResponse {
        &self.results
    }

    // ========================================
    // Search
    // ========================================

    /// Run a search, replacing the current results
    ///
    /// A blank query clears the results without a request. On failure the
    /// previous results stay and an error notice is published.
    pub async fn search(&mut self, query: &str) -> ClientResult<()> {
        let query = query.trim();
        if query.is_empty() {
            self.results = SearchResponse::default();
            return Ok(());
        }

        match self.gateway.search(query).await {
            Ok(results) => {
                debug!(
                    query = %query,
                    tracks = results.tracks.len(),
                    albums = results.albums.len(),
                    "Search results"
                );
                self.results = results;
                Ok(())
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed");
                self.events.notify(Notice::error(SEARCH_FAILED));
                Err(e)
            }
        }
    }

    // ========================================
    // Lobby
    // ========================================

    /// Clone a track into the lobby; the search result stays available
    pub fn add_to_lobby(&mut self, track: &Track) -> LobbyOutcome {
        self.registry.place_in_lobby(track.clone())
    }

    /// Add every track of the current results to the lobby
    ///
    /// Tracks already placed anywhere are skipped. Returns how many were added.
    pub fn select_all_in_lobby(&mut self) -> usize {
        let added = self.registry.place_all_in_lobby(self.results.tracks.iter().cloned());
        debug!(added, "Selected all results into lobby");
        added
    }

    /// Unplace every lobby track; search results are untouched
    pub fn clear_lobby(&mut self) -> Vec<TrackId> {
        self.registry.clear_lobby()
    }

    /// Add all of an album's tracks to the lobby
    ///
    /// Album details only supply the name and artwork; if they cannot be
    /// fetched the tracks still load under "Unknown Album". A failed track
    /// listing leaves the registry untouched. When at least one track was
    /// added the album leaves the search results.
    pub async fn add_album_to_lobby(&mut self, album: &Album) -> ClientResult<usize> {
        let fallback = match self.gateway.album_details(&album.id).await {
            Ok(details) => AlbumRef {
                id: Some(album.id.clone()),
                name: Some(if details.name.is_empty() {
                    UNKNOWN_ALBUM.to_string()
                } else {
                    details.name
                }),
                images: details.images,
            },
            Err(e) => {
                warn!(album_id = %album.id, error = %e, "Album details unavailable");
                AlbumRef {
                    id: Some(album.id.clone()),
                    name: Some(UNKNOWN_ALBUM.to_string()),
                    images: Vec::new(),
                }
            }
        };
        let album_name = fallback.name.clone().unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

        let tracks = match self.gateway.album_tracks(&album.id).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(album_id = %album.id, error = %e, "Album track listing failed");
                self.events.notify(Notice::error(ALBUM_TRACKS_FAILED));
                return Err(e);
            }
        };

        let added = self
            .registry
            .place_all_in_lobby(tracks.into_iter().map(|t| t.with_album_fallback(&fallback)));

        let message = match added {
            0 => format!("All tracks from \"{}\" already exist", album_name),
            1 => format!("Added 1 track from \"{}\"", album_name),
            n => format!("Added {} tracks from \"{}\"", n, album_name),
        };
        info!(album_id = %album.id, added, "Album added to lobby");
        self.events.notify(Notice::info(message));

        if added > 0 {
            self.results.albums.retain(|a| a.id != album.id);
        }
        Ok(added)
    }

    // ========================================
    // Drag and drop
    // ========================================

    /// Apply a drop of the track `track_id` dragged from `source`
    ///
    /// Tracks dragged from the search results are looked up there; all others
    /// must already be held by the registry.
    pub fn drop_track(
        &mut self,
        track_id: &str,
        source: DragSource,
        target: DropTarget,
        index: Option<usize>,
    ) -> ClientResult<DropOutcome> {
        let track = self.lookup(track_id, source)?;
        Ok(placement::apply_drop(&mut self.registry, &track, source, target, index)?)
    }

    /// Tier-select dialog: add a track to the tier labelled `label`
    ///
    /// The track may be a search result or one already waiting in the lobby;
    /// a lobby track leaves the lobby when it lands in the tier.
    pub fn add_to_tier_by_label(&mut self, track_id: &str, label: &str) -> ClientResult<DropOutcome> {
        let track = self
            .lookup(track_id, DragSource::SearchResults)
            .or_else(|_| self.lookup(track_id, DragSource::Lobby))?;
        Ok(placement::add_to_tier_by_label(&mut self.registry, &track, label)?)
    }

    fn lookup(&self, track_id: &str, source: DragSource) -> ClientResult<Track> {
        let found = match source {
            DragSource::SearchResults => self.results.tracks.iter().find(|t| t.id.as_str() == track_id),
            DragSource::Lobby | DragSource::Tier(_) => self.registry.track(track_id),
        };
        found
            .cloned()
            .ok_or_else(|| ClientError::UnknownTrack(track_id.to_string()))
    }

    // ========================================
    // Save
    // ========================================

    /// Playlist names to offer, one per non-empty tier
    ///
    /// Publishes "No tiers with songs to save." when every tier is empty.
    pub fn export_plan(&self) -> Result<ExportPlan, ExportError> {
        ExportPlan::from_registry(&self.registry).map_err(|e| {
            self.events.notify(Notice::error(e.to_string()));
            e
        })
    }

    /// Save every planned tier as a playlist, in tier order
    ///
    /// A blank name aborts before any request. Per-tier failures are
    /// collected in the report; the summary is published as a notice.
    pub async fn save_all<E>(&self, plan: &ExportPlan, exporter: &E) -> Result<ExportReport, ExportError>
    where
        E: PlaylistExporter + ?Sized,
    {
        match export_tiers(plan, exporter).await {
            Ok(report) => {
                let failed = report.failures().count();
                let notice = if failed > 0 && report.successes().next().is_none() {
                    Notice::error(report.summary())
                } else {
                    Notice::info(report.summary())
                };
                self.events.notify(notice);
                Ok(report)
            }
            Err(e) => {
                self.events.notify(Notice::error(e.to_string()));
                Err(e)
            }
        }
    }
}
