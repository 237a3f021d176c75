//! Track/tier registry
//!
//! Owns the lobby, the ordered tier list, and an explicit index from track
//! identifier to its current [`Placement`]. A track identifier appears in at
//! most one of {lobby, any tier} at any time; every mutation keeps the index
//! and the sequences in step, so duplicate detection is a single lookup.
//!
//! The registry is synchronous and single-owner (`&mut self`). Rendering code
//! learns about changes through the optional [`EventBus`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::events::{EventBus, TierEvent};
use crate::model::{Track, TrackId};

/// Labels of the tiers created at session start, top to bottom
pub const DEFAULT_TIER_LABELS: [&str; 6] = ["S", "A", "B", "C", "D", "F"];

/// Stable tier identifier (labels are editable and not unique)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierId(Uuid);

impl TierId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TierId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where a placed track currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    Lobby,
    Tier(TierId),
}

/// A user-labelled ranked bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tier {
    id: TierId,
    label: String,
    tracks: Vec<TrackId>,
}

impl Tier {
    fn new(label: String) -> Self {
        Self {
            id: TierId::new(),
            label,
            tracks: Vec::new(),
        }
    }

    pub fn id(&self) -> TierId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn track_ids(&self) -> &[TrackId] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Result of a lobby placement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyOutcome {
    Added,
    /// Track was already placed; nothing changed
    AlreadyPlaced(Placement),
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Track {track_id} is already in a tier")]
    DuplicatePlacement { track_id: TrackId, tier_id: TierId },

    #[error("Unknown tier: {0}")]
    UnknownTier(TierId),

    #[error("Track {0} is not placed")]
    NotPlaced(TrackId),

    #[error("Tier order must list every tier exactly once")]
    InvalidTierOrder,
}

/// In-memory track/tier registry
#[derive(Debug, Default)]
pub struct TierRegistry {
    /// Track data for every placed track
    tracks: HashMap<TrackId, Track>,
    /// Lobby membership, kept in insertion order for display
    lobby: Vec<TrackId>,
    tiers: Vec<Tier>,
    /// Current placement of every placed track
    index: HashMap<TrackId, Placement>,
    events: Option<EventBus>,
}

impl TierRegistry {
    /// Empty registry with no tiers
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the six default tiers S, A, B, C, D, F
    pub fn with_default_tiers() -> Self {
        let mut registry = Self::new();
        for label in DEFAULT_TIER_LABELS {
            registry.add_tier(label);
        }
        registry
    }

    /// Publish every subsequent mutation on `bus`
    pub fn attach_events(&mut self, bus: EventBus) {
        self.events = Some(bus);
    }

    pub fn events(&self) -> Option<&EventBus> {
        self.events.as_ref()
    }

    fn publish(&self, event: TierEvent) {
        if let Some(bus) = &self.events {
            bus.emit_lossy(event);
        }
    }

    // ========================================
    // Queries
    // ========================================

    pub fn placement_of(&self, track_id: &str) -> Option<Placement> {
        self.index.get(track_id).copied()
    }

    pub fn is_placed(&self, track_id: &str) -> bool {
        self.index.contains_key(track_id)
    }

    /// Track data for a placed track
    pub fn track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.get(track_id)
    }

    pub fn lobby(&self) -> &[TrackId] {
        &self.lobby
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier(&self, tier_id: TierId) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.id == tier_id)
    }

    /// First tier whose label matches case-insensitively
    pub fn tier_by_label(&self, label: &str) -> Option<&Tier> {
        let wanted = label.trim();
        self.tiers
            .iter()
            .find(|t| t.label.trim().eq_ignore_ascii_case(wanted))
    }

    /// Playable URIs of a tier's tracks, in tier order
    pub fn tier_uris(&self, tier_id: TierId) -> Result<Vec<String>, RegistryError> {
        let tier = self.tier(tier_id).ok_or(RegistryError::UnknownTier(tier_id))?;
        Ok(tier
            .tracks
            .iter()
            .filter_map(|id| self.tracks.get(id))
            .map(|track| track.uri.clone())
            .collect())
    }

    /// Number of tracks placed in the lobby or any tier
    pub fn placed_count(&self) -> usize {
        self.index.len()
    }

    fn tier_position(&self, tier_id: TierId) -> Result<usize, RegistryError> {
        self.tiers
            .iter()
            .position(|t| t.id == tier_id)
            .ok_or(RegistryError::UnknownTier(tier_id))
    }

    fn sequence_mut(&mut self, placement: Placement) -> Result<&mut Vec<TrackId>, RegistryError> {
        match placement {
            Placement::Lobby => Ok(&mut self.lobby),
            Placement::Tier(tier_id) => {
                let pos = self.tier_position(tier_id)?;
                Ok(&mut self.tiers[pos].tracks)
            }
        }
    }

    /// Detach a track from its sequence without touching index or track data
    fn detach(&mut self, track_id: &TrackId, placement: Placement) {
        if let Ok(sequence) = self.sequence_mut(placement) {
            if let Some(pos) = sequence.iter().position(|id| id == track_id) {
                sequence.remove(pos);
            }
        }
    }

    /// Insert into a sequence at `index` (clamped), or append
    fn attach(
        &mut self,
        track_id: TrackId,
        placement: Placement,
        index: Option<usize>,
    ) -> Result<usize, RegistryError> {
        let sequence = self.sequence_mut(placement)?;
        let pos = index.unwrap_or(sequence.len()).min(sequence.len());
        sequence.insert(pos, track_id);
        Ok(pos)
    }

    // ========================================
    // Placement
    // ========================================

    /// Add a track to the lobby unless it is already placed anywhere
    pub fn place_in_lobby(&mut self, track: Track) -> LobbyOutcome {
        if let Some(existing) = self.placement_of(track.id.as_str()) {
            debug!(track_id = %track.id, ?existing, "Track already placed, lobby add skipped");
            return LobbyOutcome::AlreadyPlaced(existing);
        }

        let track_id = track.id.clone();
        self.lobby.push(track_id.clone());
        self.index.insert(track_id.clone(), Placement::Lobby);
        self.tracks.insert(track_id.clone(), track);

        self.publish(TierEvent::TrackPlaced {
            track_id,
            from: None,
            to: Placement::Lobby,
            index: self.lobby.len() - 1,
        });
        LobbyOutcome::Added
    }

    /// Add every track not yet placed to the lobby, returning how many were added
    pub fn place_all_in_lobby<I>(&mut self, tracks: I) -> usize
    where
        I: IntoIterator<Item = Track>,
    {
        tracks
            .into_iter()
            .filter(|track| self.place_in_lobby(track.clone()) == LobbyOutcome::Added)
            .count()
    }

    /// Append a track to a tier
    ///
    /// Fails with [`RegistryError::DuplicatePlacement`] if the track is already
    /// in any tier. A track waiting in the lobby leaves the lobby.
    pub fn place_in_tier(&mut self, track: Track, tier_id: TierId) -> Result<(), RegistryError> {
        self.insert_in_tier(track, tier_id, None).map(|_| ())
    }

    /// Like [`place_in_tier`](Self::place_in_tier) but at a given position
    ///
    /// Returns the position the track landed at.
    pub fn insert_in_tier(
        &mut self,
        track: Track,
        tier_id: TierId,
        index: Option<usize>,
    ) -> Result<usize, RegistryError> {
        self.tier_position(tier_id)?;

        let previous = self.placement_of(track.id.as_str());
        if let Some(Placement::Tier(existing)) = previous {
            return Err(RegistryError::DuplicatePlacement {
                track_id: track.id,
                tier_id: existing,
            });
        }

        let track_id = track.id.clone();
        if previous == Some(Placement::Lobby) {
            self.detach(&track_id, Placement::Lobby);
        }

        let to = Placement::Tier(tier_id);
        let pos = self.attach(track_id.clone(), to, index)?;
        self.index.insert(track_id.clone(), to);
        self.tracks.insert(track_id.clone(), track);

        debug!(track_id = %track_id, tier_id = %tier_id, pos, "Track placed in tier");
        self.publish(TierEvent::TrackPlaced {
            track_id,
            from: previous,
            to,
            index: pos,
        });
        Ok(pos)
    }

    /// Relocate an already placed track (drag move)
    ///
    /// The origin always loses the track, so a move never collides with the
    /// duplicate check. Moving within one sequence reorders it; `index` is
    /// interpreted after the track has been taken out. Returns the landing
    /// position.
    pub fn move_track(
        &mut self,
        track_id: &str,
        to: Placement,
        index: Option<usize>,
    ) -> Result<usize, RegistryError> {
        let from = self
            .placement_of(track_id)
            .ok_or_else(|| RegistryError::NotPlaced(TrackId::new(track_id)))?;
        if let Placement::Tier(tier_id) = to {
            self.tier_position(tier_id)?;
        }

        let track_id = TrackId::new(track_id);
        self.detach(&track_id, from);
        let pos = self.attach(track_id.clone(), to, index)?;
        self.index.insert(track_id.clone(), to);

        self.publish(TierEvent::TrackMoved {
            track_id,
            from,
            to,
            index: pos,
        });
        Ok(pos)
    }

    /// Remove a track from wherever it is placed
    ///
    /// Idempotent: returns the previous placement, or `None` if the track
    /// was not placed.
    pub fn remove_placement(&mut self, track_id: &str) -> Option<Placement> {
        let (track_id, from) = self.index.remove_entry(track_id)?;
        self.detach(&track_id, from);
        self.tracks.remove(&track_id);

        self.publish(TierEvent::TrackRemoved { track_id, from });
        Some(from)
    }

    /// Unplace every lobby track, returning the cleared identifiers
    pub fn clear_lobby(&mut self) -> Vec<TrackId> {
        let cleared = std::mem::take(&mut self.lobby);
        for track_id in &cleared {
            self.index.remove(track_id);
            self.tracks.remove(track_id);
        }

        self.publish(TierEvent::LobbyCleared {
            cleared: cleared.clone(),
        });
        cleared
    }

    // ========================================
    // Tier structure
    // ========================================

    /// Append a new empty tier at the bottom
    pub fn add_tier(&mut self, label: impl Into<String>) -> TierId {
        let tier = Tier::new(label.into());
        let tier_id = tier.id;
        let label = tier.label.clone();
        self.tiers.push(tier);

        self.publish(TierEvent::TierAdded { tier_id, label });
        tier_id
    }

    pub fn rename_tier(&mut self, tier_id: TierId, label: impl Into<String>) -> Result<(), RegistryError> {
        let pos = self.tier_position(tier_id)?;
        let label = label.into();
        self.tiers[pos].label = label.clone();

        self.publish(TierEvent::TierRenamed { tier_id, label });
        Ok(())
    }

    /// Delete a tier; its tracks become unplaced (not returned to the lobby)
    pub fn delete_tier(&mut self, tier_id: TierId) -> Result<Vec<TrackId>, RegistryError> {
        let pos = self.tier_position(tier_id)?;
        let tier = self.tiers.remove(pos);
        for track_id in &tier.tracks {
            self.index.remove(track_id);
            self.tracks.remove(track_id);
        }

        debug!(tier_id = %tier_id, discarded = tier.tracks.len(), "Tier deleted");
        self.publish(TierEvent::TierDeleted {
            tier_id,
            discarded: tier.tracks.clone(),
        });
        Ok(tier.tracks)
    }

    /// Replace the tier order; `new_order` must be a permutation of the tiers
    pub fn reorder_tiers(&mut self, new_order: &[TierId]) -> Result<(), RegistryError> {
        let unique: HashSet<&TierId> = new_order.iter().collect();
        if new_order.len() != self.tiers.len()
            || unique.len() != new_order.len()
            || new_order.iter().any(|id| self.tier(*id).is_none())
        {
            return Err(RegistryError::InvalidTierOrder);
        }

        let mut by_id: HashMap<TierId, Tier> =
            self.tiers.drain(..).map(|tier| (tier.id, tier)).collect();
        self.tiers = new_order
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        self.publish(TierEvent::TiersReordered {
            order: new_order.to_vec(),
        });
        Ok(())
    }

    /// Swap a tier with the one above it; returns false at the top
    pub fn move_tier_up(&mut self, tier_id: TierId) -> Result<bool, RegistryError> {
        let pos = self.tier_position(tier_id)?;
        if pos == 0 {
            return Ok(false);
        }
        self.swap_tiers(pos - 1, pos);
        Ok(true)
    }

    /// Swap a tier with the one below it; returns false at the bottom
    pub fn move_tier_down(&mut self, tier_id: TierId) -> Result<bool, RegistryError> {
        let pos = self.tier_position(tier_id)?;
        if pos + 1 >= self.tiers.len() {
            return Ok(false);
        }
        self.swap_tiers(pos, pos + 1);
        Ok(true)
    }

    fn swap_tiers(&mut self, a: usize, b: usize) {
        self.tiers.swap(a, b);
        self.publish(TierEvent::TiersReordered {
            order: self.tiers.iter().map(|t| t.id).collect(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track {
            id: TrackId::new(id),
            name: Some(format!("Track {}", id)),
            uri: format!("spotify:track:{}", id),
            ..Default::default()
        }
    }

    fn tier_id(registry: &TierRegistry, label: &str) -> TierId {
        registry.tier_by_label(label).unwrap().id()
    }

    #[test]
    fn test_default_tiers() {
        let registry = TierRegistry::with_default_tiers();
        let labels: Vec<&str> = registry.tiers().iter().map(|t| t.label()).collect();
        assert_eq!(labels, DEFAULT_TIER_LABELS);
        assert!(registry.tiers().iter().all(|t| t.is_empty()));
    }

    #[test]
    fn test_place_in_tier_moves_out_of_lobby() {
        let mut registry = TierRegistry::with_default_tiers();
        let s = tier_id(&registry, "S");

        assert_eq!(registry.place_in_lobby(track("T1")), LobbyOutcome::Added);
        registry.place_in_tier(track("T1"), s).unwrap();

        assert!(registry.lobby().is_empty());
        assert_eq!(registry.tier(s).unwrap().track_ids(), &[TrackId::new("T1")]);
        assert_eq!(registry.placement_of("T1"), Some(Placement::Tier(s)));
    }

    #[test]
    fn test_place_in_tier_twice_is_duplicate() {
        let mut registry = TierRegistry::with_default_tiers();
        let s = tier_id(&registry, "S");
        let a = tier_id(&registry, "A");

        registry.place_in_tier(track("T1"), s).unwrap();
        let err = registry.place_in_tier(track("T1"), a).unwrap_err();

        assert_eq!(
            err,
            RegistryError::DuplicatePlacement {
                track_id: TrackId::new("T1"),
                tier_id: s,
            }
        );
        assert_eq!(registry.tier(s).unwrap().len(), 1);
        assert!(registry.tier(a).unwrap().is_empty());
    }

    #[test]
    fn test_place_in_unknown_tier_leaves_lobby() {
        let mut registry = TierRegistry::new();
        registry.place_in_lobby(track("T1"));
        let bogus = TierId::new();

        assert_eq!(
            registry.place_in_tier(track("T1"), bogus),
            Err(RegistryError::UnknownTier(bogus))
        );
        assert_eq!(registry.placement_of("T1"), Some(Placement::Lobby));
    }

    #[test]
    fn test_lobby_add_reports_existing_placement() {
        let mut registry = TierRegistry::with_default_tiers();
        let b = tier_id(&registry, "B");
        registry.place_in_tier(track("T1"), b).unwrap();

        assert_eq!(
            registry.place_in_lobby(track("T1")),
            LobbyOutcome::AlreadyPlaced(Placement::Tier(b))
        );
        assert_eq!(
            registry.place_in_lobby(track("T2")),
            LobbyOutcome::Added
        );
        assert_eq!(
            registry.place_in_lobby(track("T2")),
            LobbyOutcome::AlreadyPlaced(Placement::Lobby)
        );
        assert_eq!(registry.lobby().len(), 1);
    }

    #[test]
    fn test_remove_placement_is_idempotent() {
        let mut registry = TierRegistry::with_default_tiers();
        let c = tier_id(&registry, "C");
        registry.place_in_tier(track("T1"), c).unwrap();

        assert_eq!(registry.remove_placement("T1"), Some(Placement::Tier(c)));
        assert_eq!(registry.remove_placement("T1"), None);
        assert!(registry.tier(c).unwrap().is_empty());
        assert!(registry.track("T1").is_none());
    }

    #[test]
    fn test_move_track_between_tiers_and_reorder() {
        let mut registry = TierRegistry::with_default_tiers();
        let s = tier_id(&registry, "S");
        let a = tier_id(&registry, "A");
        for id in ["T1", "T2", "T3"] {
            registry.place_in_tier(track(id), s).unwrap();
        }

        // Reorder within S: T3 to the front
        assert_eq!(registry.move_track("T3", Placement::Tier(s), Some(0)).unwrap(), 0);
        let order: Vec<&str> = registry.tier(s).unwrap().track_ids().iter().map(|t| t.as_str()).collect();
        assert_eq!(order, ["T3", "T1", "T2"]);

        // Move T1 to A with an out-of-range index (clamped to append)
        assert_eq!(registry.move_track("T1", Placement::Tier(a), Some(99)).unwrap(), 0);
        assert_eq!(registry.placement_of("T1"), Some(Placement::Tier(a)));
        assert_eq!(registry.tier(s).unwrap().len(), 2);

        // Back to the lobby
        registry.move_track("T2", Placement::Lobby, None).unwrap();
        assert_eq!(registry.lobby(), &[TrackId::new("T2")]);
    }

    #[test]
    fn test_move_unplaced_track_fails() {
        let mut registry = TierRegistry::with_default_tiers();
        assert_eq!(
            registry.move_track("ghost", Placement::Lobby, None),
            Err(RegistryError::NotPlaced(TrackId::new("ghost")))
        );
    }

    #[test]
    fn test_delete_tier_discards_tracks() {
        let mut registry = TierRegistry::with_default_tiers();
        let d = tier_id(&registry, "D");
        registry.place_in_tier(track("T1"), d).unwrap();
        registry.place_in_tier(track("T2"), d).unwrap();
        registry.place_in_lobby(track("T3"));

        let discarded = registry.delete_tier(d).unwrap();

        assert_eq!(discarded, vec![TrackId::new("T1"), TrackId::new("T2")]);
        assert_eq!(registry.tiers().len(), 5);
        assert_eq!(registry.placement_of("T1"), None);
        // Not silently relocated to the lobby
        assert_eq!(registry.lobby(), &[TrackId::new("T3")]);
        assert_eq!(registry.placed_count(), 1);

        // A discarded track may be placed again
        let s = tier_id(&registry, "S");
        registry.place_in_tier(track("T1"), s).unwrap();
    }

    #[test]
    fn test_reorder_tiers_requires_permutation() {
        let mut registry = TierRegistry::with_default_tiers();
        let mut order: Vec<TierId> = registry.tiers().iter().map(|t| t.id()).collect();
        order.reverse();

        registry.reorder_tiers(&order).unwrap();
        assert_eq!(registry.tiers()[0].label(), "F");

        let mut duplicated = order.clone();
        duplicated[1] = duplicated[0];
        assert_eq!(registry.reorder_tiers(&duplicated), Err(RegistryError::InvalidTierOrder));
        assert_eq!(registry.reorder_tiers(&order[..3]), Err(RegistryError::InvalidTierOrder));
        assert_eq!(registry.tiers()[0].label(), "F");
    }

    #[test]
    fn test_move_tier_up_and_down_at_edges() {
        let mut registry = TierRegistry::with_default_tiers();
        let s = tier_id(&registry, "S");
        let f = tier_id(&registry, "F");

        assert!(!registry.move_tier_up(s).unwrap());
        assert!(!registry.move_tier_down(f).unwrap());
        assert!(registry.move_tier_down(s).unwrap());
        assert_eq!(registry.tiers()[0].label(), "A");
        assert_eq!(registry.tiers()[1].label(), "S");
    }

    #[test]
    fn test_clear_lobby_unplaces_tracks() {
        let mut registry = TierRegistry::with_default_tiers();
        assert_eq!(registry.place_all_in_lobby(vec![track("T1"), track("T2"), track("T1")]), 2);

        let cleared = registry.clear_lobby();
        assert_eq!(cleared.len(), 2);
        assert!(registry.lobby().is_empty());
        assert!(!registry.is_placed("T1"));
    }

    #[test]
    fn test_rename_and_label_lookup() {
        let mut registry = TierRegistry::with_default_tiers();
        let s = tier_id(&registry, "S");
        registry.rename_tier(s, "goat").unwrap();

        assert_eq!(registry.tier_by_label("GOAT").unwrap().id(), s);
        assert!(registry.tier_by_label("S").is_none());
    }

    #[test]
    fn test_tier_uris_in_order() {
        let mut registry = TierRegistry::with_default_tiers();
        let a = tier_id(&registry, "A");
        registry.place_in_tier(track("T2"), a).unwrap();
        registry.place_in_tier(track("T1"), a).unwrap();

        assert_eq!(
            registry.tier_uris(a).unwrap(),
            vec!["spotify:track:T2".to_string(), "spotify:track:T1".to_string()]
        );
    }

    #[test]
    fn test_mutations_publish_events() {
        let mut registry = TierRegistry::with_default_tiers();
        let bus = EventBus::new(32);
        let mut rx = bus.subscribe();
        registry.attach_events(bus);
        let s = tier_id(&registry, "S");

        registry.place_in_lobby(track("T1"));
        registry.place_in_tier(track("T1"), s).unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            TierEvent::TrackPlaced {
                track_id: TrackId::new("T1"),
                from: None,
                to: Placement::Lobby,
                index: 0,
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            TierEvent::TrackPlaced {
                track_id: TrackId::new("T1"),
                from: Some(Placement::Lobby),
                to: Placement::Tier(s),
                index: 0,
            }
        );
        assert!(rx.try_recv().is_err());
    }
}
