//! Drag-and-drop placement semantics
//!
//! Decides whether a drop clones or moves, runs the registry's duplicate
//! check at drop time, and produces the canonical tier item that replaces
//! whatever representation was dragged in.
//!
//! - From search results: **clone** (the result list keeps the track)
//! - From the lobby or a tier: **move** (the origin loses the track)
//!
//! A rejected drop leaves the registry untouched and raises an error notice.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::events::Notice;
use crate::model::{Track, TrackId, TIER_ART_PLACEHOLDER};
use crate::registry::{LobbyOutcome, Placement, RegistryError, TierId, TierRegistry};

/// Notice text for a drop rejected by the duplicate check
pub const DUPLICATE_NOTICE: &str = "This track is already in a tier";

/// Where a dragged track came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragSource {
    SearchResults,
    Lobby,
    Tier(TierId),
}

/// Where a dragged track was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropTarget {
    Lobby,
    Tier(TierId),
}

impl From<DropTarget> for Placement {
    fn from(target: DropTarget) -> Self {
        match target {
            DropTarget::Lobby => Placement::Lobby,
            DropTarget::Tier(id) => Placement::Tier(id),
        }
    }
}

/// Canonical render of a track inside a tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierItem {
    pub track_id: TrackId,
    pub uri: String,
    pub title: String,
    pub art_url: String,
}

impl TierItem {
    pub fn from_track(track: &Track) -> Self {
        Self {
            track_id: track.id.clone(),
            uri: track.uri.clone(),
            title: track.title().to_string(),
            art_url: track.art_url().unwrap_or(TIER_ART_PLACEHOLDER).to_string(),
        }
    }
}

/// Successful drop result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Track now sits in a tier at `index`, rendered as `item`
    InTier { item: TierItem, index: usize },
    /// Track now sits in the lobby at `index`
    InLobby { index: usize },
    /// Dropping into the lobby a track that is already placed elsewhere
    AlreadyPlaced(Placement),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Duplicate check rejected the drop
    #[error("{notice}")]
    Rejected {
        notice: String,
        #[source]
        cause: RegistryError,
    },

    /// The dragged track is not where the drag claims it came from
    #[error("Track {track_id} is not in the drag source")]
    SourceMismatch { track_id: TrackId, origin: DragSource },

    /// Tier-select dialog named a label no tier carries
    #[error("No tier labelled {0}")]
    UnknownLabel(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Apply a drop of `track` from `source` onto `target` at `index`
///
/// `index` is the position inside the target sequence; `None` appends.
pub fn apply_drop(
    registry: &mut TierRegistry,
    track: &Track,
    source: DragSource,
    target: DropTarget,
    index: Option<usize>,
) -> Result<DropOutcome, PlacementError> {
    debug!(track_id = %track.id, ?source, ?target, ?index, "Applying drop");

    let result = match source {
        DragSource::SearchResults => clone_into(registry, track, target, index),
        DragSource::Lobby => move_into(registry, track, source, Placement::Lobby, target, index),
        DragSource::Tier(id) => move_into(registry, track, source, Placement::Tier(id), target, index),
    };

    if let Err(err @ PlacementError::Rejected { .. }) = &result {
        if let Some(bus) = registry.events() {
            bus.notify(Notice::error(err.to_string()));
        }
    }
    result
}

/// Tier-select dialog path: add `track` to the first tier labelled `label`
pub fn add_to_tier_by_label(
    registry: &mut TierRegistry,
    track: &Track,
    label: &str,
) -> Result<DropOutcome, PlacementError> {
    let Some(tier_id) = registry.tier_by_label(label).map(|t| t.id()) else {
        let err = PlacementError::UnknownLabel(label.trim().to_uppercase());
        if let Some(bus) = registry.events() {
            bus.notify(Notice::error(err.to_string()));
        }
        return Err(err);
    };
    apply_drop(registry, track, DragSource::SearchResults, DropTarget::Tier(tier_id), None)
}

fn clone_into(
    registry: &mut TierRegistry,
    track: &Track,
    target: DropTarget,
    index: Option<usize>,
) -> Result<DropOutcome, PlacementError> {
    match target {
        DropTarget::Lobby => match registry.place_in_lobby(track.clone()) {
            LobbyOutcome::Added => {
                let index = match index {
                    Some(i) => registry.move_track(track.id.as_str(), Placement::Lobby, Some(i))?,
                    None => registry.lobby().len() - 1,
                };
                Ok(DropOutcome::InLobby { index })
            }
            LobbyOutcome::AlreadyPlaced(existing) => Ok(DropOutcome::AlreadyPlaced(existing)),
        },
        DropTarget::Tier(tier_id) => {
            let index = registry
                .insert_in_tier(track.clone(), tier_id, index)
                .map_err(reject_duplicate)?;
            Ok(DropOutcome::InTier {
                item: canonical_item(registry, track),
                index,
            })
        }
    }
}

fn move_into(
    registry: &mut TierRegistry,
    track: &Track,
    source: DragSource,
    expected: Placement,
    target: DropTarget,
    index: Option<usize>,
) -> Result<DropOutcome, PlacementError> {
    if registry.placement_of(track.id.as_str()) != Some(expected) {
        return Err(PlacementError::SourceMismatch {
            track_id: track.id.clone(),
            origin: source,
        });
    }

    let index = registry.move_track(track.id.as_str(), target.into(), index)?;
    Ok(match target {
        DropTarget::Lobby => DropOutcome::InLobby { index },
        DropTarget::Tier(_) => DropOutcome::InTier {
            item: canonical_item(registry, track),
            index,
        },
    })
}

/// Prefer the registry's stored copy so the item reflects what is placed
fn canonical_item(registry: &TierRegistry, track: &Track) -> TierItem {
    TierItem::from_track(registry.track(track.id.as_str()).unwrap_or(track))
}

fn reject_duplicate(err: RegistryError) -> PlacementError {
    match err {
        RegistryError::DuplicatePlacement { .. } => PlacementError::Rejected {
            notice: DUPLICATE_NOTICE.to_string(),
            cause: err,
        },
        other => PlacementError::Registry(other),
    }
}
