//! Integration tests for the single-placement invariant
//!
//! Tests cover:
//! - A track id never appears in two tiers, or in a tier and the lobby
//! - The placement index agrees with the lobby and tier sequences
//! - Rejected placements leave every location unchanged
//! - Deleting a tier drops its tracks from the tracked set

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use stm_common::placement::{apply_drop, DragSource, DropTarget};
use stm_common::registry::{LobbyOutcome, RegistryError};
use stm_common::{Placement, TierRegistry, Track, TrackId};

fn track(id: &str) -> Track {
    Track {
        id: TrackId::new(id),
        name: Some(id.to_string()),
        uri: format!("spotify:track:{}", id),
        ..Default::default()
    }
}

/// Test helper: verify sequences and index describe the same placements
fn assert_invariant(registry: &TierRegistry) {
    let mut seen = HashSet::new();

    for id in registry.lobby() {
        assert!(seen.insert(id.clone()), "{} placed twice", id);
        assert_eq!(registry.placement_of(id.as_str()), Some(Placement::Lobby));
    }
    for tier in registry.tiers() {
        for id in tier.track_ids() {
            assert!(seen.insert(id.clone()), "{} placed twice", id);
            assert_eq!(registry.placement_of(id.as_str()), Some(Placement::Tier(tier.id())));
            assert!(registry.track(id.as_str()).is_some());
        }
    }
    assert_eq!(seen.len(), registry.placed_count());
}

// =============================================================================
// Worked example
// =============================================================================

#[test]
fn test_lobby_to_tier_then_duplicate() {
    let mut registry = TierRegistry::with_default_tiers();
    let s = registry.tier_by_label("S").unwrap().id();
    assert_eq!(registry.place_in_lobby(track("T1")), LobbyOutcome::Added);

    registry.place_in_tier(track("T1"), s).unwrap();
    assert!(registry.lobby().is_empty());
    assert_eq!(registry.tier(s).unwrap().track_ids(), &[TrackId::new("T1")]);

    let err = registry.place_in_tier(track("T1"), s).unwrap_err();
    assert!(matches!(err, RegistryError::DuplicatePlacement { .. }));
    assert!(registry.lobby().is_empty());
    assert_eq!(registry.tier(s).unwrap().track_ids(), &[TrackId::new("T1")]);
    assert_invariant(&registry);
}

#[test]
fn test_deleted_tier_tracks_leave_tracked_set() {
    let mut registry = TierRegistry::with_default_tiers();
    let a = registry.tier_by_label("A").unwrap().id();
    registry.place_in_tier(track("T1"), a).unwrap();
    registry.place_in_tier(track("T2"), a).unwrap();

    registry.delete_tier(a).unwrap();

    assert_eq!(registry.placed_count(), 0);
    assert!(registry.lobby().is_empty());
    assert!(registry.placement_of("T1").is_none());
    assert_invariant(&registry);
}

// =============================================================================
// Randomized operation sequences
// =============================================================================

#[test]
fn test_random_operations_preserve_invariant() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut registry = TierRegistry::with_default_tiers();
    let pool: Vec<Track> = (0..24).map(|i| track(&format!("T{}", i))).collect();

    for step in 0..2_000 {
        let t = &pool[rng.gen_range(0..pool.len())];
        let tier_ids: Vec<_> = registry.tiers().iter().map(|tier| tier.id()).collect();
        let random_tier = |rng: &mut StdRng| tier_ids[rng.gen_range(0..tier_ids.len())];

        match rng.gen_range(0..9) {
            0 => {
                registry.place_in_lobby(t.clone());
            }
            1 => {
                let tier = random_tier(&mut rng);
                let before_lobby = registry.lobby().to_vec();
                let before_placement = registry.placement_of(t.id.as_str());
                if let Err(RegistryError::DuplicatePlacement { .. }) = registry.place_in_tier(t.clone(), tier) {
                    assert_eq!(registry.lobby(), before_lobby.as_slice());
                    assert_eq!(registry.placement_of(t.id.as_str()), before_placement);
                }
            }
            2 => {
                registry.remove_placement(t.id.as_str());
            }
            3 => {
                if let Some(placement) = registry.placement_of(t.id.as_str()) {
                    let source = match placement {
                        Placement::Lobby => DragSource::Lobby,
                        Placement::Tier(id) => DragSource::Tier(id),
                    };
                    let target = if rng.gen_bool(0.3) {
                        DropTarget::Lobby
                    } else {
                        DropTarget::Tier(random_tier(&mut rng))
                    };
                    let index = Some(rng.gen_range(0..5));
                    apply_drop(&mut registry, t, source, target, index).unwrap();
                }
            }
            4 => {
                let target = DropTarget::Tier(random_tier(&mut rng));
                let _ = apply_drop(&mut registry, t, DragSource::SearchResults, target, None);
            }
            5 if step % 50 == 0 && tier_ids.len() > 1 => {
                let tier = random_tier(&mut rng);
                let discarded = registry.delete_tier(tier).unwrap();
                for id in discarded {
                    assert!(registry.placement_of(id.as_str()).is_none());
                }
            }
            6 if step % 40 == 0 => {
                registry.add_tier(format!("X{}", step));
            }
            7 => {
                let mut order = tier_ids.clone();
                order.rotate_left(1);
                registry.reorder_tiers(&order).unwrap();
            }
            8 if step % 25 == 0 => {
                registry.clear_lobby();
                assert!(registry.lobby().is_empty());
            }
            _ => {}
        }

        assert_invariant(&registry);
    }
}
