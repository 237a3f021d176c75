//! Registry change events and notices
//!
//! The registry publishes a [`TierEvent`] for every mutation. A rendering
//! layer subscribes through [`EventBus::subscribe`] and redraws only what
//! changed; user-visible notices travel over the same channel.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::TrackId;
use crate::registry::{Placement, TierId};

/// Tier maker event types
///
/// Serialized with a `type` tag so the same values can be pushed to a
/// browser over SSE or a websocket unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TierEvent {
    /// Track entered the lobby or a tier from the unplaced state or the lobby
    TrackPlaced {
        track_id: TrackId,
        /// Placement before the operation (`None` when it was unplaced)
        from: Option<Placement>,
        to: Placement,
        /// Position within the destination sequence
        index: usize,
    },

    /// Track relocated by a drag move (including reorder within one tier)
    TrackMoved {
        track_id: TrackId,
        from: Placement,
        to: Placement,
        index: usize,
    },

    /// Track no longer placed anywhere
    TrackRemoved { track_id: TrackId, from: Placement },

    TierAdded { tier_id: TierId, label: String },

    TierRenamed { tier_id: TierId, label: String },

    /// Tier deleted; its tracks became unplaced
    TierDeleted {
        tier_id: TierId,
        discarded: Vec<TrackId>,
    },

    /// Tier list order changed
    TiersReordered { order: Vec<TierId> },

    /// Every lobby track became unplaced
    LobbyCleared { cleared: Vec<TrackId> },

    /// User-visible notification
    Notice(Notice),
}

/// User-visible notification text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub is_error: bool,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_error: true,
        }
    }
}

/// Broadcast bus for [`TierEvent`]s
///
/// Cloning the bus shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TierEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    ///
    /// # Examples
    ///
    /// ```
    /// use stm_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TierEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, returning the number of subscribers reached
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: TierEvent) -> Result<usize, broadcast::error::SendError<TierEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: TierEvent) {
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, notice: Notice) {
        if notice.is_error {
            tracing::warn!(message = %notice.message, "Notice");
        } else {
            tracing::debug!(message = %notice.message, "Notice");
        }
        self.emit_lossy(TierEvent::Notice(notice));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
