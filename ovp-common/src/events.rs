//! Event types for the OVP player
//!
//! Provides the shared event enum and the EventBus used to broadcast
//! playback lifecycle events to observers (metrics, UI glue, tests).
//!
//! # Architecture
//!
//! OVP uses hybrid communication:
//! - **EventBus** (tokio::broadcast): one-to-many lifecycle broadcasting
//! - **Command channels** (tokio::mpsc): request → single handler
//!
//! Events are fire-and-forget; the engine never blocks on a slow observer.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Identifier of one tile track within the current manifest.
///
/// Valid only for the manifest it was resolved against; no uniqueness
/// guarantee beyond that.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TrackId(pub u32);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Stopped => write!(f, "stopped"),
        }
    }
}

/// OVP player event types
///
/// Broadcast via [`EventBus`]; serializable for transmission to UI glue.
/// Every event carries the session id so observers can discard events from
/// a torn-down session after a reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Playback state changed (Playing ↔ Paused ↔ Stopped)
    PlaybackStateChanged {
        session_id: Uuid,
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A media segment request was issued to the fetcher
    SegmentRequested {
        session_id: Uuid,
        track_id: TrackId,
        segment: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track switch was committed and is prefetching on the standby
    /// pipeline
    SwitchPending {
        session_id: Uuid,
        track_id: TrackId,
        trigger_segment: u64,
        /// Switches queued including this one
        queue_depth: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A pending switch was handed off; the standby pipeline is now live
    SwitchCompleted {
        session_id: Uuid,
        track_id: TrackId,
        trigger_segment: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Content ended; `looping` tells whether a restart follows
    EndOfContent {
        session_id: Uuid,
        looping: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback restarted from segment 1 with the session-start selection
    LoopRestarted {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The session was torn down via reset
    SessionReset {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for [`PlayerEvent`]
///
/// Thin wrapper over `tokio::sync::broadcast` with a lossy emit for hot
/// paths that must not care whether anyone is listening.
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` when nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
