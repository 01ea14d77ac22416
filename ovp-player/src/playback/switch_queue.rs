//! Switch queue: pending track switches in arrival order
//!
//! Divergence events are appended here and consumed by the switch state
//! machine during handoff, strictly first-in first-out. Later divergences
//! never preempt earlier ones, so the viewer's sequence of gaze changes is
//! honored in causal order even when network jitter lets a later track
//! finish buffering first.

use ovp_common::events::TrackId;
use std::collections::VecDeque;

/// A committed track switch awaiting handoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSwitch {
    /// Track the standby pipeline is prefetching
    pub track_id: TrackId,

    /// Segment index at which the divergence was detected; playback hands
    /// off at the preceding segment boundary
    pub trigger_segment: u64,
}

impl PendingSwitch {
    /// Playback position of the handoff point in milliseconds
    pub fn switch_position_ms(&self, segment_duration_ms: u64) -> u64 {
        self.trigger_segment.saturating_sub(1) * segment_duration_ms
    }
}

/// Strict FIFO of pending switches
#[derive(Debug, Default)]
pub struct SwitchQueue {
    inner: VecDeque<PendingSwitch>,
}

impl SwitchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a switch at the back
    pub fn enqueue(&mut self, switch: PendingSwitch) {
        self.inner.push_back(switch);
    }

    /// Oldest pending switch, if any
    pub fn front(&self) -> Option<&PendingSwitch> {
        self.inner.front()
    }

    /// Remove and return the oldest pending switch
    pub fn dequeue(&mut self) -> Option<PendingSwitch> {
        self.inner.pop_front()
    }

    /// Drop all pending switches (loop restart, reset)
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
