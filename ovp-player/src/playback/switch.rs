//! Switch state machine support types
//!
//! The engine drives the Steady/Switching state, the render checkpoint
//! ledger, and the generation-keyed handoff poll bookkeeping defined here.

use crate::pipeline::PipelineId;
use std::collections::VecDeque;

/// State of the track-switch machinery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    /// No switch in flight; the live pipeline keeps prefetching its track
    Steady,

    /// The standby pipeline is prefetching a newly selected track
    Switching,
}

impl std::fmt::Display for SwitchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitchState::Steady => write!(f, "steady"),
            SwitchState::Switching => write!(f, "switching"),
        }
    }
}

/// Where a freshly recorded checkpoint goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckpointAction {
    /// First checkpoint of a switch burst: push to the renderer now
    PushNow(f64),

    /// A switch is already in flight: queued behind it
    Queued,
}

/// Render checkpoint ledger.
///
/// Each committed switch bounds how long the renderer may keep showing the
/// outgoing geometry. The first checkpoint of a burst goes straight to the
/// renderer; later ones queue and are drained one per completed handoff.
#[derive(Debug, Default)]
pub struct Checkpoints {
    /// A checkpoint has been pushed and not yet fully drained
    active: bool,

    queued: VecDeque<f64>,
}

impl Checkpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a checkpoint for a freshly committed switch
    pub fn record(&mut self, seconds: f64) -> CheckpointAction {
        if !self.active {
            self.active = true;
            CheckpointAction::PushNow(seconds)
        } else {
            self.queued.push_back(seconds);
            CheckpointAction::Queued
        }
    }

    /// Drain one checkpoint at handoff.
    ///
    /// `Some(next)` keeps the switch flag up with the next bound; `None`
    /// means the burst is over and the renderer's switch flag clears.
    pub fn drain_one(&mut self) -> Option<f64> {
        match self.queued.pop_front() {
            Some(next) => Some(next),
            None => {
                self.active = false;
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.queued.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Bookkeeping for one armed handoff poll.
///
/// The poll is anchored to the live pipeline's position captured when it
/// was armed; a tick observing a different position means an unrelated
/// pause/seek happened and the poll is stale. The generation number
/// invalidates ticks from an aborted poll task that were already in
/// flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffPoll {
    pub generation: u64,
    pub reference_ms: u64,
    pub standby: PipelineId,
}
