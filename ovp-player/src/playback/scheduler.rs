//! Segment scheduler: per-segment track selection and prefetch pacing
//!
//! One decision per scheduling trigger: which track to request the next
//! segment for, whether that commits a track switch, and whether the
//! request must be deferred to respect the buffer budget. The scheduler
//! holds no channels or timers; the engine owns those and drives it.

use crate::manifest::TrackResolver;
use crate::playback::switch_queue::PendingSwitch;
use crate::render::Viewport;
use ovp_common::events::TrackId;
use tracing::debug;

/// A committed (track, viewport) selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub track: TrackId,
    pub yaw: f64,
    pub pitch: f64,
}

/// Outcome of one scheduling decision
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No track mapping for this angle/segment; retry the same index on
    /// the next trigger
    Skip { segment: u64 },

    /// Request this segment for the selected track.
    ///
    /// `yaw`/`pitch` are the effective angles after hysteresis (the
    /// committed ones when the raw resolution was suppressed). The caller
    /// advances the segment index only once the request was actually
    /// issued.
    Request {
        track: TrackId,
        yaw: f64,
        pitch: f64,
        segment: u64,
        /// Present when this decision commits a track switch
        divergence: Option<PendingSwitch>,
        /// First segment of a session or loop: map the track onto both
        /// render surfaces before issuing
        map_surfaces: bool,
    },
}

/// Deferral required before the next fetch may be issued, if any.
///
/// `buffer_available = last_buffered_segment * segment_duration − position`;
/// a fetch that would push buffered-ahead media past the budget by more
/// than one segment duration is deferred by exactly the overshoot.
pub fn backpressure_delay_ms(
    last_buffered_segment: u64,
    segment_duration_ms: u64,
    position_ms: u64,
    budget_ms: u64,
) -> Option<u64> {
    let buffer_available =
        (last_buffered_segment * segment_duration_ms) as i64 - position_ms as i64;
    let projected = buffer_available + segment_duration_ms as i64;
    if projected > budget_ms as i64 {
        Some((projected - budget_ms as i64) as u64)
    } else {
        None
    }
}

/// Viewport-adaptive segment scheduler
#[derive(Debug)]
pub struct SegmentScheduler {
    /// Next segment to request; starts at 1, strictly increasing until a
    /// loop restart
    segment_index: u64,

    /// Consecutive-divergence counter; a differing track is honored only
    /// once this reaches the threshold
    hysteresis: u32,

    hysteresis_threshold: u32,

    /// Selection the last issued segment was requested for
    committed: Option<Selection>,

    /// Selection captured at session start, restored on loop restart
    initial: Option<Selection>,

    /// Viewport-adaptive switching enabled; while false the committed
    /// track is always reused
    switching_enabled: bool,

    /// Next segment-1 decision restores `initial` instead of resolving
    restore_initial: bool,
}

impl SegmentScheduler {
    pub fn new(hysteresis_threshold: u32) -> Self {
        Self {
            segment_index: 1,
            hysteresis: 1,
            hysteresis_threshold: hysteresis_threshold.max(1),
            committed: None,
            initial: None,
            switching_enabled: true,
            restore_initial: false,
        }
    }

    /// Decide track and angles for the current segment index.
    ///
    /// Mutates the hysteresis counter and the committed selection; the
    /// segment index only advances via [`advance`](Self::advance) once the
    /// request was issued.
    pub fn next_decision(&mut self, viewport: Viewport, resolver: &dyn TrackResolver) -> Decision {
        let segment = self.segment_index;

        let Some(resolved) = resolver.resolve_track(viewport.yaw, viewport.pitch, segment) else {
            debug!(segment, "no track mapping, skipping scheduling step");
            return Decision::Skip { segment };
        };

        let mut selection = Selection {
            track: resolved,
            yaw: viewport.yaw,
            pitch: viewport.pitch,
        };
        let mut divergence = None;
        let mut map_surfaces = false;

        if segment == 1 {
            if self.restore_initial {
                if let Some(initial) = self.initial {
                    selection = initial;
                }
                self.restore_initial = false;
            }
            map_surfaces = true;
        } else if !self.switching_enabled {
            if let Some(committed) = self.committed {
                selection = committed;
            }
            self.hysteresis = self.hysteresis.saturating_add(1);
        } else if let Some(committed) = self.committed {
            if committed.track != selection.track {
                if self.hysteresis < self.hysteresis_threshold {
                    // Transient divergence: reuse the committed selection
                    selection = committed;
                    self.hysteresis = self.hysteresis.saturating_add(1);
                } else {
                    self.hysteresis = 1;
                    divergence = Some(PendingSwitch {
                        track_id: selection.track,
                        trigger_segment: segment,
                    });
                    debug!(
                        track = %selection.track,
                        segment,
                        "divergence committed after hysteresis"
                    );
                }
            } else if self.hysteresis >= self.hysteresis_threshold {
                self.hysteresis = 1;
            }
        }

        if self.initial.is_none() {
            self.initial = Some(selection);
        }
        self.committed = Some(selection);

        Decision::Request {
            track: selection.track,
            yaw: selection.yaw,
            pitch: selection.pitch,
            segment,
            divergence,
            map_surfaces,
        }
    }

    /// Advance to the next segment after a request was issued
    pub fn advance(&mut self) {
        self.segment_index += 1;
    }

    /// Next segment index to be requested
    pub fn segment_index(&self) -> u64 {
        self.segment_index
    }

    /// Last committed selection
    pub fn committed(&self) -> Option<Selection> {
        self.committed
    }

    pub fn set_switching_enabled(&mut self, enabled: bool) {
        self.switching_enabled = enabled;
    }

    /// Rewind to segment 1 for a loop restart, restoring the session-start
    /// selection on the next decision
    pub fn rewind_for_loop(&mut self) {
        self.segment_index = 1;
        self.hysteresis = 1;
        self.restore_initial = true;
    }

    /// Full session reset; forgets the session-start selection
    pub fn reset(&mut self) {
        self.segment_index = 1;
        self.hysteresis = 1;
        self.committed = None;
        self.initial = None;
        self.restore_initial = false;
    }
}
