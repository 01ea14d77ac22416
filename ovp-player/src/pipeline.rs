//! Media pipeline abstraction for dual-buffer playback
//!
//! Two structurally identical pipelines buffer one track each. Exactly one
//! is live (feeding the renderer) at any time; the other silently
//! prefetches a newly selected track ahead of a handoff. The pair is
//! owned by the player engine and the role assignment is mutated only by
//! the switch machinery, atomically with the handoff.

use ovp_common::events::TrackId;
use serde::{Deserialize, Serialize};

/// Identity of one of the two pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineId {
    Main,
    Sub,
}

impl PipelineId {
    /// Get the other pipeline
    pub fn other(&self) -> Self {
        match self {
            PipelineId::Main => PipelineId::Sub,
            PipelineId::Sub => PipelineId::Main,
        }
    }

    /// Stable index for per-pipeline bookkeeping arrays
    pub fn index(&self) -> usize {
        match self {
            PipelineId::Main => 0,
            PipelineId::Sub => 1,
        }
    }
}

impl std::fmt::Display for PipelineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineId::Main => write!(f, "main"),
            PipelineId::Sub => write!(f, "sub"),
        }
    }
}

/// Role a pipeline currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineRole {
    /// Feeding the rendered output
    Live,
    /// Prefetching ahead of a handoff
    Standby,
}

/// One buffered media pipeline (decode buffer + render surface).
///
/// Implemented by the media engine. `position_ms` is the pipeline's own
/// elapsed media time since it last took over playback; the engine adds
/// the committed buffer offset to obtain the overall playback position.
pub trait MediaPipeline: Send {
    /// Direct subsequent segment appends at the given track.
    ///
    /// Returns false when the pipeline cannot accept the track yet; the
    /// caller must not advance the segment index.
    fn set_active_track(&mut self, track: TrackId, segment: u64) -> bool;

    /// Whether contiguous data is buffered through `position_ms`
    fn has_buffered_through(&self, position_ms: u64) -> bool;

    /// Number of segments appended to this pipeline so far
    fn buffered_segment_count(&self) -> u64;

    /// Elapsed media time since this pipeline last became live
    fn position_ms(&self) -> u64;

    /// Whether any bufferable data remains ahead of the play position
    fn has_buffered_data(&self) -> bool;

    /// Start or resume this pipeline's media element
    fn play(&mut self);

    /// Pause this pipeline's media element
    fn pause(&mut self);

    /// Release buffered media.
    ///
    /// `full` additionally re-initializes the pipeline for a fresh session
    /// start; the pipeline emits [`PipelineEvent::ResetComplete`] once that
    /// re-initialization has finished.
    fn tear_down_buffer(&mut self, full: bool);
}

/// Events emitted by the media pipelines toward the engine
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A fetched segment was appended to a decode buffer
    SegmentProcessed { segment: u64 },

    /// The pipeline needs its render geometry re-mapped for a track
    GeometrySwitch { id: PipelineId, track: TrackId },

    /// The pipeline's render surface can take over playback
    SurfaceReady { id: PipelineId },

    /// The pipeline ran out of buffered data at its current position
    Stalled { id: PipelineId, position_ms: u64 },

    /// The final segment of the content has been appended
    EndOfContent,

    /// A full teardown finished and the pipeline is ready for segment 1
    ResetComplete,
}

/// The two pipelines plus the single live-role assignment.
///
/// Replaces parallel "main"/"sub" call sites with one structure indexed by
/// [`PipelineId`]; exactly one pipeline is live at all times.
pub struct PipelinePair {
    main: Box<dyn MediaPipeline>,
    sub: Box<dyn MediaPipeline>,
    live: PipelineId,
}

impl PipelinePair {
    /// Create a pair with `Main` live, the session-start assignment
    pub fn new(main: Box<dyn MediaPipeline>, sub: Box<dyn MediaPipeline>) -> Self {
        Self {
            main,
            sub,
            live: PipelineId::Main,
        }
    }

    /// Identity of the live pipeline
    pub fn live_id(&self) -> PipelineId {
        self.live
    }

    /// Identity of the standby pipeline
    pub fn standby_id(&self) -> PipelineId {
        self.live.other()
    }

    /// Role currently held by `id`
    pub fn role_of(&self, id: PipelineId) -> PipelineRole {
        if id == self.live {
            PipelineRole::Live
        } else {
            PipelineRole::Standby
        }
    }

    pub fn get(&self, id: PipelineId) -> &dyn MediaPipeline {
        match id {
            PipelineId::Main => self.main.as_ref(),
            PipelineId::Sub => self.sub.as_ref(),
        }
    }

    pub fn get_mut(&mut self, id: PipelineId) -> &mut dyn MediaPipeline {
        match id {
            PipelineId::Main => self.main.as_mut(),
            PipelineId::Sub => self.sub.as_mut(),
        }
    }

    pub fn live(&self) -> &dyn MediaPipeline {
        self.get(self.live)
    }

    pub fn live_mut(&mut self) -> &mut dyn MediaPipeline {
        self.get_mut(self.live)
    }

    /// Swap roles: the standby pipeline becomes live.
    ///
    /// Callers perform the surrounding handoff steps (surface promotion,
    /// buffer offset, teardown of the demoted pipeline) atomically with
    /// this call.
    pub fn promote_standby(&mut self) {
        self.live = self.live.other();
    }

    /// Force `Main` live again, used on reset and loop restart
    pub fn force_main_live(&mut self) {
        self.live = PipelineId::Main;
    }
}
