//! Renderer contract
//!
//! The 3D renderer projects decoded frames onto the viewing sphere and
//! owns the camera. The core reads the viewport once per scheduling
//! decision and steers the renderer around track switches: which surface
//! is in the foreground, whether a switch is pending, and up to which
//! playback time the old geometry may still be shown.

use crate::pipeline::PipelineId;
use ovp_common::events::TrackId;

/// Current gaze angle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub yaw: f64,
    pub pitch: f64,
}

/// Control surface the core drives on the renderer.
///
/// All calls are fire-and-forget except `viewport`, which is a read.
pub trait RenderControl: Send + Sync {
    /// Current viewport angle
    fn viewport(&self) -> Viewport;

    /// Tell the renderer a track switch is (or is no longer) in flight
    fn notify_switch_pending(&self, pending: bool);

    /// Upper bound, in seconds, on the playback time up to which the
    /// current geometry remains valid
    fn set_max_checkpoint(&self, seconds: f64);

    /// Promote the given pipeline's render surface to the foreground
    fn promote_foreground(&self, id: PipelineId);

    /// Signal which surface's texture set the next track change applies to
    fn ready_for_track_change(&self, standby_surface: bool);

    /// Pause or resume the render animation loop
    fn pause_animation(&self, paused: bool);

    /// Map a tile track's packing onto the given pipeline's geometry
    fn map_track_to_surface(&self, track: TrackId, id: PipelineId);
}
