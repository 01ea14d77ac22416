//! Manifest resolver contract
//!
//! The manifest parser lives outside the core; the scheduler only needs to
//! map a gaze angle and segment index onto a tile track and a set of
//! request descriptors. Resolution may legitimately fail for an
//! angle/segment combination; the scheduler retries the same index on the
//! next step rather than advancing past a missing segment.

use ovp_common::events::TrackId;

/// One segment request to hand to the fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Resolved media URL for this segment
    pub url: String,

    /// Segment index the request belongs to
    pub segment: u64,
}

/// Resolves viewport angles to tile tracks and segment requests.
///
/// Implemented by the manifest parser. All methods are read-only; the core
/// calls them once per scheduling decision.
pub trait TrackResolver: Send + Sync {
    /// Resolve the tile track covering (yaw, pitch) for a segment.
    ///
    /// `None` means no mapping exists; the scheduling step is skipped and
    /// retried with the same segment index.
    fn resolve_track(&self, yaw: f64, pitch: f64, segment: u64) -> Option<TrackId>;

    /// Build the media segment requests for (yaw, pitch) at a segment.
    ///
    /// An empty vector is treated like a failed resolution.
    fn segment_requests(&self, yaw: f64, pitch: f64, segment: u64) -> Vec<RequestDescriptor>;

    /// Index of the final segment of the content, 0 when unknown
    fn last_segment_number(&self) -> u64;

    /// Declared frame rate, if the manifest carries one
    fn fps(&self) -> Option<f64>;

    /// Frames per media segment at the given frame rate
    fn frames_per_segment(&self, fps: f64) -> u32;
}
