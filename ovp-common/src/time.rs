//! Timestamp and segment timing utilities

use chrono::{DateTime, Utc};

/// Frame rate assumed when the manifest does not declare one
pub const FALLBACK_FPS: f64 = 30.0;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Derive the duration of one media segment in milliseconds.
///
/// Segments carry a fixed number of frames; duration follows from the
/// manifest frame rate. A missing or non-positive rate falls back to
/// [`FALLBACK_FPS`].
pub fn segment_duration_ms(frames_per_segment: u32, fps: Option<f64>) -> u64 {
    let fps = match fps {
        Some(f) if f > 0.0 => f,
        _ => FALLBACK_FPS,
    };
    (frames_per_segment as f64 * 1000.0 / fps) as u64
}
