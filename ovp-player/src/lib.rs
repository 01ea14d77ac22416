//! # OVP Player Library (ovp-player)
//!
//! Dual-buffer playback core for tiled, viewport-dependent 360° video.
//!
//! **Purpose:** Decide which tile track to request next, how far ahead to
//! prefetch against a configured buffer ceiling, and hand playback off
//! between two independently buffered media pipelines so that a change in
//! tile selection never produces a visible stall.
//!
//! **Architecture:** Single-task event-driven engine over tokio channels.
//! The manifest resolver, segment fetcher, media pipelines, and renderer
//! are external collaborators behind traits; the core owns the segment
//! scheduler, the switch state machine, and the switch queue.

pub mod error;
pub mod manifest;
pub mod net;
pub mod pipeline;
pub mod playback;
pub mod render;

pub use error::{Error, Result};
pub use ovp_common::events::{PlaybackState, PlayerEvent, TrackId};
