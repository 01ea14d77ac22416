//! Test helpers for ovp-player integration tests
//!
//! Provides fake collaborators with shared, inspectable state:
//! - FakeResolver: yaw-banded track mapping with a fixed segment duration
//! - FakeFetcher: records every issued segment request
//! - FakeRenderer: records every render control call, settable viewport
//! - FakePipeline: scriptable media pipeline over shared state
//!
//! `test_player` assembles a PlayerEngine over these fakes; tests drive the
//! engine directly via `handle_command` / `handle_pipeline_event` for
//! deterministic ordering.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ovp_common::config::PlaybackConfig;
use ovp_common::events::{EventBus, PlayerEvent, TrackId};
use ovp_player::manifest::{RequestDescriptor, TrackResolver};
use ovp_player::net::SegmentFetcher;
use ovp_player::pipeline::{MediaPipeline, PipelineId, PipelinePair};
use ovp_player::playback::engine::PlayerEngine;
use ovp_player::render::{RenderControl, Viewport};
use tokio::sync::broadcast;

/// Segment duration produced by FakeResolver (30 frames at 30 fps)
pub const SEGMENT_MS: u64 = 1000;

// ================================================================================================
// FakeResolver
// ================================================================================================

/// Maps yaw bands to tracks: [0, 90) -> 1, [90, 180) -> 2, rest -> 3
pub struct FakeResolver {
    pub last_segment: u64,
}

impl TrackResolver for FakeResolver {
    fn resolve_track(&self, yaw: f64, _pitch: f64, _segment: u64) -> Option<TrackId> {
        if yaw < 90.0 {
            Some(TrackId(1))
        } else if yaw < 180.0 {
            Some(TrackId(2))
        } else {
            Some(TrackId(3))
        }
    }

    fn segment_requests(&self, yaw: f64, pitch: f64, segment: u64) -> Vec<RequestDescriptor> {
        let track = match self.resolve_track(yaw, pitch, segment) {
            Some(t) => t,
            None => return Vec::new(),
        };
        vec![RequestDescriptor {
            url: format!("track{}-seg{}.mp4", track.0, segment),
            segment,
        }]
    }

    fn last_segment_number(&self) -> u64 {
        self.last_segment
    }

    fn fps(&self) -> Option<f64> {
        Some(30.0)
    }

    fn frames_per_segment(&self, _fps: f64) -> u32 {
        30
    }
}

// ================================================================================================
// FakeFetcher
// ================================================================================================

/// Records every issued request as (segment, urls)
#[derive(Default)]
pub struct FakeFetcher {
    pub requests: Mutex<Vec<(u64, Vec<String>)>>,
}

impl FakeFetcher {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, urls)| urls.clone())
            .collect()
    }
}

impl SegmentFetcher for FakeFetcher {
    fn fetch_segments(&self, requests: &[RequestDescriptor], segment: u64) {
        let urls = requests.iter().map(|r| r.url.clone()).collect();
        self.requests.lock().unwrap().push((segment, urls));
    }
}

// ================================================================================================
// FakeRenderer
// ================================================================================================

/// One recorded render control call
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    SwitchPending(bool),
    Checkpoint(f64),
    Promote(PipelineId),
    ReadyForChange(bool),
    PauseAnimation(bool),
    MapTrack(TrackId, PipelineId),
}

#[derive(Default)]
pub struct FakeRenderer {
    viewport: Mutex<Viewport>,
    pub calls: Mutex<Vec<RenderCall>>,
}

impl FakeRenderer {
    pub fn set_viewport(&self, yaw: f64, pitch: f64) {
        *self.viewport.lock().unwrap() = Viewport { yaw, pitch };
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls recorded since the last take
    pub fn take_calls(&self) -> Vec<RenderCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

impl RenderControl for FakeRenderer {
    fn viewport(&self) -> Viewport {
        *self.viewport.lock().unwrap()
    }

    fn notify_switch_pending(&self, pending: bool) {
        self.calls
            .lock()
            .unwrap()
            .push(RenderCall::SwitchPending(pending));
    }

    fn set_max_checkpoint(&self, seconds: f64) {
        self.calls
            .lock()
            .unwrap()
            .push(RenderCall::Checkpoint(seconds));
    }

    fn promote_foreground(&self, id: PipelineId) {
        self.calls.lock().unwrap().push(RenderCall::Promote(id));
    }

    fn ready_for_track_change(&self, standby_surface: bool) {
        self.calls
            .lock()
            .unwrap()
            .push(RenderCall::ReadyForChange(standby_surface));
    }

    fn pause_animation(&self, paused: bool) {
        self.calls
            .lock()
            .unwrap()
            .push(RenderCall::PauseAnimation(paused));
    }

    fn map_track_to_surface(&self, track: TrackId, id: PipelineId) {
        self.calls
            .lock()
            .unwrap()
            .push(RenderCall::MapTrack(track, id));
    }
}

// ================================================================================================
// FakePipeline
// ================================================================================================

/// Scriptable pipeline state; the test mutates this while the engine owns
/// the boxed pipeline
#[derive(Debug, Default)]
pub struct PipelineState {
    /// Tracks assigned via set_active_track, with the segment they started at
    pub assigned_tracks: Vec<(TrackId, u64)>,

    /// When false, set_active_track reports rejection
    pub accept_track: bool,

    /// Contiguous media buffered through this position
    pub buffered_through_ms: u64,

    pub position_ms: u64,

    pub has_data: bool,

    pub playing: bool,

    /// One entry per tear_down_buffer call, recording the `full` flag
    pub teardowns: Vec<bool>,
}

impl PipelineState {
    pub fn last_track(&self) -> Option<TrackId> {
        self.assigned_tracks.last().map(|(t, _)| *t)
    }
}

pub struct FakePipeline {
    state: Arc<Mutex<PipelineState>>,
}

impl FakePipeline {
    pub fn new() -> (Self, Arc<Mutex<PipelineState>>) {
        let state = Arc::new(Mutex::new(PipelineState {
            accept_track: true,
            ..Default::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl MediaPipeline for FakePipeline {
    fn set_active_track(&mut self, track: TrackId, segment: u64) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.accept_track {
            return false;
        }
        state.assigned_tracks.push((track, segment));
        true
    }

    fn has_buffered_through(&self, position_ms: u64) -> bool {
        position_ms <= self.state.lock().unwrap().buffered_through_ms
    }

    fn buffered_segment_count(&self) -> u64 {
        self.state.lock().unwrap().buffered_through_ms / SEGMENT_MS
    }

    fn position_ms(&self) -> u64 {
        self.state.lock().unwrap().position_ms
    }

    fn has_buffered_data(&self) -> bool {
        self.state.lock().unwrap().has_data
    }

    fn play(&mut self) {
        self.state.lock().unwrap().playing = true;
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn tear_down_buffer(&mut self, full: bool) {
        let mut state = self.state.lock().unwrap();
        state.teardowns.push(full);
        state.buffered_through_ms = 0;
        state.has_data = false;
        state.position_ms = 0;
    }
}

// ================================================================================================
// Harness
// ================================================================================================

pub struct TestPlayer {
    pub engine: PlayerEngine,
    pub events: broadcast::Receiver<PlayerEvent>,
    pub main: Arc<Mutex<PipelineState>>,
    pub sub: Arc<Mutex<PipelineState>>,
    pub renderer: Arc<FakeRenderer>,
    pub fetcher: Arc<FakeFetcher>,
}

impl TestPlayer {
    /// Shared state of the given pipeline's fake
    pub fn pipeline(&self, id: PipelineId) -> &Arc<Mutex<PipelineState>> {
        match id {
            PipelineId::Main => &self.main,
            PipelineId::Sub => &self.sub,
        }
    }

    /// All events emitted so far, in order
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Assemble an engine over the fakes.
///
/// `last_segment = 0` means open-ended content.
pub fn test_player(config: PlaybackConfig, last_segment: u64) -> TestPlayer {
    let resolver = Arc::new(FakeResolver { last_segment });
    let fetcher = Arc::new(FakeFetcher::default());
    let renderer = Arc::new(FakeRenderer::default());
    let bus = Arc::new(EventBus::new(64));
    let events = bus.subscribe();

    let (main_pipeline, main) = FakePipeline::new();
    let (sub_pipeline, sub) = FakePipeline::new();
    let pipelines = PipelinePair::new(Box::new(main_pipeline), Box::new(sub_pipeline));

    let engine = PlayerEngine::new(
        config,
        resolver,
        Arc::clone(&fetcher) as Arc<dyn SegmentFetcher>,
        Arc::clone(&renderer) as Arc<dyn RenderControl>,
        pipelines,
        bus,
    )
    .expect("engine construction");

    TestPlayer {
        engine,
        events,
        main,
        sub,
        renderer,
        fetcher,
    }
}

/// Extract (track, trigger_segment) from all SwitchCompleted events
pub fn completed_switches(events: &[PlayerEvent]) -> Vec<(TrackId, u64)> {
    events
        .iter()
        .filter_map(|event| match event {
            PlayerEvent::SwitchCompleted {
                track_id,
                trigger_segment,
                ..
            } => Some((*track_id, *trigger_segment)),
            _ => None,
        })
        .collect()
}

/// Default config with an effectively unlimited buffer budget so tests can
/// drive scheduling without deferral timers
pub fn unbounded_config() -> PlaybackConfig {
    PlaybackConfig {
        buffer_budget_ms: 600_000,
        ..Default::default()
    }
}
