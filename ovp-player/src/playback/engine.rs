//! Player engine: lifecycle and orchestration
//!
//! Single-task event loop tying the segment scheduler, the switch state
//! machine, and the switch queue to the external collaborators. All
//! mutation happens while handling one command or pipeline event at a
//! time; deferral timers and the handoff poll are spawned tasks that only
//! send messages back into the loop.

use crate::error::{Error, Result};
use crate::manifest::TrackResolver;
use crate::net::SegmentFetcher;
use crate::pipeline::{PipelineEvent, PipelineId, PipelinePair};
use crate::playback::scheduler::{backpressure_delay_ms, Decision, SegmentScheduler};
use crate::playback::switch::{CheckpointAction, Checkpoints, HandoffPoll, SwitchState};
use crate::playback::switch_queue::{PendingSwitch, SwitchQueue};
use crate::render::RenderControl;
use ovp_common::config::PlaybackConfig;
use ovp_common::events::{EventBus, PlaybackState, PlayerEvent, TrackId};
use ovp_common::time::segment_duration_ms;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Commands handled by the engine loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
    Reset,
    SetLoop(bool),
    SetTrackSwitching(bool),
    /// Internal: issued by the deferral timer and after reset completion
    ScheduleNext,
    /// Internal: one tick of the handoff readiness poll
    HandoffTick { generation: u64 },
    Shutdown,
}

/// Cloneable command handle onto a running engine
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerCommand>,
}

impl PlayerHandle {
    fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| Error::InvalidState("player engine is not running".to_string()))
    }

    pub fn play(&self) -> Result<()> {
        self.send(PlayerCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(PlayerCommand::Reset)
    }

    pub fn set_loop(&self, enabled: bool) -> Result<()> {
        self.send(PlayerCommand::SetLoop(enabled))
    }

    pub fn set_track_switching(&self, enabled: bool) -> Result<()> {
        self.send(PlayerCommand::SetTrackSwitching(enabled))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(PlayerCommand::Shutdown)
    }
}

/// Diagnostic snapshot of the session
#[derive(Debug, Clone, Serialize)]
pub struct PlayerMetrics {
    pub yaw: f64,
    pub pitch: f64,
    pub track_id: Option<TrackId>,
    pub next_segment: u64,
    pub state: PlaybackState,
    pub live_pipeline: PipelineId,
    pub live_buffered_segments: u64,
    pub pending_switches: usize,
}

/// Dual-pipeline playback engine
pub struct PlayerEngine {
    config: PlaybackConfig,
    session_id: Uuid,

    resolver: Arc<dyn TrackResolver>,
    fetcher: Arc<dyn SegmentFetcher>,
    renderer: Arc<dyn RenderControl>,
    pipelines: PipelinePair,

    scheduler: SegmentScheduler,
    switch_queue: SwitchQueue,
    checkpoints: Checkpoints,
    switch_state: SwitchState,
    state: PlaybackState,

    /// Duration of one media segment, derived from the manifest at init
    segment_duration_ms: u64,

    /// Final segment index, 0 when unknown
    last_segment: u64,

    /// Timeline offset committed at the last handoff or restart
    buffer_offset_ms: u64,

    /// Highest segment index reported appended by either pipeline
    last_buffered_segment: u64,

    /// Pipeline the next segment append is directed at; flips on each
    /// committed divergence
    fetch_target: PipelineId,

    /// Render-surface readiness, indexed by PipelineId
    surface_ready: [bool; 2],

    /// Live pipeline has signalled the final buffer
    last_buffer: bool,

    /// Loop restart in progress: waiting for Main's surface
    awaiting_surface: bool,

    /// Loop restart in progress: waiting for pipeline re-init
    awaiting_reset: bool,

    events: Arc<EventBus>,

    cmd_tx: mpsc::UnboundedSender<PlayerCommand>,
    cmd_rx: Option<mpsc::UnboundedReceiver<PlayerCommand>>,
    pipeline_tx: mpsc::UnboundedSender<PipelineEvent>,
    pipeline_rx: Option<mpsc::UnboundedReceiver<PipelineEvent>>,

    poll: Option<HandoffPoll>,
    poll_task: Option<JoinHandle<()>>,
    poll_generation: u64,
    defer_task: Option<JoinHandle<()>>,
}

impl PlayerEngine {
    /// Create a new engine over the given collaborators.
    ///
    /// Segment duration is derived from the manifest frame rate here and
    /// fixed for the session.
    pub fn new(
        config: PlaybackConfig,
        resolver: Arc<dyn TrackResolver>,
        fetcher: Arc<dyn SegmentFetcher>,
        renderer: Arc<dyn RenderControl>,
        pipelines: PipelinePair,
        events: Arc<EventBus>,
    ) -> Result<Self> {
        if config.buffer_budget_ms == 0 {
            return Err(Error::Config(
                "buffer_budget_ms must be greater than zero".to_string(),
            ));
        }

        let fps = resolver.fps();
        let frames = resolver.frames_per_segment(fps.unwrap_or(ovp_common::time::FALLBACK_FPS));
        let segment_duration = segment_duration_ms(frames, fps);
        if segment_duration == 0 {
            return Err(Error::Manifest(
                "segment duration derived as zero".to_string(),
            ));
        }
        let last_segment = resolver.last_segment_number();

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (pipeline_tx, pipeline_rx) = mpsc::unbounded_channel();

        let hysteresis = config.switch_hysteresis;
        info!(
            segment_duration_ms = segment_duration,
            last_segment,
            buffer_budget_ms = config.buffer_budget_ms,
            "creating player engine"
        );

        Ok(Self {
            config,
            session_id: Uuid::new_v4(),
            resolver,
            fetcher,
            renderer,
            pipelines,
            scheduler: SegmentScheduler::new(hysteresis),
            switch_queue: SwitchQueue::new(),
            checkpoints: Checkpoints::new(),
            switch_state: SwitchState::Steady,
            state: PlaybackState::Stopped,
            segment_duration_ms: segment_duration,
            last_segment,
            buffer_offset_ms: 0,
            last_buffered_segment: 0,
            fetch_target: PipelineId::Main,
            surface_ready: [false, false],
            last_buffer: false,
            awaiting_surface: false,
            awaiting_reset: false,
            events,
            cmd_tx,
            cmd_rx: Some(cmd_rx),
            pipeline_tx,
            pipeline_rx: Some(pipeline_rx),
            poll: None,
            poll_task: None,
            poll_generation: 0,
            defer_task: None,
        })
    }

    /// Command handle for controllers
    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle {
            tx: self.cmd_tx.clone(),
        }
    }

    /// Sender the media pipelines report their events through
    pub fn pipeline_event_sender(&self) -> mpsc::UnboundedSender<PipelineEvent> {
        self.pipeline_tx.clone()
    }

    /// Session identity carried on all emitted events
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Overall playback position: live pipeline's media time plus the
    /// offset committed at the last handoff
    pub fn position_ms(&self) -> u64 {
        self.pipelines.live().position_ms() + self.buffer_offset_ms
    }

    /// Current switch state
    pub fn switch_state(&self) -> SwitchState {
        self.switch_state
    }

    /// Number of switches awaiting handoff
    pub fn pending_switches(&self) -> usize {
        self.switch_queue.len()
    }

    /// Identity of the live pipeline
    pub fn live_pipeline(&self) -> PipelineId {
        self.pipelines.live_id()
    }

    /// Diagnostic snapshot
    pub fn metrics(&self) -> PlayerMetrics {
        let viewport = self.renderer.viewport();
        PlayerMetrics {
            yaw: viewport.yaw,
            pitch: viewport.pitch,
            track_id: self.scheduler.committed().map(|s| s.track),
            next_segment: self.scheduler.segment_index(),
            state: self.state,
            live_pipeline: self.pipelines.live_id(),
            live_buffered_segments: self.pipelines.live().buffered_segment_count(),
            pending_switches: self.switch_queue.len(),
        }
    }

    /// Run the engine loop until shutdown.
    ///
    /// Consumes the receivers; calling run twice is an error.
    pub async fn run(&mut self) -> Result<()> {
        let mut cmd_rx = self
            .cmd_rx
            .take()
            .ok_or_else(|| Error::InvalidState("engine already running".to_string()))?;
        let mut pipeline_rx = self
            .pipeline_rx
            .take()
            .ok_or_else(|| Error::InvalidState("engine already running".to_string()))?;

        loop {
            tokio::select! {
                Some(command) = cmd_rx.recv() => {
                    if command == PlayerCommand::Shutdown {
                        info!("player engine shutting down");
                        self.cancel_poll();
                        self.cancel_defer();
                        break;
                    }
                    self.handle_command(command);
                }
                Some(event) = pipeline_rx.recv() => {
                    self.handle_pipeline_event(event);
                }
                else => break,
            }
        }
        Ok(())
    }

    /// Handle one command; public for direct-drive tests
    pub fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::Reset => self.reset(),
            PlayerCommand::SetLoop(enabled) => {
                self.config.loop_playback = enabled;
                info!(enabled, "loop playback toggled");
            }
            PlayerCommand::SetTrackSwitching(enabled) => {
                self.scheduler.set_switching_enabled(enabled);
                info!(enabled, "viewport track switching toggled");
            }
            PlayerCommand::ScheduleNext => self.schedule_next(),
            PlayerCommand::HandoffTick { generation } => self.handle_handoff_tick(generation),
            PlayerCommand::Shutdown => {}
        }
    }

    /// Handle one pipeline event; public for direct-drive tests
    pub fn handle_pipeline_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::SegmentProcessed { segment } => {
                self.last_buffered_segment = self.last_buffered_segment.max(segment);
                self.fill_buffer();
            }
            PipelineEvent::GeometrySwitch { id, track } => {
                self.renderer.map_track_to_surface(track, id);
            }
            PipelineEvent::SurfaceReady { id } => {
                if self.awaiting_surface && id == PipelineId::Main {
                    self.resume_after_restart();
                } else {
                    self.surface_ready[id.index()] = true;
                }
            }
            PipelineEvent::Stalled { id, position_ms } => {
                if id == self.pipelines.live_id() {
                    self.arm_handoff_poll(position_ms);
                } else {
                    debug!(pipeline = %id, "standby stall ignored");
                }
            }
            PipelineEvent::EndOfContent => {
                if !self.last_buffer {
                    self.last_buffer = true;
                    self.events.emit_lossy(PlayerEvent::EndOfContent {
                        session_id: self.session_id,
                        looping: self.config.loop_playback,
                        timestamp: ovp_common::time::now(),
                    });
                    info!(looping = self.config.loop_playback, "final buffer reached");
                }
            }
            PipelineEvent::ResetComplete => {
                if self.awaiting_reset {
                    self.awaiting_reset = false;
                    self.schedule_next();
                }
            }
        }
    }

    fn play(&mut self) {
        if self.state == PlaybackState::Playing {
            warn!("playback is already running");
            return;
        }
        let old_state = self.state;
        self.pipelines.live_mut().play();
        self.state = PlaybackState::Playing;
        self.emit_state_change(old_state, PlaybackState::Playing);
        self.fill_buffer();
    }

    fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        // A paused session freezes the reference position, so an armed poll
        // would tick forever; the pipeline re-stalls after resume.
        self.cancel_poll();
        self.pipelines.live_mut().pause();
        self.state = PlaybackState::Paused;
        self.emit_state_change(PlaybackState::Playing, PlaybackState::Paused);
        info!("playback has been paused");
    }

    /// Tear the session down and return to the initial state.
    ///
    /// All timers and polls are cancelled; the engine is reusable with a
    /// fresh session id.
    fn reset(&mut self) {
        self.cancel_poll();
        self.cancel_defer();

        let old_state = self.state;
        self.pipelines.live_mut().pause();
        self.pipelines.get_mut(PipelineId::Main).tear_down_buffer(false);
        self.pipelines.get_mut(PipelineId::Sub).tear_down_buffer(false);
        self.pipelines.force_main_live();

        self.scheduler.reset();
        self.switch_queue.clear();
        self.checkpoints.clear();
        self.switch_state = SwitchState::Steady;
        self.fetch_target = PipelineId::Main;
        self.buffer_offset_ms = 0;
        self.last_buffered_segment = 0;
        self.surface_ready = [false, false];
        self.last_buffer = false;
        self.awaiting_surface = false;
        self.awaiting_reset = false;

        self.renderer.notify_switch_pending(false);

        let session_id = self.session_id;
        self.state = PlaybackState::Stopped;
        if old_state != PlaybackState::Stopped {
            self.emit_state_change(old_state, PlaybackState::Stopped);
        }
        self.events.emit_lossy(PlayerEvent::SessionReset {
            session_id,
            timestamp: ovp_common::time::now(),
        });
        self.session_id = Uuid::new_v4();
        info!("session reset");
    }

    /// Issue or defer the next segment request against the buffer budget
    fn fill_buffer(&mut self) {
        let position = self.position_ms();
        match backpressure_delay_ms(
            self.last_buffered_segment,
            self.segment_duration_ms,
            position,
            self.config.buffer_budget_ms,
        ) {
            Some(delay_ms) => {
                debug!(delay_ms, "buffer at budget, deferring next request");
                self.cancel_defer();
                let tx = self.cmd_tx.clone();
                self.defer_task = Some(tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    let _ = tx.send(PlayerCommand::ScheduleNext);
                }));
            }
            None => self.schedule_next(),
        }
    }

    /// One scheduling step: resolve, apply hysteresis, issue the fetch
    fn schedule_next(&mut self) {
        if self.awaiting_reset {
            // Restart teardown still in flight; ResetComplete reschedules
            return;
        }
        if self.last_segment > 0 && self.scheduler.segment_index() > self.last_segment {
            debug!("all segments requested, nothing to schedule");
            return;
        }

        let viewport = self.renderer.viewport();
        let decision = self.scheduler.next_decision(viewport, self.resolver.as_ref());
        let Decision::Request {
            track,
            yaw,
            pitch,
            segment,
            divergence,
            map_surfaces,
        } = decision
        else {
            return;
        };

        let requests = self.resolver.segment_requests(yaw, pitch, segment);
        if requests.is_empty() {
            debug!(segment, "no request descriptors, retrying next step");
            return;
        }

        if map_surfaces {
            self.renderer.map_track_to_surface(track, PipelineId::Main);
            self.renderer.map_track_to_surface(track, PipelineId::Sub);
        }

        if let Some(pending) = divergence {
            self.begin_switch(pending);
        }

        let target = self.fetch_target;
        if self.pipelines.get_mut(target).set_active_track(track, segment) {
            self.fetcher.fetch_segments(&requests, segment);
            self.scheduler.advance();
            self.events.emit_lossy(PlayerEvent::SegmentRequested {
                session_id: self.session_id,
                track_id: track,
                segment,
                timestamp: ovp_common::time::now(),
            });
            debug!(%track, segment, pipeline = %target, "segment requested");
        } else {
            debug!(
                %track,
                segment,
                pipeline = %target,
                "pipeline rejected track, withholding segment advance"
            );
        }
    }

    /// Record a committed divergence: the standby pipeline starts
    /// prefetching the new track
    fn begin_switch(&mut self, pending: PendingSwitch) {
        self.fetch_target = self.fetch_target.other();
        self.switch_state = SwitchState::Switching;
        self.switch_queue.enqueue(pending);

        self.renderer.notify_switch_pending(true);
        let lookahead = pending
            .trigger_segment
            .saturating_sub(self.position_ms() / self.segment_duration_ms);
        let checkpoint_secs = (lookahead * self.segment_duration_ms) as f64 / 1000.0;
        if let CheckpointAction::PushNow(seconds) = self.checkpoints.record(checkpoint_secs) {
            self.renderer.set_max_checkpoint(seconds);
        }

        self.events.emit_lossy(PlayerEvent::SwitchPending {
            session_id: self.session_id,
            track_id: pending.track_id,
            trigger_segment: pending.trigger_segment,
            queue_depth: self.switch_queue.len(),
            timestamp: ovp_common::time::now(),
        });
        info!(
            track = %pending.track_id,
            trigger_segment = pending.trigger_segment,
            queued = self.switch_queue.len(),
            "track switch pending"
        );
    }

    /// Arm the handoff readiness poll, anchored to the live pipeline's
    /// position at the moment of the stall
    fn arm_handoff_poll(&mut self, reference_ms: u64) {
        self.cancel_poll();

        self.poll_generation += 1;
        let generation = self.poll_generation;
        self.poll = Some(HandoffPoll {
            generation,
            reference_ms,
            standby: self.pipelines.standby_id(),
        });

        let tx = self.cmd_tx.clone();
        let interval_ms = self.config.handoff_poll_interval_ms;
        self.poll_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            loop {
                interval.tick().await;
                if tx.send(PlayerCommand::HandoffTick { generation }).is_err() {
                    break;
                }
            }
        }));
        debug!(generation, reference_ms, "handoff poll armed");
    }

    fn cancel_poll(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
        self.poll = None;
    }

    fn cancel_defer(&mut self) {
        if let Some(task) = self.defer_task.take() {
            task.abort();
        }
    }

    /// Evaluate one handoff poll tick; public for direct-drive tests
    pub fn handle_handoff_tick(&mut self, generation: u64) {
        let Some(poll) = self.poll else {
            return;
        };
        if poll.generation != generation {
            // Tick from an aborted poll still in the channel
            return;
        }

        let live_position = self.pipelines.live().position_ms();
        if live_position != poll.reference_ms {
            // Concurrent pause/seek moved playback; this poll's premise is
            // stale and the state machine re-evaluates on the next stall.
            debug!(
                reference_ms = poll.reference_ms,
                live_position, "stale handoff poll cancelled"
            );
            self.cancel_poll();
            return;
        }

        let standby_id = poll.standby;
        if let Some(front) = self.switch_queue.front().copied() {
            let switch_position = front.switch_position_ms(self.segment_duration_ms);
            if self.pipelines.get(standby_id).has_buffered_through(switch_position)
                && self.surface_ready[standby_id.index()]
            {
                self.cancel_poll();
                self.perform_handoff(front);
                return;
            }
        }

        if !self.pipelines.get(standby_id).has_buffered_data() && self.last_buffer {
            self.cancel_poll();
            if self.config.loop_playback {
                self.begin_loop_restart();
            } else {
                // Clean stop at content end
                let old_state = self.state;
                self.pipelines.live_mut().pause();
                self.state = PlaybackState::Stopped;
                self.emit_state_change(old_state, PlaybackState::Stopped);
                info!("content ended, looping disabled");
            }
        }
    }

    /// Atomic handoff: promote the standby pipeline to live
    fn perform_handoff(&mut self, front: PendingSwitch) {
        let old_live = self.pipelines.live_id();
        let new_live = old_live.other();

        self.renderer.pause_animation(true);
        match self.checkpoints.drain_one() {
            Some(seconds) => self.renderer.set_max_checkpoint(seconds),
            None => self.renderer.notify_switch_pending(false),
        }

        self.pipelines.get_mut(new_live).play();
        self.renderer.promote_foreground(new_live);
        self.renderer.ready_for_track_change(new_live == PipelineId::Sub);
        self.renderer.pause_animation(false);

        self.buffer_offset_ms = front.switch_position_ms(self.segment_duration_ms);
        self.pipelines.promote_standby();
        self.pipelines.get_mut(old_live).tear_down_buffer(false);
        self.surface_ready[new_live.index()] = false;

        let dequeued = self.switch_queue.dequeue();
        debug_assert_eq!(dequeued, Some(front));
        self.switch_state = if self.switch_queue.is_empty() {
            SwitchState::Steady
        } else {
            SwitchState::Switching
        };

        self.events.emit_lossy(PlayerEvent::SwitchCompleted {
            session_id: self.session_id,
            track_id: front.track_id,
            trigger_segment: front.trigger_segment,
            timestamp: ovp_common::time::now(),
        });
        info!(
            track = %front.track_id,
            trigger_segment = front.trigger_segment,
            live = %new_live,
            remaining = self.switch_queue.len(),
            "track switch handed off"
        );
    }

    /// Begin a loop restart: tear both pipelines down and rewind to
    /// segment 1 with the session-start selection
    fn begin_loop_restart(&mut self) {
        self.cancel_defer();

        self.switch_queue.clear();
        self.checkpoints.clear();
        self.switch_state = SwitchState::Steady;
        self.scheduler.rewind_for_loop();

        self.buffer_offset_ms = 0;
        self.last_buffered_segment = 0;
        self.last_buffer = false;
        self.surface_ready = [false, false];

        self.renderer.pause_animation(true);
        self.renderer.notify_switch_pending(false);
        self.pipelines.get_mut(PipelineId::Main).tear_down_buffer(true);
        self.pipelines.get_mut(PipelineId::Sub).tear_down_buffer(true);
        self.pipelines.force_main_live();
        self.fetch_target = PipelineId::Main;

        self.awaiting_surface = true;
        self.awaiting_reset = true;
        info!("loop restart begun");
    }

    /// Complete the restart once Main's surface is ready again
    fn resume_after_restart(&mut self) {
        self.awaiting_surface = false;
        self.cancel_poll();

        self.pipelines.get_mut(PipelineId::Main).play();
        self.renderer.promote_foreground(PipelineId::Main);
        self.renderer.ready_for_track_change(false);
        self.renderer.pause_animation(false);

        self.events.emit_lossy(PlayerEvent::LoopRestarted {
            session_id: self.session_id,
            timestamp: ovp_common::time::now(),
        });
        info!("loop restart complete, playback back on main");
    }

    fn emit_state_change(&self, old_state: PlaybackState, new_state: PlaybackState) {
        self.events.emit_lossy(PlayerEvent::PlaybackStateChanged {
            session_id: self.session_id,
            old_state,
            new_state,
            timestamp: ovp_common::time::now(),
        });
    }
}
