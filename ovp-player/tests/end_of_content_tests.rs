//! End-of-content behavior with looping disabled

mod helpers;

use helpers::{test_player, SEGMENT_MS};
use ovp_common::config::PlaybackConfig;
use ovp_common::events::{PlaybackState, PlayerEvent};
use ovp_player::pipeline::{PipelineEvent, PipelineId};
use ovp_player::playback::engine::PlayerCommand;

fn no_loop_config() -> PlaybackConfig {
    PlaybackConfig {
        buffer_budget_ms: 600_000,
        loop_playback: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_content_end_stops_cleanly_without_loop() {
    let mut player = test_player(no_loop_config(), 2);

    player.engine.handle_command(PlayerCommand::Play);
    player
        .engine
        .handle_pipeline_event(PipelineEvent::SegmentProcessed { segment: 1 });
    player
        .engine
        .handle_pipeline_event(PipelineEvent::SegmentProcessed { segment: 2 });
    assert_eq!(player.fetcher.request_count(), 2);

    player
        .engine
        .handle_pipeline_event(PipelineEvent::EndOfContent);

    // Live pipeline drains with nothing on standby: clean stop
    player.main.lock().unwrap().position_ms = 2 * SEGMENT_MS;
    player.engine.handle_pipeline_event(PipelineEvent::Stalled {
        id: PipelineId::Main,
        position_ms: 2 * SEGMENT_MS,
    });
    player
        .engine
        .handle_command(PlayerCommand::HandoffTick { generation: 1 });

    assert_eq!(player.engine.metrics().state, PlaybackState::Stopped);
    assert!(!player.main.lock().unwrap().playing);
    // No restart teardown happened
    assert!(player.main.lock().unwrap().teardowns.is_empty());

    let events = player.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, PlayerEvent::EndOfContent { looping: false, .. })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, PlayerEvent::LoopRestarted { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::PlaybackStateChanged {
            new_state: PlaybackState::Stopped,
            ..
        }
    )));
}

#[tokio::test]
async fn test_stall_before_final_buffer_does_not_stop() {
    let mut player = test_player(no_loop_config(), 0);

    player.engine.handle_command(PlayerCommand::Play);
    player
        .engine
        .handle_pipeline_event(PipelineEvent::SegmentProcessed { segment: 1 });

    // A mid-stream stall (rebuffering) without the final buffer flag must
    // keep the session playing
    player.main.lock().unwrap().position_ms = SEGMENT_MS;
    player.engine.handle_pipeline_event(PipelineEvent::Stalled {
        id: PipelineId::Main,
        position_ms: SEGMENT_MS,
    });
    player
        .engine
        .handle_command(PlayerCommand::HandoffTick { generation: 1 });

    assert_eq!(player.engine.metrics().state, PlaybackState::Playing);
    assert!(player.main.lock().unwrap().playing);
}

#[tokio::test]
async fn test_duplicate_end_of_content_emits_once() {
    let mut player = test_player(no_loop_config(), 2);

    player.engine.handle_command(PlayerCommand::Play);
    player
        .engine
        .handle_pipeline_event(PipelineEvent::EndOfContent);
    player
        .engine
        .handle_pipeline_event(PipelineEvent::EndOfContent);

    let ends = player
        .drain_events()
        .iter()
        .filter(|e| matches!(e, PlayerEvent::EndOfContent { .. }))
        .count();
    assert_eq!(ends, 1);
}
