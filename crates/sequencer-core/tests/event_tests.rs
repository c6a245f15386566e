//! Event crossing detection and exactly-once queue delivery.

mod common;

use std::sync::Arc;

use common::{event_player, RecordingOutput};
use sequencer_core::{
    EventQueue, OutputAffinity, OutputSet, ParameterOutput, PlayerConfig, SequencePlayer,
    ValueKind,
};

#[test]
fn markers_fire_exactly_once_in_crossing_order() {
    let (player, queue, track_id) = event_player();
    let controller = player.controller();
    for t in 1..=5 {
        let id = controller
            .insert_segment(&track_id, t as f64)
            .expect("marker");
        controller.set_event_message(&track_id, &id, &format!("cue-{t}"));
    }
    assert!((player.duration() - 5.0).abs() < 1e-9);

    player.play();
    // 0 -> 5.6 in 0.2 steps; the playhead clamps at 5.0, which must
    // still fire the marker sitting exactly on the end
    for _ in 0..28 {
        player.step(0.2);
    }

    let events = queue.consume_events();
    let times: Vec<f64> = events.iter().map(|e| e.time).collect();
    assert_eq!(times, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["cue-1", "cue-2", "cue-3", "cue-4", "cue-5"]);

    // drained: a second consume sees nothing
    assert!(queue.consume_events().is_empty());
}

#[test]
fn partial_consumes_see_each_event_once() {
    let (player, queue, track_id) = event_player();
    let controller = player.controller();
    for t in 1..=5 {
        controller.insert_segment(&track_id, t as f64);
    }

    player.play();
    for _ in 0..13 {
        player.step(0.2);
    }
    let first = queue.consume_events();
    for _ in 0..15 {
        player.step(0.2);
    }
    let second = queue.consume_events();

    let mut all: Vec<f64> = first.iter().chain(&second).map(|e| e.time).collect();
    assert_eq!(all.len(), 5);
    all.dedup();
    assert_eq!(all, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
}

/// A tick that wraps the loop boundary delivers the tail of the old lap
/// and the head of the new one, in that order, including a marker at 0.
#[test]
fn loop_wrap_delivers_both_sides_of_the_boundary() {
    let queue = EventQueue::new();
    let pad = RecordingOutput::new(ValueKind::Float);
    let mut outputs = OutputSet::new();
    outputs.register_events("cues", queue.clone());
    outputs.register_parameter(
        "pad",
        pad as Arc<dyn ParameterOutput>,
        OutputAffinity::AnyThread,
    );
    let player = SequencePlayer::new(PlayerConfig::default(), outputs).expect("player");
    let (event_track, pad_track) = player.with_sequence(|sequence| {
        (sequence.tracks[0].id.clone(), sequence.tracks[1].id.clone())
    });

    let controller = player.controller();
    // a long curve segment stretches the timeline to 10s
    let segment = controller.insert_segment(&pad_track, 0.0).expect("segment");
    controller.resize_segment(&pad_track, &segment, 10.0);
    for t in [0.0, 0.3, 9.5] {
        controller.insert_segment(&event_track, t);
    }

    player.set_is_looping(true);
    player.set_player_time(9.0);
    player.play();
    // the seek jumped the playhead forward; drain the markers that
    // crossing fires before exercising the wrap itself
    player.step(0.0);
    queue.consume_events();

    player.step(0.6); // 9.6: crosses 9.5
    player.step(0.5); // wraps to 0.1: crosses the marker at 0
    player.step(0.3); // 0.4: crosses 0.3

    let times: Vec<f64> = queue.consume_events().iter().map(|e| e.time).collect();
    assert_eq!(times, vec![9.5, 0.0, 0.3]);
}

#[test]
fn forward_seek_fires_skipped_markers_but_reverse_motion_fires_nothing() {
    let (player, queue, track_id) = event_player();
    let controller = player.controller();
    controller.insert_segment(&track_id, 1.0);
    controller.insert_segment(&track_id, 2.0);

    player.play();
    player.set_player_time(2.0);
    player.step(0.0);
    // the jump from 0 to 2 crosses both markers on the next tick
    assert_eq!(queue.consume_events().len(), 2);

    player.set_playback_speed(-1.0);
    player.step(0.5);
    player.step(0.5);
    assert!((player.player_time() - 1.0).abs() < 1e-9);
    // backward motion never re-fires
    assert!(queue.consume_events().is_empty());
}

#[test]
fn rebinding_does_not_replay_markers_behind_the_playhead() {
    let (player, queue, track_id) = event_player();
    let controller = player.controller();
    controller.insert_segment(&track_id, 1.0);
    controller.insert_segment(&track_id, 2.0);

    player.play();
    player.step(1.5);
    assert_eq!(queue.consume_events().len(), 1);

    // rebuilding the adapter seeds its crossing detector at the current
    // playhead, so the first marker stays behind it
    controller.assign_output(&track_id, "cues");
    player.step(1.0);
    let times: Vec<f64> = queue.consume_events().iter().map(|e| e.time).collect();
    assert_eq!(times, vec![2.0]);
}

#[test]
fn events_carry_their_track_and_message() {
    let (player, queue, track_id) = event_player();
    let controller = player.controller();
    let id = controller.insert_segment(&track_id, 0.5).expect("marker");
    controller.set_event_message(&track_id, &id, "blackout");

    player.play();
    player.step(1.0);
    let events = queue.consume_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].track_id, track_id);
    assert_eq!(events[0].message, "blackout");
}
