//! Editing semantics: insert policy, neighbor clamping, and the derived
//! invariants under randomized edit sequences.

mod common;

use common::{approx64, Lcg};
use sequencer_core::{
    OutputSet, PlayerConfig, Segment, SegmentAnchor, Sequence, SequencePlayer, TanSide, TrackKind,
};

fn bare_player() -> SequencePlayer {
    SequencePlayer::new(PlayerConfig::default(), OutputSet::new()).expect("player")
}

fn segment_span(player: &SequencePlayer, track_id: &str, segment_id: &str) -> (f64, f64) {
    player.with_sequence(|sequence| {
        let segment = sequence
            .track(track_id)
            .and_then(|track| track.segment(segment_id))
            .expect("segment");
        (segment.start_time(), segment.end_time())
    })
}

#[test]
fn inserting_into_empty_space_uses_the_requested_time() {
    let player = bare_player();
    let controller = player.controller();
    let track = controller.add_track(TrackKind::Float);
    let segment = controller.insert_segment(&track, 3.0).expect("segment");
    let (start, end) = segment_span(&player, &track, &segment);
    approx64(start, 3.0, 1e-9);
    approx64(end, 4.0, 1e-9);
}

#[test]
fn inserting_inside_a_segment_moves_to_its_end() {
    let player = bare_player();
    let controller = player.controller();
    let track = controller.add_track(TrackKind::Float);
    controller.insert_segment(&track, 0.0);

    let second = controller.insert_segment(&track, 0.5).expect("segment");
    let (start, end) = segment_span(&player, &track, &second);
    approx64(start, 1.0, 1e-9);
    approx64(end, 2.0, 1e-9);

    // cascades across every segment the pushed start lands in
    let third = controller.insert_segment(&track, 0.5).expect("segment");
    let (start, _) = segment_span(&player, &track, &third);
    approx64(start, 2.0, 1e-9);
}

#[test]
fn inserted_duration_is_truncated_against_the_next_segment() {
    let player = bare_player();
    let controller = player.controller();
    let track = controller.add_track(TrackKind::Float);
    controller.insert_segment(&track, 2.0);

    let squeezed = controller.insert_segment(&track, 1.5).expect("segment");
    let (start, end) = segment_span(&player, &track, &squeezed);
    approx64(start, 1.5, 1e-9);
    approx64(end, 2.0, 1e-9);
}

#[test]
fn insert_is_dropped_when_no_gap_remains() {
    let player = bare_player();
    let controller = player.controller();
    let track = controller.add_track(TrackKind::Float);
    let first = controller.insert_segment(&track, 0.0).expect("segment");
    let second = controller.insert_segment(&track, 1.0).expect("segment");
    // close the gap behind the first segment almost completely
    controller.retime_segment(&track, &second, 1.005);

    assert_eq!(controller.insert_segment(&track, 0.5), None);
    // unknown track is a plain None, not a panic
    assert_eq!(controller.insert_segment("nope", 0.5), None);
    let _ = first;
}

#[test]
fn event_markers_may_sit_arbitrarily_close() {
    let player = bare_player();
    let controller = player.controller();
    let track = controller.add_track(TrackKind::Event);
    assert!(controller.insert_segment(&track, 1.0).is_some());
    assert!(controller.insert_segment(&track, 1.0).is_some());
    assert!(controller.insert_segment(&track, 1.0000001).is_some());
    player.with_sequence(|sequence| {
        assert_eq!(sequence.track(&track).unwrap().segments.len(), 3);
    });
}

#[test]
fn delete_leaves_the_gap_in_place() {
    let player = bare_player();
    let controller = player.controller();
    let track = controller.add_track(TrackKind::Float);
    let a = controller.insert_segment(&track, 0.0).expect("a");
    let b = controller.insert_segment(&track, 1.0).expect("b");
    let c = controller.insert_segment(&track, 2.0).expect("c");

    controller.delete_segment(&track, &b);
    let (start, _) = segment_span(&player, &track, &c);
    // no re-flow: the later segment keeps its start time
    approx64(start, 2.0, 1e-9);
    let (start, _) = segment_span(&player, &track, &a);
    approx64(start, 0.0, 1e-9);
}

#[test]
fn resize_clamps_against_the_next_segment() {
    let player = bare_player();
    let controller = player.controller();
    let track = controller.add_track(TrackKind::Float);
    let a = controller.insert_segment(&track, 0.0).expect("a");
    controller.insert_segment(&track, 2.0);

    controller.resize_segment(&track, &a, 5.0);
    let (_, end) = segment_span(&player, &track, &a);
    approx64(end, 2.0, 1e-9);

    // shrinking is floored at the minimum duration, never zero
    controller.resize_segment(&track, &a, 0.0);
    let (start, end) = segment_span(&player, &track, &a);
    assert!(end > start);
}

#[test]
fn retime_clamps_into_the_gap_between_neighbors() {
    let player = bare_player();
    let controller = player.controller();
    let track = controller.add_track(TrackKind::Float);
    let a = controller.insert_segment(&track, 0.0).expect("a");
    let b = controller.insert_segment(&track, 3.0).expect("b");
    let c = controller.insert_segment(&track, 6.0).expect("c");

    // dragged far right: stops where it would meet the next segment
    controller.retime_segment(&track, &b, 10.0);
    let (start, end) = segment_span(&player, &track, &b);
    approx64(end, 6.0, 1e-9);
    approx64(start, 5.0, 1e-9);

    // dragged far left: stops at the previous segment's end
    controller.retime_segment(&track, &b, -10.0);
    let (start, _) = segment_span(&player, &track, &b);
    approx64(start, 1.0, 1e-9);

    let _ = (a, c);
}

#[test]
fn curve_edits_reach_the_addressed_channel() {
    let player = bare_player();
    let controller = player.controller();
    let track = controller.add_track(TrackKind::Vec3);
    let segment = controller.insert_segment(&track, 0.0).expect("segment");

    let index = controller
        .insert_curve_point(&track, &segment, 1, 0.5)
        .expect("point");
    assert_eq!(index, 1);
    controller.change_curve_point(&track, &segment, 1, index, 0.1, 0.25);
    controller.change_tan_point(&track, &segment, 1, index, TanSide::Out, 0.05, 0.0);
    controller.change_segment_value(&track, &segment, 0, SegmentAnchor::End, -0.5);

    player.with_sequence(|sequence| {
        let track = sequence.track(&track).unwrap();
        let Some(Segment::Curve(segment)) = track.segments.first() else {
            panic!("expected a curve segment");
        };
        assert_eq!(segment.curves[1].points.len(), 3);
        // the untouched channels keep their two default points
        assert_eq!(segment.curves[0].points.len(), 2);
        assert_eq!(segment.curves[2].points.len(), 2);
        // the end anchor on channel 0 was nudged down from 1.0
        let end = segment.curves[0].points.last().unwrap();
        assert!((end.pos.y - 0.5).abs() < 1e-6);
    });

    // out-of-range channel and bogus ids are silent no-ops
    assert_eq!(controller.insert_curve_point(&track, &segment, 9, 0.5), None);
    assert!(!controller.delete_curve_point(&track, "nope", 0, 1));
}

#[test]
fn deleting_a_missing_anchor_point_is_refused() {
    let player = bare_player();
    let controller = player.controller();
    let track = controller.add_track(TrackKind::Float);
    let segment = controller.insert_segment(&track, 0.0).expect("segment");

    assert!(!controller.delete_curve_point(&track, &segment, 0, 0));
    assert!(!controller.delete_curve_point(&track, &segment, 0, 1));
    player.with_sequence(|sequence| {
        let Some(Segment::Curve(s)) = sequence.track(&track).unwrap().segments.first() else {
            panic!("expected a curve segment");
        };
        assert_eq!(s.curves[0].points.len(), 2);
    });
}

/// Reference recomputation of the derived duration.
fn reference_duration(sequence: &Sequence) -> f64 {
    sequence
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .map(Segment::end_time)
        .fold(0.0, f64::max)
}

fn assert_invariants(sequence: &Sequence) {
    assert!(
        (sequence.duration - reference_duration(sequence)).abs() < 1e-9,
        "derived duration drifted from the reference"
    );
    for track in &sequence.tracks {
        for pair in track.segments.windows(2) {
            assert!(
                pair[0].end_time() <= pair[1].start_time() + 1e-9,
                "segments overlap on track '{}'",
                track.id
            );
        }
    }
    sequence.validate_basic().expect("document stays valid");
}

#[test]
fn invariants_hold_under_randomized_edit_sequences() {
    let player = bare_player();
    let controller = player.controller();
    let mut rng = Lcg(0x5eed);

    for _ in 0..3 {
        controller.add_track(TrackKind::Float);
    }
    controller.add_track(TrackKind::Event);

    for _ in 0..400 {
        let (track_ids, segment_ids) = player.with_sequence(|sequence| {
            let tracks: Vec<String> = sequence.tracks.iter().map(|t| t.id.clone()).collect();
            let segments: Vec<(String, String)> = sequence
                .tracks
                .iter()
                .flat_map(|t| {
                    t.segments
                        .iter()
                        .map(|s| (t.id.clone(), s.id().to_string()))
                })
                .collect();
            (tracks, segments)
        });
        let track = &track_ids[rng.below(track_ids.len() as u64) as usize];

        match rng.below(6) {
            0 | 1 => {
                controller.insert_segment(track, rng.unit_f64() * 20.0);
            }
            2 => {
                if let Some((track, segment)) = pick(&segment_ids, &mut rng) {
                    controller.resize_segment(track, segment, rng.unit_f64() * 4.0);
                }
            }
            3 => {
                if let Some((track, segment)) = pick(&segment_ids, &mut rng) {
                    controller.retime_segment(track, segment, rng.unit_f64() * 20.0);
                }
            }
            4 => {
                if let Some((track, segment)) = pick(&segment_ids, &mut rng) {
                    controller.delete_segment(track, segment);
                }
            }
            _ => {
                if let Some((track, segment)) = pick(&segment_ids, &mut rng) {
                    controller.insert_curve_point(track, segment, 0, rng.unit_f64() as f32);
                }
            }
        }

        player.with_sequence(assert_invariants);
    }
}

fn pick<'a>(segments: &'a [(String, String)], rng: &mut Lcg) -> Option<(&'a str, &'a str)> {
    if segments.is_empty() {
        return None;
    }
    let (track, segment) = &segments[rng.below(segments.len() as u64) as usize];
    Some((track, segment))
}
