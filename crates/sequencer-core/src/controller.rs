//! The mutation facade over the sequence document.
//!
//! Every public method runs inside [`SequenceController::perform_edit`]:
//! take the player's lock, apply the edit, recompute the derived
//! duration, keep the playhead inside it, release. Callers therefore
//! never observe a stale duration or a track mid-edit, and edits are
//! totally ordered against each other and against playback ticks.
//!
//! Edits address tracks and segments by string id. Out-of-range or
//! conflicting edits are clamped or dropped rather than reported: they
//! originate from continuous drag gestures where a transient illegal
//! delta is normal and "no-op" is the right answer.

use log::warn;

use crate::curve::{Curve, TanSide};
use crate::player::{bind_track, PlayerState, SequencePlayer};
use crate::sequence::{CurveSegment, EventSegment, Segment, Track, TrackKind};

/// Which end anchor of a curve segment a value edit addresses.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SegmentAnchor {
    Begin,
    End,
}

/// Duration given to a freshly inserted curve segment, before it is
/// truncated against the next segment.
pub const DEFAULT_SEGMENT_DURATION: f64 = 1.0;

/// Shortest curve segment an edit may produce.
const MIN_SEGMENT_DURATION: f64 = 0.01;

pub struct SequenceController<'a> {
    player: &'a SequencePlayer,
}

impl<'a> SequenceController<'a> {
    pub(crate) fn new(player: &'a SequencePlayer) -> Self {
        Self { player }
    }

    /// The template every edit follows: lock, mutate, recompute the
    /// derived duration, re-normalize the playhead, unlock.
    fn perform_edit<R>(&self, edit: impl FnOnce(&mut PlayerState) -> R) -> R {
        let mut state = self.player.lock_state();
        let result = edit(&mut state);
        state.sequence.update_duration();
        state.time = state.normalize_time(state.time);
        result
    }

    /// Append an empty, unbound track. Returns its id.
    pub fn add_track(&self, kind: TrackKind) -> String {
        self.perform_edit(|state| {
            let name = format!("track {}", state.sequence.tracks.len() + 1);
            let track = Track::new(kind, name);
            let id = track.id.clone();
            state.sequence.tracks.push(track);
            id
        })
    }

    /// Remove a track and its adapter.
    pub fn delete_track(&self, track_id: &str) {
        let player = self.player;
        self.perform_edit(|state| {
            state.adapters.retain(|(id, _)| id != track_id);
            state.sequence.tracks.retain(|track| track.id != track_id);
            player.refresh_mailboxes(state);
        });
    }

    /// Rename a track.
    pub fn set_track_name(&self, track_id: &str, name: &str) {
        self.perform_edit(|state| {
            if let Some(track) = state.sequence.track_mut(track_id) {
                track.name = name.to_string();
            }
        });
    }

    /// Set the output range normalized curve values map into.
    pub fn set_track_range(&self, track_id: &str, minimum: f32, maximum: f32) {
        self.perform_edit(|state| {
            if let Some(track) = state.sequence.track_mut(track_id) {
                track.minimum = minimum;
                track.maximum = maximum;
            }
        });
    }

    /// Bind a track to an output (empty id unbinds). The old adapter is
    /// discarded and a new one is built under the same lock hold. A
    /// failed binding is logged and leaves the track without an adapter;
    /// the edit itself still succeeds.
    pub fn assign_output(&self, track_id: &str, output_id: &str) {
        let player = self.player;
        self.perform_edit(|state| {
            state.adapters.retain(|(id, _)| id != track_id);
            let time = state.time;
            let adapter = match state.sequence.track_mut(track_id) {
                Some(track) => {
                    track.output_id = output_id.to_string();
                    bind_track(track, player.outputs(), time)
                }
                None => {
                    warn!("assign_output: no track with id '{track_id}'");
                    None
                }
            };
            if let Some(adapter) = adapter {
                state.adapters.push((track_id.to_string(), adapter));
            }
            player.refresh_mailboxes(state);
        });
    }

    /// Insert a segment at `time` and return its id.
    ///
    /// Event tracks get a marker at the exact time; markers may sit
    /// arbitrarily close together. Curve tracks get a segment of
    /// [`DEFAULT_SEGMENT_DURATION`]; a time landing inside an existing
    /// segment moves the insert point to that segment's end, the new
    /// duration is truncated against the following segment, and the
    /// whole insert is dropped when no usable gap remains.
    pub fn insert_segment(&self, track_id: &str, time: f64) -> Option<String> {
        self.perform_edit(|state| {
            let track = state.sequence.track_mut(track_id)?;
            let time = time.max(0.0);
            match track.kind {
                TrackKind::Event => {
                    let marker = EventSegment::new(time, "");
                    let id = marker.id.clone();
                    track.insert_sorted(Segment::Event(marker));
                    Some(id)
                }
                kind => {
                    let mut start = time;
                    // Segments are sorted, so one pass also resolves a
                    // start pushed into the segment after the next.
                    for segment in &track.segments {
                        if start >= segment.start_time() && start < segment.end_time() {
                            start = segment.end_time();
                        }
                    }
                    let mut duration = DEFAULT_SEGMENT_DURATION;
                    for segment in &track.segments {
                        if segment.start_time() >= start {
                            duration = duration.min(segment.start_time() - start);
                            break;
                        }
                    }
                    if duration < MIN_SEGMENT_DURATION {
                        return None;
                    }
                    let segment = CurveSegment::new(kind, start, duration);
                    let id = segment.id.clone();
                    track.insert_sorted(Segment::Curve(segment));
                    Some(id)
                }
            }
        })
    }

    /// Remove a segment. Later segments keep their start times: gaps are
    /// meaningful, a track need not be fully covered.
    pub fn delete_segment(&self, track_id: &str, segment_id: &str) {
        self.perform_edit(|state| {
            if let Some(track) = state.sequence.track_mut(track_id) {
                track.segments.retain(|segment| segment.id() != segment_id);
            }
        });
    }

    /// Change a curve segment's duration, truncated against the next
    /// segment and floored at the minimum duration.
    pub fn resize_segment(&self, track_id: &str, segment_id: &str, new_duration: f64) {
        self.perform_edit(|state| {
            let Some(track) = state.sequence.track_mut(track_id) else {
                return;
            };
            let Some(index) = track.segment_index(segment_id) else {
                return;
            };
            let next_start = track.segments.get(index + 1).map(Segment::start_time);
            let Some(Segment::Curve(segment)) = track.segments.get_mut(index) else {
                return;
            };
            let mut duration = new_duration.max(MIN_SEGMENT_DURATION);
            if let Some(next_start) = next_start {
                duration = duration.min(next_start - segment.start_time);
            }
            if duration >= MIN_SEGMENT_DURATION {
                segment.duration = duration;
            }
        });
    }

    /// Move a segment along the timeline. Curve segments are clamped
    /// into the gap between their neighbors and the move is dropped when
    /// the segment no longer fits; event markers move freely and are
    /// re-sorted among their siblings.
    pub fn retime_segment(&self, track_id: &str, segment_id: &str, new_start: f64) {
        self.perform_edit(|state| {
            let Some(track) = state.sequence.track_mut(track_id) else {
                return;
            };
            let Some(index) = track.segment_index(segment_id) else {
                return;
            };
            if matches!(track.segments[index], Segment::Event(_)) {
                if let Some(Segment::Event(marker)) = track.segments.get_mut(index) {
                    marker.start_time = new_start.max(0.0);
                }
                let marker = track.segments.remove(index);
                track.insert_sorted(marker);
                return;
            }
            let previous_end = if index > 0 {
                track.segments[index - 1].end_time()
            } else {
                0.0
            };
            let next_start = track.segments.get(index + 1).map(Segment::start_time);
            let Some(Segment::Curve(segment)) = track.segments.get_mut(index) else {
                return;
            };
            let mut start = new_start.max(previous_end).max(0.0);
            if let Some(next_start) = next_start {
                start = start.min(next_start - segment.duration);
            }
            if start >= previous_end {
                segment.start_time = start;
            }
        });
    }

    /// Set an event marker's payload message.
    pub fn set_event_message(&self, track_id: &str, segment_id: &str, message: &str) {
        self.perform_edit(|state| {
            if let Some(track) = state.sequence.track_mut(track_id) {
                if let Some(Segment::Event(marker)) = track.segment_mut(segment_id) {
                    marker.message = message.to_string();
                }
            }
        });
    }

    /// Insert a control point on one channel's curve at normalized time
    /// `x`; returns its index for subsequent dragging.
    pub fn insert_curve_point(
        &self,
        track_id: &str,
        segment_id: &str,
        channel: usize,
        x: f32,
    ) -> Option<usize> {
        self.with_curve(track_id, segment_id, channel, |curve| curve.insert_point(x))
            .flatten()
    }

    /// Delete a control point; the first and last point always stay.
    pub fn delete_curve_point(
        &self,
        track_id: &str,
        segment_id: &str,
        channel: usize,
        index: usize,
    ) -> bool {
        self.with_curve(track_id, segment_id, channel, |curve| {
            curve.remove_point(index)
        })
        .unwrap_or(false)
    }

    /// Drag a control point by a (time, value) delta.
    pub fn change_curve_point(
        &self,
        track_id: &str,
        segment_id: &str,
        channel: usize,
        index: usize,
        delta_time: f32,
        delta_value: f32,
    ) {
        self.with_curve(track_id, segment_id, channel, |curve| {
            curve.move_point(index, delta_time, delta_value);
        });
    }

    /// Drag one tangent handle of a control point.
    pub fn change_tan_point(
        &self,
        track_id: &str,
        segment_id: &str,
        channel: usize,
        index: usize,
        side: TanSide,
        delta_time: f32,
        delta_value: f32,
    ) {
        self.with_curve(track_id, segment_id, channel, |curve| {
            curve.move_tangent(index, side, delta_time, delta_value);
        });
    }

    /// Nudge a segment's begin or end anchor value on one channel.
    pub fn change_segment_value(
        &self,
        track_id: &str,
        segment_id: &str,
        channel: usize,
        anchor: SegmentAnchor,
        amount: f32,
    ) {
        self.with_curve(track_id, segment_id, channel, |curve| {
            let index = match anchor {
                SegmentAnchor::Begin => 0,
                SegmentAnchor::End => curve.points.len() - 1,
            };
            curve.adjust_point_value(index, amount);
        });
    }

    /// Locate one channel's curve and run an edit against it, inside the
    /// usual lock-and-recompute template.
    fn with_curve<R>(
        &self,
        track_id: &str,
        segment_id: &str,
        channel: usize,
        edit: impl FnOnce(&mut Curve) -> R,
    ) -> Option<R> {
        self.perform_edit(|state| {
            let track = state.sequence.track_mut(track_id)?;
            let Some(Segment::Curve(segment)) = track.segment_mut(segment_id) else {
                return None;
            };
            let curve = segment.curves.get_mut(channel)?;
            Some(edit(curve))
        })
    }
}
