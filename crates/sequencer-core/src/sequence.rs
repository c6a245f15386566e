//! The timeline document: a sequence of typed tracks of segments.
//!
//! The tree is plain owned data with serde derives; all invariants that
//! span more than one segment (ordering, non-overlap, derived duration)
//! are maintained by the editing layer, and re-checked by
//! [`Sequence::validate_basic`] when a document is loaded from disk.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::curve::Curve;
use crate::output::{OutputSet, OutputTarget};
use crate::value::{Value, ValueKind};

/// Fresh string identifier for tracks and segments.
pub(crate) fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// The value kind a track produces, or `Event` for discrete markers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Event,
}

impl TrackKind {
    /// Numeric value kind of this track, `None` for event tracks.
    pub fn value_kind(self) -> Option<ValueKind> {
        match self {
            TrackKind::Float => Some(ValueKind::Float),
            TrackKind::Vec2 => Some(ValueKind::Vec2),
            TrackKind::Vec3 => Some(ValueKind::Vec3),
            TrackKind::Vec4 => Some(ValueKind::Vec4),
            TrackKind::Event => None,
        }
    }

    /// Curve channels per segment (0 for event tracks).
    pub fn channels(self) -> usize {
        self.value_kind().map_or(0, ValueKind::channels)
    }
}

impl From<ValueKind> for TrackKind {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Float => TrackKind::Float,
            ValueKind::Vec2 => TrackKind::Vec2,
            ValueKind::Vec3 => TrackKind::Vec3,
            ValueKind::Vec4 => TrackKind::Vec4,
        }
    }
}

/// A time span producing a numeric value, one curve per channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CurveSegment {
    pub id: String,
    pub start_time: f64,
    /// Always > 0.
    pub duration: f64,
    pub curves: Vec<Curve>,
}

impl CurveSegment {
    pub fn new(kind: TrackKind, start_time: f64, duration: f64) -> Self {
        Self {
            id: generate_id(),
            start_time,
            duration,
            curves: (0..kind.channels()).map(|_| Curve::default()).collect(),
        }
    }

    #[inline]
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Evaluate every channel at segment-local normalized time `t` and
    /// assemble the (unmapped, [0,1]-domain) value for `kind`.
    pub fn sample(&self, kind: ValueKind, t: f32) -> Value {
        let mut channels = [0.0f32; 4];
        for (i, curve) in self.curves.iter().take(4).enumerate() {
            channels[i] = curve.evaluate(t);
        }
        Value::from_channels(kind, &channels)
    }
}

/// A single instantaneous marker carrying a message payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EventSegment {
    pub id: String,
    pub start_time: f64,
    pub message: String,
}

impl EventSegment {
    pub fn new(start_time: f64, message: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            start_time,
            message: message.into(),
        }
    }
}

/// A time-bounded unit of a track.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Curve(CurveSegment),
    Event(EventSegment),
}

impl Segment {
    pub fn id(&self) -> &str {
        match self {
            Segment::Curve(s) => &s.id,
            Segment::Event(s) => &s.id,
        }
    }

    pub fn start_time(&self) -> f64 {
        match self {
            Segment::Curve(s) => s.start_time,
            Segment::Event(s) => s.start_time,
        }
    }

    /// Event markers have zero duration.
    pub fn end_time(&self) -> f64 {
        match self {
            Segment::Curve(s) => s.end_time(),
            Segment::Event(s) => s.start_time,
        }
    }
}

/// One automation channel: ordered, non-overlapping segments of one kind,
/// bound to at most one external output by string id ("" = unbound).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub kind: TrackKind,
    /// Identifier of the bound output; empty when unbound.
    #[serde(default)]
    pub output_id: String,
    /// Output range: normalized curve values map to [minimum, maximum].
    #[serde(default)]
    pub minimum: f32,
    #[serde(default = "default_maximum")]
    pub maximum: f32,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

fn default_maximum() -> f32 {
    1.0
}

impl Track {
    pub fn new(kind: TrackKind, name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            kind,
            output_id: String::new(),
            minimum: 0.0,
            maximum: 1.0,
            segments: Vec::new(),
        }
    }

    /// End of the last segment, 0 for an empty track.
    pub fn span(&self) -> f64 {
        self.segments
            .iter()
            .map(Segment::end_time)
            .fold(0.0, f64::max)
    }

    pub fn segment(&self, segment_id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id() == segment_id)
    }

    pub fn segment_mut(&mut self, segment_id: &str) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.id() == segment_id)
    }

    pub(crate) fn segment_index(&self, segment_id: &str) -> Option<usize> {
        self.segments.iter().position(|s| s.id() == segment_id)
    }

    /// Insert keeping the list sorted by start time; returns the index.
    pub(crate) fn insert_sorted(&mut self, segment: Segment) -> usize {
        let index = self
            .segments
            .iter()
            .position(|s| s.start_time() > segment.start_time())
            .unwrap_or(self.segments.len());
        self.segments.insert(index, segment);
        index
    }
}

/// The whole timeline document: tracks plus the derived total duration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Sequence {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Derived; recomputed after every structural edit and on load.
    #[serde(default)]
    pub duration: f64,
}

impl Sequence {
    pub fn track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub fn track_mut(&mut self, track_id: &str) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == track_id)
    }

    /// Recompute the derived duration from every track's span.
    pub fn update_duration(&mut self) {
        self.duration = self.tracks.iter().map(Track::span).fold(0.0, f64::max);
    }

    /// Synthesize the default document for a set of known outputs: one
    /// empty track per output, already bound to it.
    pub fn default_for_outputs(outputs: &OutputSet) -> Sequence {
        let mut sequence = Sequence::default();
        for (id, target) in outputs.iter() {
            let kind = match target {
                OutputTarget::Parameter { parameter, .. } => {
                    TrackKind::from(parameter.value_kind())
                }
                OutputTarget::Events(_) => TrackKind::Event,
            };
            let mut track = Track::new(kind, id.clone());
            track.output_id = id.clone();
            sequence.tracks.push(track);
        }
        sequence.update_duration();
        sequence
    }

    /// Validate basic invariants: segment variants match the track kind,
    /// curve channel counts, positive durations, ordering/non-overlap,
    /// and curve endpoint pinning.
    pub fn validate_basic(&self) -> Result<(), String> {
        for track in &self.tracks {
            let mut previous_end = f64::NEG_INFINITY;
            for segment in &track.segments {
                match (track.kind, segment) {
                    (TrackKind::Event, Segment::Event(_)) => {}
                    (TrackKind::Event, Segment::Curve(_)) => {
                        return Err(format!("curve segment on event track '{}'", track.id));
                    }
                    (_, Segment::Event(_)) => {
                        return Err(format!("event segment on curve track '{}'", track.id));
                    }
                    (kind, Segment::Curve(s)) => {
                        if s.duration <= 0.0 {
                            return Err(format!("segment '{}' has non-positive duration", s.id));
                        }
                        if s.curves.len() != kind.channels() {
                            return Err(format!(
                                "segment '{}' carries {} curves, track kind needs {}",
                                s.id,
                                s.curves.len(),
                                kind.channels()
                            ));
                        }
                        for curve in &s.curves {
                            validate_curve(curve, &s.id)?;
                        }
                    }
                }
                if segment.start_time() < previous_end - 1e-9 {
                    return Err(format!(
                        "segments overlap or are unsorted on track '{}'",
                        track.id
                    ));
                }
                previous_end = segment.end_time().max(segment.start_time());
            }
        }
        Ok(())
    }
}

fn validate_curve(curve: &Curve, segment_id: &str) -> Result<(), String> {
    let n = curve.points.len();
    if n < 2 {
        return Err(format!("segment '{segment_id}' has a curve with < 2 points"));
    }
    if curve.points[0].pos.x.abs() > 1e-5 || (curve.points[n - 1].pos.x - 1.0).abs() > 1e-5 {
        return Err(format!(
            "segment '{segment_id}' curve endpoints must sit at times 0 and 1"
        ));
    }
    let mut last = f32::NEG_INFINITY;
    for p in &curve.points {
        if !p.pos.x.is_finite() || p.pos.x < last {
            return Err(format!(
                "segment '{segment_id}' curve points must have finite, non-decreasing times"
            ));
        }
        last = p.pos.x;
    }
    Ok(())
}
