//! Adapters translate "current time" into one write to one output, once
//! per tick, for one track.
//!
//! The set of adapter shapes is closed and chosen by a single factory
//! match at bind time, so the per-tick evaluate/convert/write path stays
//! monomorphic. Adapters hold output handles but never references into
//! the sequence; the track is passed in on every update.

use std::sync::Arc;

use thiserror::Error;

use crate::events::{EventQueue, SequenceEvent};
use crate::mailbox::ParameterMailbox;
use crate::output::{OutputAffinity, OutputTarget, ParameterOutput};
use crate::sequence::{Segment, Track, TrackKind};
use crate::value::{Value, ValueKind};

/// Why a track could not be bound to an output. Never fatal: the caller
/// logs it and leaves the track unbound.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("no output registered with id '{id}'")]
    UnknownOutput { id: String },
    #[error("track kind {track:?} is incompatible with output '{id}' ({output})")]
    KindMismatch {
        id: String,
        track: TrackKind,
        output: String,
    },
}

/// How a computed value reaches its parameter.
pub(crate) enum AdapterDelivery {
    /// Written inline on the playback thread.
    Direct(Arc<dyn ParameterOutput>),
    /// Staged for the main-thread flush, last value wins.
    Mailbox(Arc<ParameterMailbox>),
}

/// Samples a curve track and drives a parameter output.
pub(crate) struct CurveAdapter {
    kind: ValueKind,
    delivery: AdapterDelivery,
}

/// Map a normalized value into the track's [minimum, maximum] range.
fn map_range(value: Value, minimum: f32, maximum: f32) -> Value {
    let span = maximum - minimum;
    let map = |v: f32| v * span + minimum;
    match value {
        Value::Float(v) => Value::Float(map(v)),
        Value::Vec2(v) => Value::Vec2([map(v[0]), map(v[1])]),
        Value::Vec3(v) => Value::Vec3([map(v[0]), map(v[1]), map(v[2])]),
        Value::Vec4(v) => Value::Vec4([map(v[0]), map(v[1]), map(v[2]), map(v[3])]),
    }
}

impl CurveAdapter {
    fn update(&self, track: &Track, time: f64) {
        for segment in &track.segments {
            let Segment::Curve(source) = segment else {
                continue;
            };
            if time >= source.start_time && time < source.end_time() {
                let t = ((time - source.start_time) / source.duration) as f32;
                let value = map_range(
                    source.sample(self.kind, t),
                    track.minimum,
                    track.maximum,
                );
                match &self.delivery {
                    AdapterDelivery::Direct(parameter) => parameter.set_value(value),
                    AdapterDelivery::Mailbox(mailbox) => mailbox.store(value),
                }
                break;
            }
        }
        // No containing segment: no write, the output holds its last value.
    }

    fn mailbox(&self) -> Option<Arc<ParameterMailbox>> {
        match &self.delivery {
            AdapterDelivery::Mailbox(mailbox) => Some(Arc::clone(mailbox)),
            AdapterDelivery::Direct(_) => None,
        }
    }
}

/// Detects event markers crossed since the previous tick and enqueues
/// them, exactly once each, in crossing order.
pub(crate) struct EventAdapter {
    queue: EventQueue,
    previous_time: f64,
}

impl EventAdapter {
    fn new(queue: EventQueue, start_time: f64) -> Self {
        Self {
            queue,
            previous_time: start_time,
        }
    }

    /// `wrapped` is reported by the time advance when a loop boundary was
    /// crossed this tick; the crossed interval is then the union of
    /// `(previous, duration]` and `[0, time]`. Backward movement without
    /// a wrap fires nothing.
    fn update(&mut self, track: &Track, time: f64, duration: f64, wrapped: bool) {
        if wrapped {
            self.emit_range(track, self.previous_time, duration, false);
            self.emit_range(track, 0.0, time, true);
        } else if time > self.previous_time {
            self.emit_range(track, self.previous_time, time, false);
        }
        self.previous_time = time;
    }

    fn emit_range(&self, track: &Track, lo: f64, hi: f64, lo_inclusive: bool) {
        for segment in &track.segments {
            let Segment::Event(marker) = segment else {
                continue;
            };
            let t = marker.start_time;
            let after_lo = if lo_inclusive { t >= lo } else { t > lo };
            if after_lo && t <= hi {
                self.queue.enqueue(SequenceEvent {
                    time: t,
                    track_id: track.id.clone(),
                    message: marker.message.clone(),
                });
            }
        }
    }
}

pub(crate) enum Adapter {
    Curve(CurveAdapter),
    Event(EventAdapter),
}

impl Adapter {
    pub(crate) fn update(&mut self, track: &Track, time: f64, duration: f64, wrapped: bool) {
        match self {
            Adapter::Curve(adapter) => adapter.update(track, time),
            Adapter::Event(adapter) => adapter.update(track, time, duration, wrapped),
        }
    }

    pub(crate) fn mailbox(&self) -> Option<Arc<ParameterMailbox>> {
        match self {
            Adapter::Curve(adapter) => adapter.mailbox(),
            Adapter::Event(_) => None,
        }
    }
}

/// Bind-time factory: one adapter shape per (track kind, output target)
/// pair. `time` seeds the event adapter's crossing detector so a rebind
/// never replays markers already behind the playhead.
pub(crate) fn create_adapter(
    track: &Track,
    output_id: &str,
    target: &OutputTarget,
    time: f64,
) -> Result<Adapter, BindError> {
    match (track.kind.value_kind(), target) {
        (Some(kind), OutputTarget::Parameter { parameter, affinity }) => {
            if parameter.value_kind() != kind {
                return Err(BindError::KindMismatch {
                    id: output_id.to_string(),
                    track: track.kind,
                    output: format!("{:?} parameter", parameter.value_kind()),
                });
            }
            let delivery = match affinity {
                OutputAffinity::AnyThread => AdapterDelivery::Direct(Arc::clone(parameter)),
                OutputAffinity::MainThread => AdapterDelivery::Mailbox(Arc::new(
                    ParameterMailbox::new(Arc::clone(parameter)),
                )),
            };
            Ok(Adapter::Curve(CurveAdapter { kind, delivery }))
        }
        (None, OutputTarget::Events(queue)) => {
            Ok(Adapter::Event(EventAdapter::new(queue.clone(), time)))
        }
        (Some(_), OutputTarget::Events(_)) => Err(BindError::KindMismatch {
            id: output_id.to_string(),
            track: track.kind,
            output: "event sink".to_string(),
        }),
        (None, OutputTarget::Parameter { parameter, .. }) => Err(BindError::KindMismatch {
            id: output_id.to_string(),
            track: track.kind,
            output: format!("{:?} parameter", parameter.value_kind()),
        }),
    }
}
