#![allow(dead_code)]
//! Shared fixtures for the integration tests.

use std::sync::{Arc, Mutex};

use sequencer_core::{
    EventQueue, OutputAffinity, OutputSet, ParameterOutput, PlayerConfig, SequencePlayer, Value,
    ValueKind,
};

/// Records every value written to it; the tests' stand-in for a device
/// parameter.
pub struct RecordingOutput {
    kind: ValueKind,
    values: Mutex<Vec<Value>>,
}

impl RecordingOutput {
    pub fn new(kind: ValueKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            values: Mutex::new(Vec::new()),
        })
    }

    pub fn last(&self) -> Option<Value> {
        self.values.lock().unwrap().last().copied()
    }

    pub fn count(&self) -> usize {
        self.values.lock().unwrap().len()
    }

    pub fn take(&self) -> Vec<Value> {
        std::mem::take(&mut *self.values.lock().unwrap())
    }
}

impl ParameterOutput for RecordingOutput {
    fn value_kind(&self) -> ValueKind {
        self.kind
    }

    fn set_value(&self, value: Value) {
        self.values.lock().unwrap().push(value);
    }
}

pub fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

pub fn approx64(a: f64, b: f64, eps: f64) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

/// A player over one float parameter, its recording output, and the id
/// of the track the default sequence bound to it.
pub fn float_player() -> (SequencePlayer, Arc<RecordingOutput>, String) {
    let output = RecordingOutput::new(ValueKind::Float);
    let mut outputs = OutputSet::new();
    outputs.register_parameter(
        "brightness",
        output.clone() as Arc<dyn ParameterOutput>,
        OutputAffinity::AnyThread,
    );
    let player = SequencePlayer::new(PlayerConfig::default(), outputs).expect("player");
    let track_id = player.with_sequence(|sequence| sequence.tracks[0].id.clone());
    (player, output, track_id)
}

/// A player over one event sink, the queue to drain, and the id of the
/// track bound to it.
pub fn event_player() -> (SequencePlayer, EventQueue, String) {
    let queue = EventQueue::new();
    let mut outputs = OutputSet::new();
    outputs.register_events("cues", queue.clone());
    let player = SequencePlayer::new(PlayerConfig::default(), outputs).expect("player");
    let track_id = player.with_sequence(|sequence| sequence.tracks[0].id.clone());
    (player, queue, track_id)
}

/// Deterministic pseudo-random numbers for the randomized edit tests.
pub struct Lcg(pub u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    pub fn below(&mut self, n: u64) -> u64 {
        (self.next() >> 33) % n
    }

    pub fn unit_f64(&mut self) -> f64 {
        (self.next() >> 11) as f64 / (1u64 << 53) as f64
    }
}
