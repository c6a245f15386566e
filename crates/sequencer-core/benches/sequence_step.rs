use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use sequencer_core::{
    OutputAffinity, OutputSet, ParameterOutput, PlayerConfig, SequencePlayer, Value, ValueKind,
};

struct NullOutput(ValueKind);

impl ParameterOutput for NullOutput {
    fn value_kind(&self) -> ValueKind {
        self.0
    }

    fn set_value(&self, _value: Value) {}
}

/// One tick over 8 float tracks with 4 Bezier segments each.
fn bench_step(c: &mut Criterion) {
    let mut outputs = OutputSet::new();
    for i in 0..8 {
        outputs.register_parameter(
            format!("param-{i}"),
            Arc::new(NullOutput(ValueKind::Float)) as Arc<dyn ParameterOutput>,
            OutputAffinity::AnyThread,
        );
    }
    let player = SequencePlayer::new(PlayerConfig::default(), outputs).expect("player");
    let track_ids: Vec<String> =
        player.with_sequence(|s| s.tracks.iter().map(|t| t.id.clone()).collect());
    let controller = player.controller();
    for track in &track_ids {
        for s in 0..4 {
            let segment = controller.insert_segment(track, s as f64).expect("segment");
            controller.insert_curve_point(track, &segment, 0, 0.33);
            controller.insert_curve_point(track, &segment, 0, 0.66);
        }
    }
    player.set_is_looping(true);
    player.play();

    c.bench_function("sequence_step", |b| b.iter(|| player.step(0.001)));
}

criterion_group!(benches, bench_step);
criterion_main!(benches);
