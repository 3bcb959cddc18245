//! Criterion microbenches for the YOLO-pose codec and undo history.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

use posemark::annotation::{AnnotationState, KeypointFormat, YoloPoseCodec};
use posemark::history::EditHistory;
use posemark::skeleton::SkeletonRegistry;

const LMG_RECORD: &str = "0 0.5 0.5 0.390625 0.208333 0.34375 0.5 0.421875 0.604167 0.5 0.541667 \
0.5 0.5 0.578125 0.4375 0.65625 0.5 0.734375 0.604167 0.734375 0.395833";

fn lmg_state(registry: &SkeletonRegistry) -> AnnotationState {
    let lmg = Arc::clone(registry.by_name("LMG").expect("built-in LMG"));
    let mut state = AnnotationState::with_skeleton("bench.jpg", lmg);
    for index in 0..state.keypoint_count() {
        let offset = index as f64 * 25.0;
        state
            .set_keypoint(index, 200.0 + offset, 180.0 + offset / 2.0)
            .expect("index in range");
    }
    state
}

/// Benchmark record decoding in both keypoint formats.
fn bench_decode(c: &mut Criterion) {
    let registry = SkeletonRegistry::builtin();
    let xy = YoloPoseCodec::new(KeypointFormat::Xy);
    let mut group = c.benchmark_group("yolo_pose_decode");
    group.throughput(Throughput::Bytes(LMG_RECORD.len() as u64));

    group.bench_function("lmg_xy", |b| {
        b.iter(|| {
            let state = xy
                .decode("bench.jpg", black_box(LMG_RECORD), &registry, 640, 480)
                .unwrap();
            black_box(state)
        })
    });

    let xyv = YoloPoseCodec::new(KeypointFormat::Xyv);
    let xyv_record = xyv.encode(&lmg_state(&registry), 640, 480).unwrap();
    group.bench_function("lmg_xyv", |b| {
        b.iter(|| {
            let state = xyv
                .decode("bench.jpg", black_box(&xyv_record), &registry, 640, 480)
                .unwrap();
            black_box(state)
        })
    });

    group.finish();
}

/// Benchmark record encoding.
fn bench_encode(c: &mut Criterion) {
    let registry = SkeletonRegistry::builtin();
    let state = lmg_state(&registry);
    let codec = YoloPoseCodec::default();

    c.bench_function("yolo_pose_encode/lmg_xy", |b| {
        b.iter(|| {
            let line = codec.encode(black_box(&state), 640, 480).unwrap();
            black_box(line)
        })
    });
}

/// Benchmark recording edits and walking back through them.
fn bench_history(c: &mut Criterion) {
    let registry = SkeletonRegistry::builtin();
    let state = lmg_state(&registry);

    c.bench_function("edit_history/record_100_undo_100", |b| {
        b.iter(|| {
            let mut current = state.clone();
            let mut history = EditHistory::new(current.clone());
            for step in 0..100 {
                current
                    .set_keypoint(step % 8, 100.0 + step as f64, 120.0)
                    .unwrap();
                history.record(current.clone());
            }
            while history.undo().is_ok() {}
            black_box(history.cursor())
        })
    });
}

criterion_group!(benches, bench_decode, bench_encode, bench_history);
criterion_main!(benches);
