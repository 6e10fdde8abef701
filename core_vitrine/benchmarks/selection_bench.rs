use std::collections::HashSet;

use core_vitrine::{build_headless_app, run_frame, BagFamily, ContentLibrary, SelectionEngine};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");

    group.bench_function("take_next_photo", |b| {
        let mut engine = SelectionEngine::new(ContentLibrary::builtin(), 1);
        let avoid = HashSet::new();
        b.iter(|| engine.take_next(BagFamily::Photos, &avoid, true));
    });

    group.bench_function("pick_next_review", |b| {
        let mut engine = SelectionEngine::new(ContentLibrary::builtin(), 2);
        let avoid = HashSet::new();
        b.iter(|| engine.pick_next_review(&avoid));
    });

    group.finish();
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");

    group.bench_function("run_frame", |b| {
        b.iter_batched(
            build_headless_app,
            |mut app| {
                run_frame(&mut app);
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(selection_benches, bench_selection, bench_frame);
criterion_main!(selection_benches);
