//! Criterion benchmarks for the activation engine.
//!
//! Run with:
//!   cargo bench
//!   cargo bench --no-default-features --features serde   (single-threaded batch)
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use selnet::prelude::*;

fn make_driver(width: usize, schedule: Schedule) -> Driver<StagedUpdater> {
    let cfg = NetworkConfig::default().with_seed(42).with_schedule(schedule);
    let preset = conditioning(cfg, width).expect("preset builds");
    Driver::new(preset.network, StagedUpdater)
}

/// Full ticks at growing association widths under both schedules.
fn bench_tick_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_width");
    let ctx = RunContext::silent();

    for width in [8usize, 32, 128, 256] {
        // width^2 association synapses dominate the work.
        group.throughput(Throughput::Elements((width * width) as u64));

        for (label, schedule) in [
            ("sequential", Schedule::SequentialRandomized),
            ("batch", Schedule::ParallelBatch { workers: 0 }),
        ] {
            group.bench_with_input(BenchmarkId::new(label, width), &width, |b, &width| {
                let mut driver = make_driver(width, schedule);
                let mut step = 0u64;
                b.iter(|| {
                    step += 1;
                    let us = if step % 4 == 0 { 1.0 } else { 0.0 };
                    let report = driver.tick(&ctx, &[1.0, us]).expect("tick");
                    black_box(report.signals.dopaminergic)
                });
            });
        }
    }

    group.finish();
}

/// One operant pass without learning, comparing worker counts.
fn bench_batch_workers(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_workers");
    let ctx = RunContext::silent().with_learning(false);
    let width = 256;

    for workers in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(workers), &workers, |b, &workers| {
            let mut driver = make_driver(width, Schedule::ParallelBatch { workers });
            b.iter(|| black_box(driver.tick(&ctx, &[1.0, 0.0]).expect("tick").actions.len()));
        });
    }

    group.finish();
}

fn bench_image(c: &mut Criterion) {
    let driver = make_driver(128, Schedule::SequentialRandomized);
    let bytes = driver.network().save_image_bytes().expect("save");

    c.bench_function("image_save_128", |b| {
        b.iter(|| black_box(driver.network().save_image_bytes().expect("save").len()))
    });
    c.bench_function("image_load_128", |b| {
        b.iter(|| black_box(Network::load_image_bytes(&bytes).expect("load").node_count()))
    });
}

criterion_group!(benches, bench_tick_sizes, bench_batch_workers, bench_image);
criterion_main!(benches);
