//! Curve Evaluation Benchmarks
//!
//! Render-thread paths: point lookup and block fills.

use cf_bench::{BLOCK_SIZES, KEYFRAME_COUNTS, generate_automation};
use cf_core::Value;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const SPACING: i64 = 480;

/// Benchmark sequential point lookups
fn bench_value_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_at");

    for &count in KEYFRAME_COUNTS {
        let automation = generate_automation(count, SPACING, 42).unwrap();
        let span = count as i64 * SPACING;

        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |b, _| {
            let mut position = 0;
            b.iter(|| {
                position = (position + 64) % span;
                black_box(automation.value_at(position))
            })
        });

        group.bench_with_input(BenchmarkId::new("jumping", count), &count, |b, _| {
            let mut position = 0;
            b.iter(|| {
                position = (position + span / 3 + 17) % span;
                black_box(automation.value_at(position))
            })
        });
    }

    group.finish();
}

/// Benchmark block fills at several playback directions and speeds
fn bench_fill_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_range");
    let automation = generate_automation(256, SPACING, 7).unwrap();

    for &size in BLOCK_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let mut values = vec![Value::Float(0.0); size];
        let mut gain = vec![0.0f32; size];

        group.bench_with_input(BenchmarkId::new("forward", size), &size, |b, _| {
            b.iter(|| {
                automation.fill_range(&mut values, 10_000.0, 1.0);
                black_box(&values)
            })
        });

        group.bench_with_input(BenchmarkId::new("reverse", size), &size, |b, _| {
            b.iter(|| {
                automation.fill_range(&mut values, 100_000.0, -1.0);
                black_box(&values)
            })
        });

        group.bench_with_input(BenchmarkId::new("varispeed_f32", size), &size, |b, _| {
            b.iter(|| {
                automation.fill_range_f32(&mut gain, 10_000.0, 1.37).unwrap();
                black_box(&gain)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_value_at, bench_fill_range);
criterion_main!(benches);
