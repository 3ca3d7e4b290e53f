//! Recording Benchmarks
//!
//! Write-mode simplification of synthetic parameter streams.

use cf_bench::{generate_noisy_sine, generate_ramp, generate_square};
use cf_core::{Value, ValueKind};
use cf_engine::Automation;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const STREAM_LEN: usize = 48_000;
const CHUNK: i64 = 256;

fn record(stream: &[f64]) -> usize {
    let automation = Automation::bind(
        Value::Double(0.0),
        Value::Double(0.0),
        Value::Double(1.0),
        ValueKind::Double,
    )
    .unwrap();
    automation.begin_write();
    for (i, &x) in stream.iter().enumerate() {
        let position = i as i64;
        let chunk_end = (position / CHUNK + 1) * CHUNK;
        automation
            .ingest_write_chunk(position, chunk_end, Value::Double(x))
            .unwrap();
    }
    automation.end_write();
    automation.keyframe_count()
}

/// Benchmark simplification of one second of samples at 48 kHz
fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    group.throughput(Throughput::Elements(STREAM_LEN as u64));

    let streams = [
        ("ramp", generate_ramp(STREAM_LEN)),
        ("square_50", generate_square(STREAM_LEN, 50, 0.1, 0.9)),
        ("noisy_sine", generate_noisy_sine(STREAM_LEN, 12_000.0, 0.01, 42)),
    ];

    for (name, stream) in &streams {
        group.bench_with_input(BenchmarkId::new("stream", name), stream, |b, s| {
            b.iter(|| black_box(record(s)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_record);
criterion_main!(benches);
