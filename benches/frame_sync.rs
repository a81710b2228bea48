//! Benchmarks for frame recovery and decoding
//!
//! Measures the byte-level synchronizer on a stream of stuffed Fenix 3 frames,
//! with and without decoding and hook fan-out. The XR25 line carries about
//! 6250 bytes per second, so anything above a few MB/s leaves the reader
//! thread idle.

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use xr25::test_utils::{EchoDecoder, fenix3_stream};
use xr25::{
    FrameAssembler, FrameEvent, Fenix3Decoder, Mailbox, SeriesSet, StreamSynchronizer, SyncStats,
    TimeSeries, fan_out,
};

const FRAMES: usize = 1_000;

fn bench_assembler(c: &mut Criterion) {
    let stream = fenix3_stream(FRAMES);

    let mut group = c.benchmark_group("frame_assembler");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("split_frames", |b| {
        b.iter_batched(
            FrameAssembler::new,
            |mut assembler| {
                let mut frames = 0usize;
                for &byte in black_box(&stream) {
                    if let FrameEvent::Frame(payload) = assembler.push(byte) {
                        frames += payload.len();
                    }
                }
                black_box(frames)
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_synchronizer(c: &mut Criterion) {
    let stream = fenix3_stream(FRAMES);

    let mut group = c.benchmark_group("stream_synchronizer");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("echo_decoder", |b| {
        b.iter_batched(
            || StreamSynchronizer::new(EchoDecoder, Arc::new(SyncStats::default())),
            |mut sync| {
                sync.feed(black_box(&stream));
                black_box(sync.stats().frames_decoded())
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("fenix3_decoder", |b| {
        b.iter_batched(
            || StreamSynchronizer::new(Fenix3Decoder, Arc::new(SyncStats::default())),
            |mut sync| {
                sync.feed(black_box(&stream));
                black_box(sync.stats().frames_decoded())
            },
            BatchSize::SmallInput,
        )
    });

    let mailbox = Arc::new(Mailbox::new());
    let rpm = Arc::new(TimeSeries::new());
    let water = Arc::new(TimeSeries::new());
    let series = Arc::new(
        SeriesSet::new()
            .with("rpm", rpm, |r: &xr25::EngineRecord| (r.rpm as f64, None))
            .with("water", water, |r: &xr25::EngineRecord| (r.water_temp as f64, None)),
    );
    let hook = fan_out(vec![mailbox.hook(), series.hook()]);

    group.bench_function("fenix3_with_sinks", |b| {
        b.iter_batched(
            || {
                StreamSynchronizer::new(Fenix3Decoder, Arc::new(SyncStats::default()))
                    .with_hook(hook.clone())
            },
            |mut sync| {
                sync.feed(black_box(&stream));
                black_box(sync.stats().frames_decoded())
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_assembler, bench_synchronizer);
criterion_main!(benches);
