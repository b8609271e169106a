//! Audio Callback Performance Benchmark
//!
//! Measures one full `AudioSync::fill` (estimate, plan, dequeue, stretch, convert)
//! and the producer-side enqueue it pairs with.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emusync_audio::playback::{AudioSync, RawSampleQueue};
use emusync_audio::SyncConfig;

fn bench_callback(c: &mut Criterion) {
    let mut group = c.benchmark_group("audio_callback");

    group.bench_function("fill_512_at_48k", |b| {
        let (mut producer, consumer) = RawSampleQueue::new().split();
        let mut sync = AudioSync::new(consumer, &SyncConfig::default(), 48_000).unwrap();
        producer.open();
        producer.set_running(true);

        let block = vec![1000i16; 470 * 2];
        let mut out = vec![0.0f32; 512 * 2];

        // Settle at the target occupancy before measuring
        for _ in 0..1000 {
            producer.enqueue(&block);
            producer.record_provided(470);
            sync.fill(&mut out, 2);
        }

        b.iter(|| {
            producer.enqueue(&block);
            producer.record_provided(470);
            black_box(sync.fill(black_box(&mut out), 2));
        });
    });

    group.bench_function("enqueue_one_visual_frame", |b| {
        let (mut producer, mut consumer) = RawSampleQueue::new().split();
        producer.open();
        let block = vec![1000i16; 735 * 2];
        let mut drain = Vec::with_capacity(block.len());

        b.iter(|| {
            producer.enqueue(black_box(&block));
            drain.clear();
            consumer.dequeue_into(&mut drain, block.len());
            black_box(&drain);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_callback);
criterion_main!(benches);
