//! Raw sample queue between the transport pump and the audio callback
//!
//! Single-producer single-consumer FIFO of interleaved PCM samples:
//! - Producer (host frame loop): appends whatever the shared channel delivered
//! - Consumer (audio callback): removes up to N samples without ever blocking
//!
//! The queue is unbounded. Producer data is never dropped; a stalled consumer
//! costs memory, not audio.
//!
//! Besides the samples, the shared state carries:
//! - the number of frames delivered since the last callback (rate estimator input)
//! - the open and running flags both sides check before touching the queue
//! - an epoch counter bumped on every (re)open so the consumer knows to reset
//!   its own state

use crate::audio::types::{frames_in, Sample};
use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

struct Shared {
    queue: SegQueue<Sample>,

    /// Samples pushed and not yet popped.
    /// Incremented after push, decremented after pop, so it never exceeds the real length.
    len: AtomicUsize,

    /// Stereo frames delivered since the consumer last took the count
    frames_this_period: AtomicUsize,

    /// Channel open; consumer outputs silence while false
    open: AtomicBool,

    /// Emulator running; consumer outputs silence while false
    running: AtomicBool,

    /// Bumped on every open
    epoch: AtomicU64,
}

impl Shared {
    /// Pop and discard everything currently queued.
    fn drain(&self) -> usize {
        let mut drained = 0;
        while self.queue.pop().is_some() {
            drained += 1;
        }
        self.len.fetch_sub(drained, Ordering::AcqRel);
        drained
    }
}

/// Raw sample queue, split into its producer and consumer halves before use.
pub struct RawSampleQueue {
    shared: Arc<Shared>,
}

impl Default for RawSampleQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RawSampleQueue {
    /// Create a closed, empty queue.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: SegQueue::new(),
                len: AtomicUsize::new(0),
                frames_this_period: AtomicUsize::new(0),
                open: AtomicBool::new(false),
                running: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Split into producer and consumer halves
    ///
    /// Producer is used by the host frame loop, consumer by the audio callback.
    /// Each half can be moved to a different thread.
    pub fn split(self) -> (SampleProducer, SampleConsumer) {
        let producer = SampleProducer {
            shared: Arc::clone(&self.shared),
        };
        let consumer = SampleConsumer {
            shared: self.shared,
        };
        (producer, consumer)
    }
}

/// Producer half (host frame loop / transport adapter)
pub struct SampleProducer {
    shared: Arc<Shared>,
}

impl SampleProducer {
    /// Append samples. Never blocks, never fails.
    pub fn enqueue(&mut self, samples: &[Sample]) {
        for &sample in samples {
            self.shared.queue.push(sample);
        }
        self.shared.len.fetch_add(samples.len(), Ordering::Release);
    }

    /// Add to the count of frames delivered during the current callback period.
    pub fn record_provided(&mut self, frames: usize) {
        self.shared
            .frames_this_period
            .fetch_add(frames, Ordering::Relaxed);
    }

    /// Reset all shared state and mark the queue open.
    ///
    /// The open flag is lowered for the duration of the reset, so the consumer
    /// never observes a half-reset queue as active. The epoch bump tells the
    /// consumer to reset its own state on its next callback.
    pub fn open(&mut self) {
        self.shared.open.store(false, Ordering::SeqCst);
        let drained = self.shared.drain();
        self.shared.frames_this_period.store(0, Ordering::SeqCst);
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.open.store(true, Ordering::SeqCst);

        debug!(
            "Sample queue opened (epoch {}, discarded {} stale samples)",
            epoch, drained
        );
    }

    /// Mark the queue closed and discard queued samples.
    pub fn close(&mut self) {
        self.shared.open.store(false, Ordering::SeqCst);
        let drained = self.shared.drain();
        self.shared.frames_this_period.store(0, Ordering::SeqCst);
        debug!("Sample queue closed (discarded {} samples)", drained);
    }

    /// Publish whether the emulator is currently running.
    pub fn set_running(&mut self, running: bool) {
        self.shared.running.store(running, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    /// Buffered stereo frames
    pub fn occupancy(&self) -> usize {
        frames_in(self.shared.len.load(Ordering::Acquire))
    }
}

/// Consumer half (audio callback)
pub struct SampleConsumer {
    shared: Arc<Shared>,
}

impl SampleConsumer {
    /// Remove and return up to `max_samples` samples in FIFO order.
    pub fn dequeue_up_to(&mut self, max_samples: usize) -> Vec<Sample> {
        let mut out = Vec::with_capacity(max_samples.min(self.len()));
        self.dequeue_into(&mut out, max_samples);
        out
    }

    /// Append up to `max_samples` samples to `out`; returns how many were appended.
    ///
    /// Lock-free. Returns fewer than requested when the queue runs dry, including
    /// when a concurrent reset drains it mid-call.
    pub fn dequeue_into(&mut self, out: &mut Vec<Sample>, max_samples: usize) -> usize {
        // Only counted samples may be popped; a block being pushed is counted after the fact.
        let limit = max_samples.min(self.len());
        let mut taken = 0;
        while taken < limit {
            match self.shared.queue.pop() {
                Some(sample) => {
                    out.push(sample);
                    taken += 1;
                }
                None => break,
            }
        }
        self.shared.len.fetch_sub(taken, Ordering::AcqRel);
        taken
    }

    /// Buffered samples
    pub fn len(&self) -> usize {
        self.shared.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffered stereo frames
    pub fn occupancy(&self) -> usize {
        frames_in(self.len())
    }

    /// Take the number of frames delivered since the previous call.
    pub fn take_provided(&mut self) -> usize {
        self.shared.frames_this_period.swap(0, Ordering::AcqRel)
    }

    /// Open and running
    pub fn is_active(&self) -> bool {
        self.shared.open.load(Ordering::Acquire) && self.shared.running.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    /// Current open epoch (0 until the first open)
    pub fn epoch(&self) -> u64 {
        self.shared.epoch.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fifo_order_and_empty_after_drain() {
        let (mut prod, mut cons) = RawSampleQueue::new().split();
        let samples: Vec<Sample> = (0..100).map(|i| i as Sample * 3 - 150).collect();

        prod.enqueue(&samples);
        assert_eq!(cons.len(), 100);

        let out = cons.dequeue_up_to(samples.len());
        assert_eq!(out, samples);
        assert!(cons.is_empty());
    }

    #[test]
    fn test_dequeue_returns_at_most_available() {
        let (mut prod, mut cons) = RawSampleQueue::new().split();
        prod.enqueue(&[1, 2, 3, 4]);

        let out = cons.dequeue_up_to(10);
        assert_eq!(out, vec![1, 2, 3, 4]);
        assert!(cons.dequeue_up_to(10).is_empty());
    }

    #[test]
    fn test_partial_dequeue_keeps_remainder() {
        let (mut prod, mut cons) = RawSampleQueue::new().split();
        prod.enqueue(&[1, 2, 3, 4, 5, 6]);

        assert_eq!(cons.dequeue_up_to(4), vec![1, 2, 3, 4]);
        assert_eq!(cons.occupancy(), 1);
        assert_eq!(cons.dequeue_up_to(4), vec![5, 6]);
    }

    #[test]
    fn test_provided_counter_resets_on_take() {
        let (mut prod, mut cons) = RawSampleQueue::new().split();
        prod.record_provided(470);
        prod.record_provided(30);

        assert_eq!(cons.take_provided(), 500);
        assert_eq!(cons.take_provided(), 0);
    }

    #[test]
    fn test_open_resets_shared_state_and_bumps_epoch() {
        let (mut prod, mut cons) = RawSampleQueue::new().split();
        assert!(!cons.is_open());
        assert_eq!(cons.epoch(), 0);

        prod.open();
        prod.enqueue(&[1, 2, 3, 4]);
        prod.record_provided(2);
        assert_eq!(cons.epoch(), 1);

        prod.open();
        assert!(cons.is_open());
        assert!(cons.is_empty());
        assert_eq!(cons.take_provided(), 0);
        assert_eq!(cons.epoch(), 2);
    }

    #[test]
    fn test_active_requires_open_and_running() {
        let (mut prod, cons) = RawSampleQueue::new().split();
        assert!(!cons.is_active());

        prod.open();
        assert!(!cons.is_active());

        prod.set_running(true);
        assert!(cons.is_active());

        prod.close();
        assert!(!cons.is_active());
    }

    #[test]
    fn test_concurrent_producer_consumer_preserves_order() {
        let (mut prod, mut cons) = RawSampleQueue::new().split();
        const TOTAL: usize = 100_000;

        let producer = thread::spawn(move || {
            let block: Vec<Sample> = (0..100).map(|i| i as Sample).collect();
            for _ in 0..TOTAL / 100 {
                prod.enqueue(&block);
            }
        });

        let mut received = Vec::with_capacity(TOTAL);
        while received.len() < TOTAL {
            cons.dequeue_into(&mut received, 256);
            thread::yield_now();
        }
        producer.join().unwrap();

        for (i, &sample) in received.iter().enumerate() {
            assert_eq!(sample, (i % 100) as Sample);
        }
        assert!(cons.is_empty());
    }
}
