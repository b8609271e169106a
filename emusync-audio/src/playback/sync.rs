//! Host audio callback
//!
//! `AudioSync` is the consumer side of the pipeline. Each call to [`AudioSync::fill`]:
//! 1. Checks channel count and the open/running gate
//! 2. Resets local state if the channel was reopened since the last call
//! 3. Feeds the period's production count to the rate estimator
//! 4. Asks the buffer-level controller how many frames to consume
//! 5. Dequeues them, stretches them to the requested length, converts to f32
//!
//! The host buffer is always fully written: rendered audio, or silence when the
//! callback short-circuits. Work is bounded by the requested buffer length and
//! nothing here blocks or returns an error.

use crate::audio::resampler::Resampler;
use crate::audio::types::{frames_in, sample_to_f32, samples_in, Sample, CHANNEL_COUNT};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::playback::controller::BufferLevelController;
use crate::playback::monitor::SyncMonitor;
use crate::playback::rate_estimator::RateEstimator;
use crate::playback::sample_queue::SampleConsumer;
use crate::playback::starvation::{EmptyFrameGuard, SkipCounter};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Scratch capacity reserved up front, in stereo frames
const SCRATCH_FRAMES: usize = 8192;

/// What a single callback did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// Audio rendered from `consumed_frames` raw frames
    Rendered { consumed_frames: usize, starved: bool },
    /// Producer stalled; silence written, nothing consumed
    Suppressed,
    /// Channel closed or emulator not running; silence written
    Inactive,
    /// Host asked for an unsupported channel count; silence written
    UnsupportedChannels(usize),
}

/// Consumer-side sync state, owned by the audio thread.
pub struct AudioSync {
    consumer: SampleConsumer,
    host_rate: u32,
    estimator: RateEstimator,
    controller: BufferLevelController,
    skips: SkipCounter,
    empty_guard: EmptyFrameGuard,
    epoch: u64,
    raw: Vec<Sample>,
    resampled: Vec<Sample>,
    channel_error_reported: bool,
    monitor: Arc<SyncMonitor>,
}

impl AudioSync {
    /// # Arguments
    /// - `consumer`: consumer half of the raw sample queue
    /// - `config`: sync knobs (validated here)
    /// - `host_rate`: sample rate of the host audio callback in Hz
    pub fn new(consumer: SampleConsumer, config: &SyncConfig, host_rate: u32) -> Result<Self> {
        config.validate()?;
        if host_rate == 0 {
            return Err(Error::Config("host sample rate must be non-zero".to_string()));
        }

        debug!(
            "Audio sync created: host_rate={}Hz, producer_rate={}Hz, ideal_buffer={} frames",
            host_rate, config.producer_sample_rate, config.ideal_buffer_size
        );

        Ok(Self {
            consumer,
            host_rate,
            estimator: RateEstimator::new(
                config.moving_average_n,
                config.producer_sample_rate,
                host_rate,
            ),
            controller: BufferLevelController::new(config),
            skips: SkipCounter::new(config.acceptable_skips_per_second, config.startup_grace_secs),
            empty_guard: EmptyFrameGuard::new(config.max_consecutive_empty_frames),
            epoch: 0,
            raw: Vec::with_capacity(samples_in(SCRATCH_FRAMES)),
            resampled: Vec::with_capacity(samples_in(SCRATCH_FRAMES)),
            channel_error_reported: false,
            monitor: Arc::new(SyncMonitor::new()),
        })
    }

    /// Shared statistics handle for non-audio threads
    pub fn monitor(&self) -> Arc<SyncMonitor> {
        Arc::clone(&self.monitor)
    }

    pub fn host_rate(&self) -> u32 {
        self.host_rate
    }

    /// Switch to a new host rate (output device changed).
    pub fn set_host_rate(&mut self, host_rate: u32) {
        if host_rate > 0 && host_rate != self.host_rate {
            self.host_rate = host_rate;
            self.estimator.set_host_rate(host_rate);
            self.estimator.reset();
        }
    }

    /// Most recent rate estimate in frames per callback
    pub fn estimate(&self) -> f64 {
        self.estimator.last_estimate()
    }

    /// Buffered stereo frames
    pub fn occupancy(&self) -> usize {
        self.consumer.occupancy()
    }

    /// Fill one host buffer of interleaved f32 samples.
    ///
    /// Real-time safe: lock-free, allocation-free once the scratch buffers have
    /// grown to the working size, and O(out.len()).
    pub fn fill(&mut self, out: &mut [f32], channels: usize) -> FillOutcome {
        self.monitor.record_callback();

        if channels != CHANNEL_COUNT {
            out.fill(0.0);
            self.monitor.record_config_error();
            if !self.channel_error_reported {
                error!(
                    "Audio output must be stereo ({} channels requested), emulator audio disabled",
                    channels
                );
                self.channel_error_reported = true;
            }
            return FillOutcome::UnsupportedChannels(channels);
        }

        if !self.consumer.is_active() {
            out.fill(0.0);
            self.monitor.record_inactive();
            return FillOutcome::Inactive;
        }

        let epoch = self.consumer.epoch();
        if epoch != self.epoch {
            self.reset_state();
            self.epoch = epoch;
        }

        let requested = frames_in(out.len());
        if requested == 0 {
            // Delivered count carries over to the next real callback
            out.fill(0.0);
            return FillOutcome::Rendered {
                consumed_frames: 0,
                starved: false,
            };
        }

        self.skips
            .advance(requested as f64 / self.host_rate as f64);

        let provided = self.consumer.take_provided();
        if self.empty_guard.observe(provided) {
            out.fill(0.0);
            self.monitor.record_suppressed(self.consumer.occupancy());
            return FillOutcome::Suppressed;
        }

        let estimate = self.estimator.update(provided, requested);
        let plan = self
            .controller
            .plan(estimate, requested, self.consumer.occupancy());

        if plan.starved {
            self.monitor.record_starvation();
            if self.skips.record_starvation() {
                self.monitor.record_starvation_warning();
                warn!("Suffering frequent audio drops (consider increasing ideal_buffer_size)");
            }
        }

        self.raw.clear();
        let taken = self
            .consumer
            .dequeue_into(&mut self.raw, samples_in(plan.frames));
        // A concurrent reset can leave fewer samples than planned
        let consumed = frames_in(taken);

        Resampler::resample_into(&self.raw, consumed, requested, &mut self.resampled);

        for (dst, &src) in out.iter_mut().zip(self.resampled.iter()) {
            *dst = sample_to_f32(src);
        }
        if out.len() > self.resampled.len() {
            out[self.resampled.len()..].fill(0.0);
        }

        self.monitor
            .record_rendered(estimate, plan.ratio, self.consumer.occupancy());

        FillOutcome::Rendered {
            consumed_frames: consumed,
            starved: plan.starved,
        }
    }

    fn reset_state(&mut self) {
        self.estimator.reset();
        self.skips.reset();
        self.empty_guard.reset();
        self.channel_error_reported = false;
        self.monitor.record_reset();
    }
}
