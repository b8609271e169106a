//! Producer rate estimation
//!
//! Tracks how many stereo frames the emulator delivered per host callback period
//! and turns that into a smoothed frames-per-callback estimate.
//!
//! Producer timing is extremely noisy from one host frame to the next, so the
//! history window is long (1024 callbacks by default). Until the window fills,
//! the estimate is blended toward the nominal rate ratio so the first callbacks
//! do not act on a handful of wild measurements.

use ringbuf::{traits::*, HeapRb};

/// Fixed-capacity history of per-callback production counts.
///
/// Ring buffer with FIFO eviction and a running sum, so the mean is O(1).
pub struct RateHistory {
    buffer: HeapRb<u32>,
    sum: u64,
}

impl RateHistory {
    /// Create an empty history.
    ///
    /// # Panics
    /// If `capacity` is zero (rejected earlier by `SyncConfig::validate`).
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: HeapRb::new(capacity),
            sum: 0,
        }
    }

    /// Append a count, evicting the oldest when full.
    pub fn push(&mut self, frames: u32) {
        if let Some(evicted) = self.buffer.push_overwrite(frames) {
            self.sum -= evicted as u64;
        }
        self.sum += frames as u64;
    }

    /// Mean of the stored counts, or `None` when empty
    pub fn mean(&self) -> Option<f64> {
        let len = self.len();
        if len == 0 {
            None
        } else {
            Some(self.sum as f64 / len as f64)
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity().get()
    }

    /// Fill fraction in [0, 1]
    pub fn fill_ratio(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    pub fn clear(&mut self) {
        while self.buffer.try_pop().is_some() {}
        self.sum = 0;
    }
}

/// Smoothed estimate of frames produced per host callback.
pub struct RateEstimator {
    history: RateHistory,
    producer_rate: f64,
    host_rate: f64,
    last_estimate: f64,
}

impl RateEstimator {
    /// # Arguments
    /// - `capacity`: history window in callbacks
    /// - `producer_rate`: emulator nominal sample rate (Hz)
    /// - `host_rate`: host audio callback sample rate (Hz)
    pub fn new(capacity: usize, producer_rate: u32, host_rate: u32) -> Self {
        Self {
            history: RateHistory::new(capacity),
            producer_rate: producer_rate as f64,
            host_rate: host_rate as f64,
            last_estimate: 0.0,
        }
    }

    /// Frames the producer should deliver per callback at nominal rates.
    pub fn nominal(&self, requested_frames: usize) -> f64 {
        requested_frames as f64 * self.producer_rate / self.host_rate
    }

    /// Record this period's production and return the updated estimate.
    ///
    /// ```text
    /// nominal  = requested * producer_rate / host_rate
    /// measured = mean(history)
    /// weight   = len(history) / capacity
    /// estimate = nominal + (measured - nominal) * weight
    /// ```
    pub fn update(&mut self, provided_frames: usize, requested_frames: usize) -> f64 {
        self.history
            .push(provided_frames.min(u32::MAX as usize) as u32);

        let nominal = self.nominal(requested_frames);
        let measured = self.history.mean().unwrap_or(nominal);
        let weight = self.history.fill_ratio();

        self.last_estimate = nominal + (measured - nominal) * weight;
        self.last_estimate
    }

    /// Most recent estimate (0.0 before the first update)
    pub fn last_estimate(&self) -> f64 {
        self.last_estimate
    }

    pub fn history(&self) -> &RateHistory {
        &self.history
    }

    /// Change the host rate (new output device) without touching history.
    pub fn set_host_rate(&mut self, host_rate: u32) {
        self.host_rate = host_rate as f64;
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_estimate = 0.0;
    }
}
