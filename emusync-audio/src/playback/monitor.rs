//! Audio sync statistics
//!
//! Counters written by the audio callback and read from any other thread.
//! Recording is atomics only (no locks, no allocation), so it is safe on the
//! real-time thread. Logging of the aggregated numbers happens on the reader side.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

/// Lock-free sync statistics
#[derive(Debug, Default)]
pub struct SyncMonitor {
    /// Total callback invocations
    callbacks: AtomicU64,

    /// Callbacks that produced resampled audio
    rendered: AtomicU64,

    /// Callbacks skipped by the empty-frame guard
    suppressed: AtomicU64,

    /// Callbacks skipped because the channel was closed or the emulator not running
    inactive: AtomicU64,

    /// Callbacks where demand exceeded supply
    starvation_events: AtomicU64,

    /// Sustained-starvation warnings issued
    starvation_warnings: AtomicU64,

    /// Callbacks rejected for an unsupported channel count
    config_errors: AtomicU64,

    /// Consumer resets after a channel (re)open
    resets: AtomicU64,

    /// Last rate estimate (f64 bits)
    last_estimate: AtomicU64,

    /// Last resample ratio (f64 bits)
    last_ratio: AtomicU64,

    /// Occupancy after the last callback (stereo frames)
    occupancy: AtomicUsize,
}

impl SyncMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_callback(&self) {
        self.callbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rendered(&self, estimate: f64, ratio: f64, occupancy: usize) {
        self.rendered.fetch_add(1, Ordering::Relaxed);
        self.last_estimate.store(estimate.to_bits(), Ordering::Relaxed);
        self.last_ratio.store(ratio.to_bits(), Ordering::Relaxed);
        self.occupancy.store(occupancy, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self, occupancy: usize) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
        self.occupancy.store(occupancy, Ordering::Relaxed);
    }

    pub(crate) fn record_inactive(&self) {
        self.inactive.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_starvation(&self) {
        self.starvation_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_starvation_warning(&self) {
        self.starvation_warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_config_error(&self) {
        self.config_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            callbacks: self.callbacks.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            inactive: self.inactive.load(Ordering::Relaxed),
            starvation_events: self.starvation_events.load(Ordering::Relaxed),
            starvation_warnings: self.starvation_warnings.load(Ordering::Relaxed),
            config_errors: self.config_errors.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            last_estimate: f64::from_bits(self.last_estimate.load(Ordering::Relaxed)),
            last_ratio: f64::from_bits(self.last_ratio.load(Ordering::Relaxed)),
            occupancy: self.occupancy.load(Ordering::Relaxed),
        }
    }

    /// Log what changed since `last` and update it.
    ///
    /// Called periodically from the host frame loop, never from the audio thread.
    pub fn log_changes(&self, last: &mut SyncStats) {
        let stats = self.stats();

        if stats.starvation_events > last.starvation_events {
            debug!(
                "Audio starvation: {} total (+{} since last check), occupancy {} frames",
                stats.starvation_events,
                stats.starvation_events - last.starvation_events,
                stats.occupancy
            );
        }

        if stats.suppressed > last.suppressed && last.suppressed == 0 {
            debug!("Emulator audio stalled, output suppressed");
        }

        if stats.resets > last.resets {
            debug!("Audio sync reset ({} total)", stats.resets);
        }

        *last = stats;
    }
}

/// Sync statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    pub callbacks: u64,
    pub rendered: u64,
    pub suppressed: u64,
    pub inactive: u64,
    pub starvation_events: u64,
    pub starvation_warnings: u64,
    pub config_errors: u64,
    pub resets: u64,
    pub last_estimate: f64,
    pub last_ratio: f64,
    pub occupancy: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let monitor = SyncMonitor::new();
        monitor.record_callback();
        monitor.record_callback();
        monitor.record_rendered(470.4, 0.91875, 2300);
        monitor.record_starvation();

        let stats = monitor.stats();
        assert_eq!(stats.callbacks, 2);
        assert_eq!(stats.rendered, 1);
        assert_eq!(stats.starvation_events, 1);
        assert_eq!(stats.last_estimate, 470.4);
        assert_eq!(stats.last_ratio, 0.91875);
        assert_eq!(stats.occupancy, 2300);
    }

    #[test]
    fn test_log_changes_updates_snapshot() {
        let monitor = SyncMonitor::new();
        let mut last = SyncStats::default();
        monitor.record_callback();
        monitor.record_suppressed(0);

        monitor.log_changes(&mut last);
        assert_eq!(last, monitor.stats());
    }
}
