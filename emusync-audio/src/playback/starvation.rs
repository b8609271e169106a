//! Starvation and producer-stall tracking
//!
//! Both trackers live on the audio thread and are reset on every channel open.
//!
//! - `SkipCounter`: a budget that refills at `acceptable_skips_per_second` of audio
//!   time and is spent by each starvation event. Overspending means starvation is
//!   sustained rather than occasional.
//! - `EmptyFrameGuard`: counts consecutive callbacks with no new producer data and
//!   suppresses processing once the emulator has evidently stalled.

/// Minimum audio time between two sustained-starvation reports
const MIN_REPORT_INTERVAL_SECS: f64 = 2.0;

/// Starvation budget
#[derive(Debug, Clone)]
pub struct SkipCounter {
    counter: f64,
    refill_per_second: f64,
    grace_secs: f64,
    elapsed_secs: f64,
    last_report_secs: Option<f64>,
}

impl SkipCounter {
    /// # Arguments
    /// - `acceptable_skips_per_second`: refill rate
    /// - `grace_secs`: audio time after reset during which overspending is not reported
    pub fn new(acceptable_skips_per_second: f64, grace_secs: f64) -> Self {
        Self {
            counter: 0.0,
            refill_per_second: acceptable_skips_per_second,
            grace_secs,
            elapsed_secs: 0.0,
            last_report_secs: None,
        }
    }

    /// Advance audio time by one callback period.
    pub fn advance(&mut self, secs: f64) {
        self.counter += self.refill_per_second * secs;
        self.elapsed_secs += secs;
    }

    /// Spend one unit for a starvation event.
    ///
    /// Returns true when the budget is overspent and a report is due; the caller
    /// reports that. The budget is zeroed on overspend either way. Reports are
    /// withheld during the grace period and limited to one per
    /// `MIN_REPORT_INTERVAL_SECS` of audio time.
    pub fn record_starvation(&mut self) -> bool {
        self.counter -= 1.0;
        if self.counter >= 0.0 {
            return false;
        }
        self.counter = 0.0;

        if self.elapsed_secs <= self.grace_secs {
            return false;
        }
        let due = match self.last_report_secs {
            Some(last) => self.elapsed_secs - last >= MIN_REPORT_INTERVAL_SECS,
            None => true,
        };
        if due {
            self.last_report_secs = Some(self.elapsed_secs);
        }
        due
    }

    pub fn value(&self) -> f64 {
        self.counter
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn reset(&mut self) {
        self.counter = 0.0;
        self.elapsed_secs = 0.0;
        self.last_report_secs = None;
    }
}

/// Consecutive empty-callback guard
#[derive(Debug, Clone)]
pub struct EmptyFrameGuard {
    consecutive_empty: u32,
    max_consecutive_empty: u32,
}

impl EmptyFrameGuard {
    pub fn new(max_consecutive_empty: u32) -> Self {
        Self {
            consecutive_empty: 0,
            max_consecutive_empty,
        }
    }

    /// Observe this callback's production; returns true when processing should be skipped.
    ///
    /// Any non-empty delivery clears the streak.
    pub fn observe(&mut self, provided_frames: usize) -> bool {
        if provided_frames == 0 {
            self.consecutive_empty = self.consecutive_empty.saturating_add(1);
            self.consecutive_empty > self.max_consecutive_empty
        } else {
            self.consecutive_empty = 0;
            false
        }
    }

    pub fn consecutive_empty(&self) -> u32 {
        self.consecutive_empty
    }

    pub fn reset(&mut self) {
        self.consecutive_empty = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occasional_starvation_is_absorbed() {
        let mut skips = SkipCounter::new(0.5, 0.0);
        // 10 seconds of audio earns 5 skips
        for _ in 0..10 {
            skips.advance(1.0);
        }
        for _ in 0..5 {
            assert!(!skips.record_starvation());
        }
        assert!(skips.value() >= -1e-9);
    }

    #[test]
    fn test_sustained_starvation_reports() {
        let mut skips = SkipCounter::new(0.5, 0.0);
        skips.advance(2.0);
        assert!(!skips.record_starvation());
        assert!(skips.record_starvation());
        // Budget zeroed after overspend
        assert_eq!(skips.value(), 0.0);
    }

    #[test]
    fn test_continuous_starvation_reports_are_rate_limited() {
        let mut skips = SkipCounter::new(0.5, 0.0);
        skips.advance(0.5);
        let mut reports = 0;
        // 4 seconds of starving on every 10ms callback
        for _ in 0..400 {
            skips.advance(0.01);
            if skips.record_starvation() {
                reports += 1;
            }
        }
        assert_eq!(reports, 2);
    }

    #[test]
    fn test_grace_period_silences_reports() {
        let mut skips = SkipCounter::new(0.5, 5.0);
        skips.advance(1.0);
        assert!(!skips.record_starvation());
        assert!(!skips.record_starvation());

        for _ in 0..10 {
            skips.advance(1.0);
        }
        for _ in 0..5 {
            skips.record_starvation();
        }
        assert!(skips.record_starvation());
    }

    #[test]
    fn test_empty_guard_threshold() {
        let mut guard = EmptyFrameGuard::new(5);
        for _ in 0..5 {
            assert!(!guard.observe(0));
        }
        // Sixth consecutive empty callback is suppressed, and so are the following ones
        assert!(guard.observe(0));
        assert!(guard.observe(0));

        // Data resumes
        assert!(!guard.observe(470));
        assert_eq!(guard.consecutive_empty(), 0);
    }

    #[test]
    fn test_empty_guard_streak_interrupted() {
        let mut guard = EmptyFrameGuard::new(2);
        assert!(!guard.observe(0));
        assert!(!guard.observe(0));
        assert!(!guard.observe(1));
        assert!(!guard.observe(0));
        assert!(!guard.observe(0));
        assert!(guard.observe(0));
    }
}
