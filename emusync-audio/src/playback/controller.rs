//! Buffer-level controller
//!
//! Decides how many raw stereo frames each callback consumes. The base amount
//! follows the rate estimate; a proportional term drains or replenishes the
//! queue toward `ideal_buffer_size`. Producer jitter is already smoothed by the
//! rate estimator, so a plain P-controller is sufficient.

use crate::config::SyncConfig;

/// Consumption decision for one callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionPlan {
    /// Stereo frames to dequeue; never more than the occupancy it was planned against
    pub frames: usize,

    /// Estimate / requested frames (close to 1.0 in steady state)
    pub ratio: f64,

    /// Demand exceeded supply and was clipped to what is buffered
    pub starved: bool,
}

/// Proportional buffer-level controller
#[derive(Debug, Clone)]
pub struct BufferLevelController {
    ideal_buffer_size: i64,
    excess_consumption_factor: f64,
}

impl BufferLevelController {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            ideal_buffer_size: config.ideal_buffer_size as i64,
            excess_consumption_factor: config.excess_consumption_factor,
        }
    }

    /// Plan this callback's consumption.
    ///
    /// # Arguments
    /// - `estimate`: frames the producer delivers per callback (from `RateEstimator`)
    /// - `requested_frames`: stereo frames the host asked for
    /// - `occupancy`: stereo frames currently buffered
    pub fn plan(&self, estimate: f64, requested_frames: usize, occupancy: usize) -> ConsumptionPlan {
        let ratio = if requested_frames > 0 {
            estimate / requested_frames as f64
        } else {
            0.0
        };
        let available = occupancy as i64;

        let mut to_consume = (ratio * requested_frames as f64).floor() as i64;
        let excess = available - to_consume - self.ideal_buffer_size;
        to_consume += (excess as f64 * self.excess_consumption_factor).floor() as i64;

        let starved = to_consume > available;
        if starved {
            to_consume = available;
        }

        ConsumptionPlan {
            frames: to_consume.max(0) as usize,
            ratio,
            starved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(ideal: usize, factor: f64) -> BufferLevelController {
        BufferLevelController::new(&SyncConfig {
            ideal_buffer_size: ideal,
            excess_consumption_factor: factor,
            ..SyncConfig::default()
        })
    }

    #[test]
    fn test_at_target_consumes_estimate() {
        let ctl = controller(2205, 0.01);
        // occupancy - estimate == ideal: no correction
        let plan = ctl.plan(470.0, 512, 2205 + 470);
        assert_eq!(plan.frames, 470);
        assert!(!plan.starved);
        assert!((plan.ratio - 470.0 / 512.0).abs() < 1e-12);
    }

    #[test]
    fn test_over_target_drains_faster() {
        let ctl = controller(2205, 0.01);
        // 1000 frames over target -> +10
        let plan = ctl.plan(470.0, 512, 2205 + 470 + 1000);
        assert_eq!(plan.frames, 480);
    }

    #[test]
    fn test_under_target_consumes_less() {
        let ctl = controller(2205, 0.01);
        // 1000 frames under target -> -10
        let plan = ctl.plan(470.0, 512, 2205 + 470 - 1000);
        assert_eq!(plan.frames, 460);
        assert!(!plan.starved);
    }

    #[test]
    fn test_correction_rounds_down() {
        let ctl = controller(2205, 0.01);
        // excess = -1 -> floor(-0.01) = -1
        let plan = ctl.plan(470.0, 512, 2205 + 470 - 1);
        assert_eq!(plan.frames, 469);
    }

    #[test]
    fn test_starvation_clips_to_occupancy() {
        let ctl = controller(0, 0.0);
        let plan = ctl.plan(470.0, 512, 100);
        assert_eq!(plan.frames, 100);
        assert!(plan.starved);
    }

    #[test]
    fn test_never_negative() {
        let ctl = controller(100_000, 1.0);
        // Huge deficit drives the raw target far below zero
        let plan = ctl.plan(470.0, 512, 10);
        assert_eq!(plan.frames, 0);
        assert!(!plan.starved);
    }

    #[test]
    fn test_empty_queue_with_demand_is_starved() {
        let ctl = controller(0, 0.01);
        let plan = ctl.plan(470.0, 512, 0);
        assert_eq!(plan.frames, 0);
        assert!(plan.starved);
    }

    #[test]
    fn test_bounded_by_occupancy_for_many_inputs() {
        let ctl = controller(2205, 0.01);
        for occupancy in (0..10_000).step_by(37) {
            for estimate in [0.0, 100.0, 470.4, 512.0, 900.0] {
                let plan = ctl.plan(estimate, 512, occupancy);
                assert!(plan.frames <= occupancy);
            }
        }
    }
}
