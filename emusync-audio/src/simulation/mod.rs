//! Offline producer/consumer simulation
//!
//! Runs the real pipeline (`TransportAdapter` -> `RawSampleQueue` -> `AudioSync`)
//! against a synthetic emulator on a simulated clock, so controller gains can be
//! checked per host sample rate without an emulator or an audio device.
//!
//! The producer is clocked either by host visual frames (bursty delivery, as in
//! production) or in lockstep with the audio callback. Jitter, a constant rate
//! drift and periodic stalls can be layered on top. Runs are deterministic for a
//! given seed.

mod report;
mod source;

pub use report::{OccupancySummary, SimulationReport, Verdict};
pub use source::SyntheticSource;

use crate::audio::types::{samples_in, CHANNEL_COUNT};
use crate::config::{SyncConfig, DEFAULT_PRODUCER_SAMPLE_RATE};
use crate::error::{Error, Result};
use crate::playback::{AudioSync, FillOutcome, RawSampleQueue};
use crate::transport::TransportAdapter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Simulated host and producer behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Host audio sample rate in Hz
    pub host_rate: u32,

    /// Stereo frames requested per callback
    pub callback_frames: usize,

    /// Producer nominal sample rate in Hz
    pub producer_rate: u32,

    /// Host visual frame rate driving the transport pump.
    /// `None` delivers in lockstep with the audio callback.
    pub visual_fps: Option<f64>,

    /// Number of audio callbacks to simulate
    pub callbacks: usize,

    /// Per-delivery production noise as a fraction of nominal (0.0 - 1.0)
    pub jitter: f64,

    /// Constant relative producer speed error (0.01 = emulator 1% fast)
    pub producer_drift: f64,

    /// Stall period in seconds; `None` disables stalls
    pub stall_every_secs: Option<f64>,

    /// Length of each stall in seconds
    pub stall_secs: f64,

    /// Seconds excluded from the settled statistics
    pub warmup_secs: f64,

    /// RNG seed for jitter
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            host_rate: 48_000,
            callback_frames: 512,
            producer_rate: DEFAULT_PRODUCER_SAMPLE_RATE,
            visual_fps: Some(60.0),
            callbacks: 6_000,
            jitter: 0.0,
            producer_drift: 0.0,
            stall_every_secs: None,
            stall_secs: 0.5,
            warmup_secs: 5.0,
            seed: 0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host_rate == 0 || self.producer_rate == 0 {
            return Err(Error::Config("sample rates must be non-zero".to_string()));
        }
        if self.callback_frames == 0 {
            return Err(Error::Config("callback_frames must be at least 1".to_string()));
        }
        if let Some(fps) = self.visual_fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(Error::Config(format!("visual_fps must be positive, got {}", fps)));
            }
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(Error::Config(format!(
                "jitter must be within [0, 1], got {}",
                self.jitter
            )));
        }
        if !self.producer_drift.is_finite() || self.producer_drift <= -1.0 {
            return Err(Error::Config(format!(
                "producer_drift must be greater than -1, got {}",
                self.producer_drift
            )));
        }
        if let Some(every) = self.stall_every_secs {
            if !every.is_finite() || every <= 0.0 || self.stall_secs >= every {
                return Err(Error::Config(format!(
                    "stall_secs ({}) must be shorter than stall_every_secs ({})",
                    self.stall_secs, every
                )));
            }
        }
        Ok(())
    }

    /// Audio time covered by one callback
    pub fn callback_secs(&self) -> f64 {
        self.callback_frames as f64 / self.host_rate as f64
    }

    /// Simulated duration
    pub fn duration_secs(&self) -> f64 {
        self.callbacks as f64 * self.callback_secs()
    }

    fn stalled_at(&self, t: f64) -> bool {
        match self.stall_every_secs {
            Some(every) => t >= every && (t % every) < self.stall_secs,
            None => false,
        }
    }
}

#[derive(Default)]
struct OccupancyAccumulator {
    min: Option<usize>,
    max: usize,
    sum: f64,
    count: u64,
    last: usize,
}

impl OccupancyAccumulator {
    fn record(&mut self, occupancy: usize) {
        self.min = Some(self.min.map_or(occupancy, |m| m.min(occupancy)));
        self.max = self.max.max(occupancy);
        self.sum += occupancy as f64;
        self.count += 1;
        self.last = occupancy;
    }

    fn summary(&self) -> OccupancySummary {
        OccupancySummary {
            min: self.min.unwrap_or(0),
            max: self.max,
            mean: if self.count > 0 {
                self.sum / self.count as f64
            } else {
                0.0
            },
            last: self.last,
        }
    }
}

/// Producer side of a run: synthetic emulator plus its delivery schedule
struct Producer {
    adapter: TransportAdapter<SyntheticSource>,
    rng: StdRng,
    owed: f64,
    jitter: f64,
}

impl Producer {
    /// One pump: schedule production for the elapsed slice, then poll it into the queue.
    fn deliver(&mut self, nominal_frames: f64, stalled: bool) {
        if !stalled {
            let noise = if self.jitter > 0.0 {
                self.rng.gen_range(-self.jitter..=self.jitter)
            } else {
                0.0
            };
            self.owed += nominal_frames * (1.0 + noise);
            let frames = self.owed.floor().max(0.0);
            self.owed -= frames;
            self.adapter.source_mut().schedule(frames as usize);
        }
        self.adapter.pump();
    }
}

/// Runs one simulation
pub struct Simulator {
    config: SimulationConfig,
    sync_config: SyncConfig,
}

impl Simulator {
    pub fn new(config: SimulationConfig, sync_config: SyncConfig) -> Result<Self> {
        config.validate()?;
        sync_config.validate()?;
        Ok(Self {
            config,
            sync_config,
        })
    }

    pub fn run(&self) -> Result<SimulationReport> {
        let cfg = &self.config;
        info!(
            "Simulating {} callbacks ({:.1}s) at {}Hz x {} frames",
            cfg.callbacks,
            cfg.duration_secs(),
            cfg.host_rate,
            cfg.callback_frames
        );

        let (queue_producer, consumer) = RawSampleQueue::new().split();
        let mut producer = Producer {
            adapter: TransportAdapter::new(SyntheticSource::new(cfg.producer_rate), queue_producer),
            rng: StdRng::seed_from_u64(cfg.seed),
            owed: 0.0,
            jitter: cfg.jitter,
        };
        let mut sync = AudioSync::new(consumer, &self.sync_config, cfg.host_rate)?;
        let monitor = sync.monitor();

        producer.adapter.open()?;
        producer.adapter.set_running(true);

        let producer_rate_hz = cfg.producer_rate as f64 * (1.0 + cfg.producer_drift);
        let callback_secs = cfg.callback_secs();
        let mut out = vec![0.0f32; samples_in(cfg.callback_frames)];

        let mut visual_frame: u64 = 0;
        let mut consumed_frames: u64 = 0;
        let mut settled = OccupancyAccumulator::default();
        let mut settled_starvation_events: u64 = 0;

        for callback in 0..cfg.callbacks {
            // Callback fires once its period has elapsed
            let now = (callback + 1) as f64 * callback_secs;

            match cfg.visual_fps {
                Some(fps) => {
                    let per_frame = producer_rate_hz / fps;
                    while visual_frame as f64 / fps <= now {
                        let t = visual_frame as f64 / fps;
                        producer.deliver(per_frame, cfg.stalled_at(t));
                        visual_frame += 1;
                    }
                }
                None => producer.deliver(producer_rate_hz * callback_secs, cfg.stalled_at(now)),
            }

            let outcome = sync.fill(&mut out, CHANNEL_COUNT);
            let warm = now > cfg.warmup_secs;

            if let FillOutcome::Rendered {
                consumed_frames: consumed,
                starved,
            } = outcome
            {
                consumed_frames += consumed as u64;
                if warm && starved {
                    settled_starvation_events += 1;
                }
            }
            if warm {
                settled.record(sync.occupancy());
            }
        }

        producer.adapter.close();

        let stats = monitor.stats();
        let settled_secs = (cfg.duration_secs() - cfg.warmup_secs).max(0.0);
        let occupancy = settled.summary();
        let verdict = self.judge(&occupancy, settled_starvation_events, settled_secs);

        debug!(
            "Simulation done: {} starvation events after warmup, mean occupancy {:.1}",
            settled_starvation_events, occupancy.mean
        );

        Ok(SimulationReport {
            simulation: cfg.clone(),
            sync: self.sync_config.clone(),
            stats,
            produced_frames: producer.adapter.total_frames(),
            consumed_frames,
            settled_occupancy: occupancy,
            settled_starvation_events,
            settled_secs,
            verdict,
        })
    }

    fn judge(&self, occupancy: &OccupancySummary, starvation_events: u64, settled_secs: f64) -> Verdict {
        let ideal = self.sync_config.ideal_buffer_size as f64;
        let on_target = (occupancy.mean - ideal).abs() <= ideal * 0.2;
        let tolerated = starvation_events as f64
            <= self.sync_config.acceptable_skips_per_second * settled_secs;

        if starvation_events == 0 && on_target {
            Verdict::Stable
        } else if tolerated {
            Verdict::Marginal
        } else {
            Verdict::Unstable
        }
    }
}

/// Run a simulation with the given settings.
pub fn simulate(config: SimulationConfig, sync_config: SyncConfig) -> Result<SimulationReport> {
    Simulator::new(config, sync_config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lockstep(callbacks: usize) -> SimulationConfig {
        SimulationConfig {
            visual_fps: None,
            callbacks,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_lockstep_settles_on_target() {
        let report = simulate(lockstep(3_000), SyncConfig::default()).unwrap();

        assert_eq!(report.stats.starvation_events, 0);
        assert_eq!(report.stats.suppressed, 0);
        assert_eq!(report.verdict, Verdict::Stable);
        let last = report.settled_occupancy.last as f64;
        assert!((last - 2205.0).abs() <= 441.0, "occupancy {}", last);
    }

    #[test]
    fn test_visual_frame_delivery_is_stable() {
        let config = SimulationConfig {
            callbacks: 3_000,
            jitter: 0.3,
            seed: 7,
            ..SimulationConfig::default()
        };
        let report = simulate(config, SyncConfig::default()).unwrap();

        assert_eq!(report.settled_starvation_events, 0);
        assert!(report.settled_occupancy.min > 0);
        assert!(report.consumed_frames <= report.produced_frames);
    }

    #[test]
    fn test_stalls_are_suppressed() {
        let config = SimulationConfig {
            callbacks: 2_000,
            stall_every_secs: Some(5.0),
            stall_secs: 1.0,
            ..SimulationConfig::default()
        };
        let report = simulate(config, SyncConfig::default()).unwrap();
        assert!(report.stats.suppressed > 0);
    }

    #[test]
    fn test_same_seed_same_report() {
        let config = SimulationConfig {
            callbacks: 500,
            jitter: 0.5,
            seed: 42,
            ..SimulationConfig::default()
        };
        let a = simulate(config.clone(), SyncConfig::default()).unwrap();
        let b = simulate(config, SyncConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_config() {
        let config = SimulationConfig {
            jitter: 2.0,
            ..SimulationConfig::default()
        };
        assert!(Simulator::new(config, SyncConfig::default()).is_err());

        let config = SimulationConfig {
            stall_every_secs: Some(1.0),
            stall_secs: 1.0,
            ..SimulationConfig::default()
        };
        assert!(Simulator::new(config, SyncConfig::default()).is_err());
    }

    #[test]
    fn test_report_json_roundtrip() {
        let report = simulate(lockstep(200), SyncConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        report.export_json(&path).unwrap();
        let loaded = SimulationReport::import_json(&path).unwrap();
        assert_eq!(loaded.stats.callbacks, 200);
        assert_eq!(loaded.verdict, report.verdict);
    }
}
