//! Simulation report and CLI formatting

use super::SimulationConfig;
use crate::config::SyncConfig;
use crate::playback::SyncStats;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Overall judgement of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// No starvation after warmup and occupancy settled near the target
    Stable,
    /// Starvation after warmup, but within the tolerated rate
    Marginal,
    /// Sustained starvation or occupancy far from the target
    Unstable,
}

/// Occupancy statistics over the settled part of a run (stereo frames)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OccupancySummary {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub last: usize,
}

/// Complete result of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub simulation: SimulationConfig,
    pub sync: SyncConfig,

    /// Counters from the sync monitor, whole run
    pub stats: SyncStats,

    pub produced_frames: u64,
    pub consumed_frames: u64,

    /// Occupancy after each callback, warmup excluded
    pub settled_occupancy: OccupancySummary,

    /// Starvation events after warmup
    pub settled_starvation_events: u64,

    /// Simulated seconds after warmup
    pub settled_secs: f64,

    pub verdict: Verdict,
}

impl SimulationReport {
    /// Settled starvation events per second of audio
    pub fn starvation_rate(&self) -> f64 {
        if self.settled_secs > 0.0 {
            self.settled_starvation_events as f64 / self.settled_secs
        } else {
            0.0
        }
    }

    /// Export report to JSON file
    pub fn export_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Import report from JSON file
    pub fn import_json<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let report: SimulationReport = serde_json::from_reader(file)?;
        Ok(report)
    }

    /// Human-readable summary for the terminal
    pub fn format_summary(&self) -> String {
        let mut output = String::new();
        let sim = &self.simulation;

        output.push_str("\nSimulation:\n");
        output.push_str(&format!(
            "  host {}Hz x {} frames/callback, producer {}Hz",
            sim.host_rate, sim.callback_frames, sim.producer_rate
        ));
        match sim.visual_fps {
            Some(fps) => output.push_str(&format!(" @ {:.2} fps\n", fps)),
            None => output.push_str(" (lockstep)\n"),
        }
        output.push_str(&format!(
            "  jitter {:.0}%, drift {:+.2}%, {} callbacks\n",
            sim.jitter * 100.0,
            sim.producer_drift * 100.0,
            sim.callbacks
        ));

        output.push_str("\nResults:\n");
        output.push_str(&format!(
            "  frames produced/consumed: {}/{}\n",
            self.produced_frames, self.consumed_frames
        ));
        output.push_str(&format!(
            "  callbacks rendered/suppressed/inactive: {}/{}/{}\n",
            self.stats.rendered, self.stats.suppressed, self.stats.inactive
        ));
        output.push_str(&format!(
            "  starvation: {} total, {} after warmup ({:.3}/s), {} warnings\n",
            self.stats.starvation_events,
            self.settled_starvation_events,
            self.starvation_rate(),
            self.stats.starvation_warnings
        ));
        output.push_str(&format!(
            "  occupancy (target {}): min {} / mean {:.1} / max {} / last {}\n",
            self.sync.ideal_buffer_size,
            self.settled_occupancy.min,
            self.settled_occupancy.mean,
            self.settled_occupancy.max,
            self.settled_occupancy.last
        ));
        output.push_str(&format!("  final ratio: {:.5}\n", self.stats.last_ratio));
        output.push_str(&format!("\nVerdict: {:?}\n", self.verdict));

        output
    }
}
