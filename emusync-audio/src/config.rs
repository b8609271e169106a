//! Configuration for the audio sync pipeline
//!
//! Two layers:
//! 1. **TOML bootstrap** (`TomlConfig`): shared channel name, logging, and the sync knobs.
//! 2. **Sync knobs** (`SyncConfig`): passed explicitly to the consumer side so every
//!    component can be tested in isolation.
//!
//! All fields have built-in defaults; a missing config file is not an error.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Native sample rate of the emulator's audio output
pub const DEFAULT_PRODUCER_SAMPLE_RATE: u32 = 44_100;

/// Tuning knobs for the buffer-level controller and rate estimator.
///
/// The gains are empirical. Validate them per host sample rate with `sync-sim`
/// before changing defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Target steady-state occupancy in stereo frames.
    ///
    /// Higher means more latency but more resilience to producer jitter.
    /// Default: 2205 (50ms @ 44.1kHz)
    pub ideal_buffer_size: usize,

    /// Capacity of the per-callback production history.
    ///
    /// Producer timing is extremely noisy frame to frame, so this needs to be large.
    /// Default: 1024
    pub moving_average_n: usize,

    /// Proportional gain pulling occupancy toward `ideal_buffer_size`.
    ///
    /// Default: 0.01
    pub excess_consumption_factor: f64,

    /// Starvation events per second tolerated before warning.
    ///
    /// Default: 0.5
    pub acceptable_skips_per_second: f64,

    /// Consecutive empty callbacks tolerated before output is suppressed.
    ///
    /// Default: 5
    pub max_consecutive_empty_frames: u32,

    /// Producer nominal sample rate in Hz.
    ///
    /// Default: 44100
    pub producer_sample_rate: u32,

    /// Seconds of audio after (re)open during which starvation warnings are not logged.
    /// The emulator is typically still booting during this window.
    ///
    /// Default: 5.0
    pub startup_grace_secs: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ideal_buffer_size: 2205, // 50ms @ 44.1kHz
            moving_average_n: 1024,
            excess_consumption_factor: 0.01,
            acceptable_skips_per_second: 0.5,
            max_consecutive_empty_frames: 5,
            producer_sample_rate: DEFAULT_PRODUCER_SAMPLE_RATE,
            startup_grace_secs: 5.0,
        }
    }
}

impl SyncConfig {
    /// Check knob ranges.
    pub fn validate(&self) -> Result<()> {
        if self.moving_average_n == 0 {
            return Err(Error::Config(
                "moving_average_n must be at least 1".to_string(),
            ));
        }
        if self.producer_sample_rate == 0 {
            return Err(Error::Config(
                "producer_sample_rate must be non-zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.excess_consumption_factor) {
            return Err(Error::Config(format!(
                "excess_consumption_factor must be within [0, 1], got {}",
                self.excess_consumption_factor
            )));
        }
        if !self.acceptable_skips_per_second.is_finite() || self.acceptable_skips_per_second < 0.0 {
            return Err(Error::Config(format!(
                "acceptable_skips_per_second must be non-negative, got {}",
                self.acceptable_skips_per_second
            )));
        }
        if !self.startup_grace_secs.is_finite() || self.startup_grace_secs < 0.0 {
            return Err(Error::Config(format!(
                "startup_grace_secs must be non-negative, got {}",
                self.startup_grace_secs
            )));
        }
        Ok(())
    }
}

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Name of the shared audio channel the emulator writes to
    #[serde(default)]
    pub channel: Option<String>,

    /// Sync pipeline knobs
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Load and validate the bootstrap config.
    ///
    /// Returns the config and the file it came from, if any.
    pub fn load(cli_path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let (config, path): (Self, _) = emusync_common::config::load_or_default(cli_path)?;
        config.sync.validate()?;
        Ok((config, path))
    }
}
