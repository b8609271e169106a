//! Sync simulation utility
//!
//! Runs the audio sync pipeline against a synthetic emulator on a simulated
//! clock and reports how well occupancy holds the target. Use it to check
//! controller settings for a host sample rate before changing defaults.
//!
//! **Usage:**
//! ```bash
//! sync-sim [--host-rate 48000] [--callback-frames 512] [--jitter 0.2] [--export <file>]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use emusync_audio::config::TomlConfig;
use emusync_audio::simulation::{SimulationConfig, Simulator, Verdict};

/// Audio sync simulation
#[derive(Parser, Debug)]
#[command(name = "sync-sim")]
#[command(about = "Simulate emulator audio sync against a jittery producer")]
struct Args {
    /// Config file path ([sync] section supplies the controller settings)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Host audio sample rate (Hz)
    #[arg(long, default_value = "48000")]
    host_rate: u32,

    /// Stereo frames per audio callback
    #[arg(long, default_value = "512")]
    callback_frames: usize,

    /// Host visual frame rate driving the transport pump
    #[arg(long, default_value = "60", conflicts_with = "lockstep")]
    fps: f64,

    /// Deliver producer audio in lockstep with each callback instead of per visual frame
    #[arg(long)]
    lockstep: bool,

    /// Simulated duration (seconds)
    #[arg(long, default_value = "60")]
    duration: f64,

    /// Production noise per delivery, as a fraction of nominal (0.0 - 1.0)
    #[arg(long, default_value = "0.0")]
    jitter: f64,

    /// Producer speed error (0.01 = emulator 1% fast)
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    drift: f64,

    /// Stall the producer every N seconds
    #[arg(long, value_name = "SECS")]
    stall_every: Option<f64>,

    /// Length of each stall (seconds)
    #[arg(long, default_value = "0.5")]
    stall_length: f64,

    /// Override ideal_buffer_size (stereo frames)
    #[arg(long)]
    ideal_buffer: Option<usize>,

    /// Override excess_consumption_factor
    #[arg(long)]
    gain: Option<f64>,

    /// RNG seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Export results to JSON file
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emusync_audio=info".into()),
        )
        .init();

    match run(Args::parse()) {
        Ok(Verdict::Unstable) => ExitCode::from(2),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<Verdict> {
    let (config, _) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let mut sync = config.sync;
    if let Some(ideal) = args.ideal_buffer {
        sync.ideal_buffer_size = ideal;
    }
    if let Some(gain) = args.gain {
        sync.excess_consumption_factor = gain;
    }

    let callback_secs = args.callback_frames.max(1) as f64 / args.host_rate.max(1) as f64;
    let simulation = SimulationConfig {
        host_rate: args.host_rate,
        callback_frames: args.callback_frames,
        producer_rate: sync.producer_sample_rate,
        visual_fps: if args.lockstep { None } else { Some(args.fps) },
        callbacks: (args.duration.max(0.0) / callback_secs).ceil() as usize,
        jitter: args.jitter,
        producer_drift: args.drift,
        stall_every_secs: args.stall_every,
        stall_secs: args.stall_length,
        seed: args.seed,
        ..SimulationConfig::default()
    };

    let report = Simulator::new(simulation, sync)
        .context("Invalid simulation settings")?
        .run()
        .context("Simulation failed")?;

    println!("{}", report.format_summary());

    if let Some(path) = &args.export {
        report
            .export_json(path)
            .with_context(|| format!("Failed to export report to {}", path.display()))?;
        info!("Report exported to {}", path.display());
    }

    Ok(report.verdict)
}
