//! emusync audio host - Main entry point
//!
//! Owns the shared audio channel, plays what the emulator writes to it on the
//! default (or selected) output device, and keeps the two clocks in step.
//!
//! The main thread is the host frame loop: it pumps the channel once per visual
//! frame and periodically logs sync statistics. Audio runs on the device thread.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emusync_audio::audio::AudioOutput;
use emusync_audio::config::TomlConfig;
use emusync_audio::playback::{AudioSync, RawSampleQueue, SyncStats};
use emusync_audio::transport::{SharedAudioChannel, TransportAdapter};

const DEFAULT_CHANNEL: &str = "emu-audio";
const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Command-line arguments for emusync-audio
#[derive(Parser, Debug)]
#[command(name = "emusync-audio")]
#[command(about = "Play emulator audio in sync with the host audio device")]
#[command(version)]
struct Args {
    /// Shared channel name the emulator writes to (overrides config file)
    #[arg(short, long, env = "EMUSYNC_CHANNEL")]
    channel: Option<String>,

    /// Config file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output device name (default device if omitted)
    #[arg(short, long)]
    device: Option<String>,

    /// Device buffer size in frames
    #[arg(long)]
    buffer_size: Option<u32>,

    /// Host visual frame rate driving the channel pump
    #[arg(long, default_value = "60")]
    fps: f64,

    /// Stop after this many seconds (run until killed if omitted)
    #[arg(long)]
    duration: Option<u64>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_path) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("emusync_audio={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to list devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    if !(args.fps.is_finite() && args.fps > 0.0) {
        bail!("--fps must be positive, got {}", args.fps);
    }

    match &config_path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let channel_name = args
        .channel
        .or(config.channel)
        .unwrap_or_else(|| DEFAULT_CHANNEL.to_string());

    let mut output = AudioOutput::new(args.device.as_deref(), args.buffer_size)
        .context("Failed to open audio output")?;
    info!(
        "Output: {} @ {}Hz, {} channels",
        output.device_name(),
        output.sample_rate(),
        output.channels()
    );

    let (producer, consumer) = RawSampleQueue::new().split();
    let sync = AudioSync::new(consumer, &config.sync, output.sample_rate())
        .context("Invalid sync configuration")?;
    let monitor = sync.monitor();

    let channel = SharedAudioChannel::new(&channel_name).context("Invalid channel name")?;
    let mut adapter = TransportAdapter::new(channel, producer);
    adapter
        .open()
        .with_context(|| format!("Failed to open channel '{}'", channel_name))?;
    adapter.set_running(true);
    info!(
        "Waiting for emulator audio on '{}' ({})",
        channel_name,
        adapter.source().path().display()
    );

    output.start(sync).context("Failed to start audio stream")?;

    let frame_period = Duration::from_secs_f64(1.0 / args.fps);
    let deadline = args.duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut last_stats = SyncStats::default();
    let mut last_log = Instant::now();
    let mut next_frame = Instant::now();

    loop {
        adapter.pump();

        if output.has_error() {
            error!("Audio stream failed ({} errors), shutting down", output.error_count());
            break;
        }

        if last_log.elapsed() >= STATS_INTERVAL {
            monitor.log_changes(&mut last_stats);
            info!(
                "Occupancy {} frames, ratio {:.5}, {} starvation events",
                last_stats.occupancy, last_stats.last_ratio, last_stats.starvation_events
            );
            last_log = Instant::now();
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Duration elapsed, shutting down");
            break;
        }

        next_frame += frame_period;
        let now = Instant::now();
        if next_frame > now {
            thread::sleep(next_frame - now);
        } else {
            // Fell behind; don't try to catch up with a burst of pumps
            next_frame = now;
        }
    }

    adapter.close();
    if let Err(e) = output.stop() {
        warn!("Failed to stop audio stream: {}", e);
    }

    let stats = monitor.stats();
    info!(
        "Shutdown complete: {} callbacks, {} starvation events, {} suppressed",
        stats.callbacks, stats.starvation_events, stats.suppressed
    );
    Ok(())
}
