//! Host audio output using cpal
//!
//! Opens an output device and drives `AudioSync::fill` from the device callback.
//! The device keeps its own sample rate; rate conversion from the emulator's
//! rate is the resampler's job, so any stereo rate works.

use crate::error::{Error, Result};
use crate::playback::AudioSync;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
    error_count: Arc<AtomicU32>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an audio device for output.
    ///
    /// # Arguments
    /// - `device_name`: device to open (None = default device). Falls back to the
    ///   default device if the named one is not found.
    /// - `buffer_size`: frames per callback (None = device default)
    pub fn new(device_name: Option<&str>, buffer_size: Option<u32>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host
                    .output_devices()
                    .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!("Requested device '{}' not found, falling back to default device", name);
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        info!(
            "Using audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let (mut config, sample_format) = Self::get_best_config(&device)?;

        if let Some(size) = buffer_size {
            config.buffer_size = cpal::BufferSize::Fixed(size);
            debug!("Using requested buffer size: {} frames", size);
        }

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            error_flag: Arc::new(AtomicBool::new(false)),
            error_count: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Prefer a stereo f32 or i16 config at the device's default rate.
    fn get_best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let default = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
        let rate = default.sample_rate();

        let supported: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
            .collect();

        for format in [SampleFormat::F32, SampleFormat::I16] {
            let preferred = supported.iter().find(|config| {
                config.channels() == 2
                    && config.sample_format() == format
                    && config.min_sample_rate() <= rate
                    && config.max_sample_rate() >= rate
            });
            if let Some(config) = preferred {
                return Ok((config.clone().with_sample_rate(rate).config(), format));
            }
        }

        // No stereo config; the sync callback reports the channel mismatch
        let sample_format = default.sample_format();
        Ok((default.config(), sample_format))
    }

    /// Start playback, moving `sync` onto the audio thread.
    pub fn start(&mut self, mut sync: AudioSync) -> Result<()> {
        info!("Starting audio stream");

        let rate = self.sample_rate();
        if sync.host_rate() != rate {
            sync.set_host_rate(rate);
        }

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream_f32(sync)?,
            SampleFormat::I16 => self.build_stream_i16(sync)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);

        info!("Audio stream started successfully");
        Ok(())
    }

    fn error_callback(&self) -> impl FnMut(cpal::StreamError) + Send + 'static {
        let error_flag = Arc::clone(&self.error_flag);
        let error_count = Arc::clone(&self.error_count);
        move |err| {
            error!("Audio stream error: {}", err);
            error_flag.store(true, Ordering::SeqCst);
            error_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn build_stream_f32(&self, mut sync: AudioSync) -> Result<Stream> {
        let channels = self.config.channels as usize;

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    sync.fill(data, channels);
                },
                self.error_callback(),
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    fn build_stream_i16(&self, mut sync: AudioSync) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let mut scratch: Vec<f32> = Vec::new();

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    // Grows to the device buffer size once, then reused
                    scratch.resize(data.len(), 0.0);
                    sync.fill(&mut scratch, channels);
                    for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                        *dst = (src.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    }
                },
                self.error_callback(),
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Stop playback and drop the stream.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }
        Ok(())
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown".to_string())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// True once the stream has reported an error
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::SeqCst)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices_does_not_panic() {
        // Needs audio hardware to return anything; an error is acceptable
        let _ = AudioOutput::list_devices();
    }
}
