//! Synthetic emulator audio for simulation runs

use crate::audio::types::{samples_in, Sample};
use crate::error::Result;
use crate::transport::SampleSource;
use std::f64::consts::TAU;

const LEFT_HZ: f64 = 440.0;
const RIGHT_HZ: f64 = 660.0;
const AMPLITUDE: f64 = 8192.0;

/// Stereo test tone delivered in whatever amounts the simulator schedules
pub struct SyntheticSource {
    sample_rate: f64,
    phase_frames: u64,
    pending_frames: usize,
    open: bool,
}

impl SyntheticSource {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            phase_frames: 0,
            pending_frames: 0,
            open: false,
        }
    }

    /// Make `frames` more stereo frames available to the next poll.
    pub fn schedule(&mut self, frames: usize) {
        self.pending_frames += frames;
    }

    fn tone(&self, hz: f64, frame: u64) -> Sample {
        let t = frame as f64 / self.sample_rate;
        (AMPLITUDE * (TAU * hz * t).sin()).round() as Sample
    }
}

impl SampleSource for SyntheticSource {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        self.phase_frames = 0;
        self.pending_frames = 0;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn poll(&mut self) -> Option<Vec<Sample>> {
        if self.pending_frames == 0 {
            return None;
        }

        let mut samples = Vec::with_capacity(samples_in(self.pending_frames));
        for _ in 0..self.pending_frames {
            let frame = self.phase_frames;
            samples.push(self.tone(LEFT_HZ, frame));
            samples.push(self.tone(RIGHT_HZ, frame));
            self.phase_frames += 1;
        }
        self.pending_frames = 0;
        Some(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivers_scheduled_frames_once() {
        let mut source = SyntheticSource::new(44_100);
        source.open().unwrap();
        assert!(source.poll().is_none());

        source.schedule(100);
        source.schedule(20);
        let samples = source.poll().unwrap();
        assert_eq!(samples.len(), 240);
        assert!(source.poll().is_none());
    }

    #[test]
    fn test_tone_is_continuous_across_polls() {
        let mut source = SyntheticSource::new(44_100);
        source.open().unwrap();
        source.schedule(1);
        let first = source.poll().unwrap();
        source.schedule(1);
        let second = source.poll().unwrap();
        // Frame 0 of a sine is silent; frame 1 is not
        assert_eq!(first, vec![0, 0]);
        assert_ne!(second, vec![0, 0]);
    }
}
