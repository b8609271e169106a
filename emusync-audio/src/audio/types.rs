//! Core audio data types
//!
//! The emulator produces signed 16-bit PCM, stereo interleaved: [L, R, L, R, ...].
//! The host audio engine consumes f32 in roughly [-1.0, 1.0].

/// Raw emulator sample (signed 16-bit PCM)
pub type Sample = i16;

/// Channel count of both the producer stream and the host output (stereo only)
pub const CHANNEL_COUNT: usize = 2;

/// Scale used when converting PCM samples to float
const I16_SCALE: f32 = 32767.0;

/// Convert a PCM sample to a host float sample.
///
/// `i16::MIN` maps slightly below -1.0; hosts accept that.
#[inline]
pub fn sample_to_f32(sample: Sample) -> f32 {
    sample as f32 / I16_SCALE
}

/// Number of whole stereo frames contained in `samples` interleaved samples
#[inline]
pub fn frames_in(samples: usize) -> usize {
    samples / CHANNEL_COUNT
}

/// Interleaved sample count of `frames` stereo frames
#[inline]
pub fn samples_in(frames: usize) -> usize {
    frames * CHANNEL_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_to_f32_range() {
        assert_eq!(sample_to_f32(0), 0.0);
        assert_eq!(sample_to_f32(i16::MAX), 1.0);
        assert!(sample_to_f32(i16::MIN) < -1.0);
        assert!(sample_to_f32(i16::MIN) > -1.001);
    }

    #[test]
    fn test_frame_sample_conversions() {
        assert_eq!(frames_in(940), 470);
        assert_eq!(frames_in(941), 470);
        assert_eq!(samples_in(512), 1024);
    }
}
