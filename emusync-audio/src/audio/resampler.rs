//! Linear-interpolation resampling of stereo PCM blocks
//!
//! Stretches or compresses a variable-length block of emulator frames into the
//! fixed number of frames the host callback asks for. The conversion ratio is
//! always close to 1.0 (jitter compensation, not real rate conversion), so
//! piecewise-linear interpolation is good enough and cheap enough to run on the
//! audio thread.

use super::types::{frames_in, samples_in, Sample, CHANNEL_COUNT};

/// Stereo block resampler.
pub struct Resampler;

impl Resampler {
    /// Resample `input_frames` stereo frames of `input` into `output_frames` frames.
    ///
    /// Only the first `input_frames` frames of `input` are read. If `input` holds
    /// fewer, `input_frames` is lowered to what is there. The output is always
    /// exactly `output_frames` frames.
    ///
    /// - Equal frame counts: those `input_frames` frames, copied unchanged.
    /// - Either count zero: `output_frames` frames of silence.
    /// - Otherwise: linear interpolation between neighbouring source frames.
    pub fn resample(input: &[Sample], input_frames: usize, output_frames: usize) -> Vec<Sample> {
        let mut output = Vec::with_capacity(samples_in(output_frames));
        Self::resample_into(input, input_frames, output_frames, &mut output);
        output
    }

    /// Same as [`Resampler::resample`] but writes into a reusable buffer.
    ///
    /// `output` is cleared first. It does not reallocate once its capacity reaches
    /// `output_frames * CHANNEL_COUNT`, which keeps steady-state callbacks allocation free.
    pub fn resample_into(
        input: &[Sample],
        input_frames: usize,
        output_frames: usize,
        output: &mut Vec<Sample>,
    ) {
        let input_frames = input_frames.min(frames_in(input.len()));

        output.clear();

        if input_frames == output_frames {
            output.extend_from_slice(&input[..samples_in(input_frames)]);
            return;
        }

        if input_frames == 0 || output_frames == 0 {
            output.resize(samples_in(output_frames), 0);
            return;
        }

        // A single output frame has no span to interpolate over; take the first source frame.
        let step = if output_frames > 1 {
            (input_frames - 1) as f64 / (output_frames - 1) as f64
        } else {
            0.0
        };
        let last = input_frames - 1;

        for out_idx in 0..output_frames {
            let position = out_idx as f64 * step;
            let idx0 = (position as usize).min(last);
            let idx1 = (idx0 + 1).min(last);
            let weight1 = position - idx0 as f64;
            let weight0 = 1.0 - weight1;

            for ch in 0..CHANNEL_COUNT {
                let s0 = input[idx0 * CHANNEL_COUNT + ch] as f64;
                let s1 = input[idx1 * CHANNEL_COUNT + ch] as f64;
                output.push(round_to_sample(s0 * weight0 + s1 * weight1));
            }
        }
    }
}

/// Round half-up into i16 range.
///
/// Offsetting by 32768 keeps the floor argument non-negative for every in-range
/// value, so one rounding rule works for both signs.
#[inline]
fn round_to_sample(value: f64) -> Sample {
    let rounded = (value + 32768.5).floor() as i32 - 32768;
    rounded.clamp(i16::MIN as i32, i16::MAX as i32) as Sample
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_counts_match() {
        let input = vec![1, -1, 100, -100, i16::MAX, i16::MIN];
        let output = Resampler::resample(&input, 3, 3);
        assert_eq!(output, input);
    }

    #[test]
    fn test_extra_input_beyond_frame_count_is_ignored() {
        let input = vec![1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(Resampler::resample(&input, 2, 2), vec![1, 2, 3, 4]);
        assert_eq!(Resampler::resample(&input, 2, 3), Resampler::resample(&input[..4], 2, 3));
    }

    #[test]
    fn test_short_input_uses_available_frames() {
        let input = vec![10, 20, 30, 40];
        // Claims 4 frames but only 2 are present
        let output = Resampler::resample(&input, 4, 2);
        assert_eq!(output, input);

        let output = Resampler::resample(&input[..3], 2, 3);
        assert_eq!(output, vec![10, 20, 10, 20, 10, 20]);
    }

    #[test]
    fn test_empty_input_produces_silence() {
        let output = Resampler::resample(&[], 0, 4);
        assert_eq!(output, vec![0; 8]);
    }

    #[test]
    fn test_zero_output_frames_is_empty() {
        let output = Resampler::resample(&[5, 5, 6, 6], 2, 0);
        assert!(output.is_empty());
    }

    #[test]
    fn test_upsample_interpolates_midpoints() {
        // 2 frames -> 3 frames: middle frame is the average
        let input = vec![0, 100, 100, -100];
        let output = Resampler::resample(&input, 2, 3);
        assert_eq!(output, vec![0, 100, 50, 0, 100, -100]);
    }

    #[test]
    fn test_endpoints_preserved() {
        let input: Vec<Sample> = (0..20).map(|i| (i * 37 - 300) as Sample).collect();
        let output = Resampler::resample(&input, 10, 13);

        assert_eq!(output.len(), 26);
        assert_eq!(&output[..2], &input[..2]);
        assert_eq!(&output[24..], &input[18..]);
    }

    #[test]
    fn test_downsample_length() {
        let input = vec![7; 470 * 2];
        let output = Resampler::resample(&input, 470, 441);
        assert_eq!(output.len(), 441 * 2);
        assert!(output.iter().all(|&s| s == 7));
    }

    #[test]
    fn test_single_output_frame_takes_first_input() {
        let input = vec![10, 20, 30, 40, 50, 60];
        let output = Resampler::resample(&input, 3, 1);
        assert_eq!(output, vec![10, 20]);
    }

    #[test]
    fn test_single_input_frame_is_held() {
        let output = Resampler::resample(&[-3, 9], 1, 4);
        assert_eq!(output, vec![-3, 9, -3, 9, -3, 9, -3, 9]);
    }

    #[test]
    fn test_extremes_stay_in_range() {
        let input = vec![i16::MAX, i16::MIN, i16::MIN, i16::MAX, i16::MAX, i16::MIN];
        for out_frames in 1..50 {
            let output = Resampler::resample(&input, 3, out_frames);
            assert_eq!(output.len(), out_frames * 2);
            // Output is a convex blend of the inputs, so it cannot leave [MIN, MAX]
            assert!(output.iter().all(|&s| (i16::MIN..=i16::MAX).contains(&s)));
        }
    }

    #[test]
    fn test_rounding_is_half_up() {
        assert_eq!(round_to_sample(0.5), 1);
        assert_eq!(round_to_sample(-0.5), 0);
        assert_eq!(round_to_sample(-1.5), -1);
        assert_eq!(round_to_sample(1.49), 1);
        assert_eq!(round_to_sample(32767.4), 32767);
        assert_eq!(round_to_sample(-32768.0), -32768);
    }

    #[test]
    fn test_resample_into_reuses_buffer() {
        let mut output = Vec::with_capacity(1024);
        let input = vec![1; 600];
        Resampler::resample_into(&input, 300, 512, &mut output);
        assert_eq!(output.len(), 1024);
        let ptr = output.as_ptr();

        Resampler::resample_into(&input, 290, 512, &mut output);
        assert_eq!(output.len(), 1024);
        assert_eq!(output.as_ptr(), ptr);
    }
}
