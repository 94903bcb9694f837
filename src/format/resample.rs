//! Sample rate conversion.
//!
//! Nearest-neighbor selection only: output sample `i` copies input sample
//! `floor(i * from_rate / to_rate)`. There is no anti-aliasing filter, so
//! downsampling folds content above the new Nyquist frequency back into the
//! band. That is accepted for voice traffic in exchange for a resampler with
//! no state, no allocation in [`resample_into`] and exact identity when the
//! rates match.

/// Number of output samples produced for `input_len` input samples.
///
/// Counts every output index whose source index lies inside the input,
/// i.e. `ceil(input_len * to_rate / from_rate)`. Zero when either rate is zero.
pub fn resampled_len(input_len: usize, from_rate: u32, to_rate: u32) -> usize {
    if from_rate == 0 || to_rate == 0 {
        return 0;
    }
    let numerator = input_len as u64 * u64::from(to_rate);
    numerator.div_ceil(u64::from(from_rate)) as usize
}

/// Resamples mono audio from one sample rate to another.
///
/// # Arguments
///
/// * `samples` - Input samples (mono)
/// * `from_rate` - Source sample rate in Hz
/// * `to_rate` - Target sample rate in Hz
///
/// # Returns
///
/// Resampled audio data. A copy of the input when the rates are equal, empty
/// when either rate is zero.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let mut output = Vec::with_capacity(resampled_len(samples.len(), from_rate, to_rate));
    resample_into(samples, from_rate, to_rate, &mut output);
    output
}

/// Resamples `samples` and appends the result to `output`.
///
/// Appends nothing when either rate is zero. Does not allocate when
/// `output` already has the spare capacity.
pub fn resample_into(samples: &[f32], from_rate: u32, to_rate: u32, output: &mut Vec<f32>) {
    if from_rate == 0 || to_rate == 0 {
        return;
    }
    if from_rate == to_rate {
        output.extend_from_slice(samples);
        return;
    }

    let from = u64::from(from_rate);
    let to = u64::from(to_rate);
    for i in 0..resampled_len(samples.len(), from_rate, to_rate) as u64 {
        let src_idx = (i * from / to) as usize;
        if let Some(&sample) = samples.get(src_idx) {
            output.push(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate() {
        let samples = vec![0.1f32, -0.2, 0.3];
        let resampled = resample(&samples, 24000, 24000);
        assert_eq!(resampled, samples);
    }

    #[test]
    fn test_resample_empty() {
        let resampled = resample(&[], 48000, 24000);
        assert!(resampled.is_empty());
    }

    #[test]
    fn test_resample_downsample_picks_every_other() {
        let samples: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let resampled = resample(&samples, 48000, 24000);
        assert_eq!(resampled, vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_resample_upsample_repeats() {
        let samples = vec![1.0f32, 2.0];
        let resampled = resample(&samples, 16000, 48000);
        assert_eq!(resampled, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_resample_non_integer_ratio() {
        // 44.1kHz -> 24kHz: floor(i * 44100 / 24000)
        let samples: Vec<f32> = (0..128).map(|i| i as f32).collect();
        let resampled = resample(&samples, 44100, 24000);
        assert_eq!(resampled.len(), 70);
        for (i, &value) in resampled.iter().enumerate() {
            let expected = (i as u64 * 44100 / 24000) as f32;
            assert_eq!(value, expected);
        }
    }

    #[test]
    fn test_resample_does_not_clamp() {
        let samples = vec![1.5f32, -2.0];
        assert_eq!(resample(&samples, 8000, 8000), samples);
    }

    #[test]
    fn test_resample_zero_rates() {
        assert!(resample(&[0.1, 0.2], 0, 24000).is_empty());
        assert!(resample(&[0.1, 0.2], 24000, 0).is_empty());
        assert_eq!(resampled_len(10, 0, 24000), 0);
    }

    #[test]
    fn test_resample_into_appends() {
        let mut output = vec![9.0f32];
        resample_into(&[1.0, 2.0, 3.0, 4.0], 2, 1, &mut output);
        assert_eq!(output, vec![9.0, 1.0, 3.0]);
    }

    #[test]
    fn test_resampled_len_rounds_up() {
        assert_eq!(resampled_len(3, 2, 1), 2);
        assert_eq!(resampled_len(4, 2, 1), 2);
        assert_eq!(resampled_len(480, 48000, 24000), 240);
    }
}
