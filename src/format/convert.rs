//! Sample format and channel conversion.

/// Converts an f32 sample to i16.
///
/// Input should be in the range [-1.0, 1.0].
/// Values outside this range are clamped.
///
/// Uses × 32767 (not 32768) for symmetric scaling. This means -1.0 maps
/// to -32767 rather than -32768, losing 1 LSB at the negative extreme.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Converts an i16 sample to f32.
///
/// Output will be in the range [-1.0, 1.0].
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Encodes samples as 16-bit little-endian PCM bytes.
///
/// This is the point where out-of-range samples are finally clamped.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| f32_to_i16(s).to_le_bytes())
        .collect()
}

/// Decodes 16-bit little-endian PCM bytes into samples.
///
/// A trailing odd byte is ignored.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16_to_f32(i16::from_le_bytes([pair[0], pair[1]])))
        .collect()
}

/// Mixes interleaved multi-channel audio down to mono by averaging each frame.
///
/// Appends to `output`. A trailing partial frame is ignored; zero channels
/// appends nothing.
pub fn downmix_to_mono(interleaved: &[f32], channels: u16, output: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => output.extend_from_slice(interleaved),
        n => {
            let n = usize::from(n);
            let scale = 1.0 / n as f32;
            output.extend(
                interleaved
                    .chunks_exact(n)
                    .map(|frame| frame.iter().sum::<f32>() * scale),
            );
        }
    }
}

/// Writes mono samples into an interleaved buffer, duplicating each sample to every channel.
///
/// Writes `min(mono.len(), interleaved.len() / channels)` frames and returns
/// the number of frames written.
pub fn upmix_mono(mono: &[f32], channels: u16, interleaved: &mut [f32]) -> usize {
    if channels == 0 {
        return 0;
    }
    let n = usize::from(channels);
    let mut written = 0;
    for (frame, &sample) in interleaved.chunks_exact_mut(n).zip(mono) {
        frame.fill(sample);
        written += 1;
    }
    written
}
