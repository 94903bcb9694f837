//! Mock audio source for testing without hardware.

use std::time::Duration;

use crate::playout::Frame;

/// A mock audio source that generates synthetic `f32` audio for testing.
///
/// Stands in for a device callback (feed [`blocks`](Self::blocks) to a
/// chunker or capture processor) or for a transport delivering decoded
/// replies (feed [`into_frames`](Self::into_frames) to a playout sender).
///
/// # Example
///
/// ```
/// use voice_link::source::MockSource;
///
/// let mut mock = MockSource::new(24000, 1);
///
/// // 100ms of silence, then 100ms of a 440Hz sine wave
/// mock.generate_silence(100);
/// mock.generate_sine(440.0, 100);
///
/// assert_eq!(mock.samples().len(), 4800);
/// let samples = mock.take_samples();
/// assert!(samples[..2400].iter().all(|&s| s == 0.0));
/// ```
pub struct MockSource {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl MockSource {
    /// Creates a new mock source with the given format.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            samples: Vec::new(),
        }
    }

    /// Creates a mock source at the assistant rate (24kHz mono).
    pub fn assistant() -> Self {
        Self::new(24000, 1)
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Generates silence for the given duration in milliseconds.
    pub fn generate_silence(&mut self, duration_ms: u64) {
        let num_samples = self.samples_for_duration(duration_ms);
        self.samples.resize(self.samples.len() + num_samples, 0.0);
    }

    /// Generates a full-scale sine wave at the given frequency.
    pub fn generate_sine(&mut self, frequency: f64, duration_ms: u64) {
        self.generate_tone(frequency, 1.0, duration_ms);
    }

    /// Generates a sine wave with the given peak amplitude.
    pub fn generate_tone(&mut self, frequency: f64, amplitude: f32, duration_ms: u64) {
        let num_frames = self.samples_for_duration(duration_ms) / usize::from(self.channels);
        let sample_rate = f64::from(self.sample_rate);

        for i in 0..num_frames {
            let t = i as f64 / sample_rate;
            let value = (2.0 * std::f64::consts::PI * frequency * t).sin() as f32 * amplitude;
            for _ in 0..self.channels {
                self.samples.push(value);
            }
        }
    }

    /// Generates deterministic white noise with the given peak amplitude.
    pub fn generate_noise(&mut self, duration_ms: u64, amplitude: f32) {
        let num_samples = self.samples_for_duration(duration_ms);

        // Simple LCG for deterministic "random" noise
        let mut seed: u32 = 12345;
        for _ in 0..num_samples {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let unit = f32::from((seed >> 16) as u16) / f32::from(u16::MAX) * 2.0 - 1.0;
            self.samples.push(unit * amplitude);
        }
    }

    /// Adds raw samples directly.
    pub fn add_samples(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Takes all accumulated samples, clearing the internal buffer.
    pub fn take_samples(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }

    /// Returns a reference to the accumulated samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Returns the duration of accumulated samples.
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / usize::from(self.channels);
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }

    /// Splits the accumulated interleaved samples into callback-sized blocks.
    ///
    /// `frames_per_block` counts frames, so each block holds
    /// `frames_per_block * channels` samples; the last block may be shorter.
    pub fn blocks(&self, frames_per_block: usize) -> impl Iterator<Item = &[f32]> {
        let block = frames_per_block.max(1) * usize::from(self.channels);
        self.samples.chunks(block)
    }

    /// Consumes the source, splitting it into frames of the given lengths in turn.
    ///
    /// Lengths cycle until the samples run out, which models a transport
    /// delivering irregularly sized replies. A zero length yields an empty
    /// frame; all-zero lengths yield nothing.
    pub fn into_frames(self, lengths: &[usize]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if lengths.iter().all(|&len| len == 0) {
            return frames;
        }

        let mut rest = self.samples.as_slice();
        for &len in lengths.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (head, tail) = rest.split_at(len.min(rest.len()));
            frames.push(Frame::from(head));
            rest = tail;
        }
        frames
    }

    fn samples_for_duration(&self, duration_ms: u64) -> usize {
        let frames = (u64::from(self.sample_rate) * duration_ms / 1000) as usize;
        frames * usize::from(self.channels)
    }
}
