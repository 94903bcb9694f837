//! Capture chunker: native-rate blocks in, fixed-size target-rate chunks out.

use std::sync::Arc;
use std::time::Duration;

use crate::config::CaptureConfig;
use crate::format::{resample_into, resampled_len};
use crate::message::CaptureCommand;
use crate::AudioChunk;

/// Converts a live native-rate mono stream into uniformly sized chunks.
///
/// The host calls [`on_samples`](Self::on_samples) once per render callback
/// whether or not recording is active. While recording, each block is
/// resampled to the target rate and appended to an accumulator; every time
/// the accumulator holds a full chunk, that chunk is split off the front and
/// emitted. The remainder stays for the next callback, so chunk boundaries
/// never lose samples.
///
/// # Example
///
/// ```
/// use voice_link::{CaptureChunker, CaptureConfig};
///
/// let mut chunker = CaptureChunker::new(&CaptureConfig::default());
/// chunker.start();
///
/// // 48kHz blocks of 128 samples become 64 samples each at 24kHz
/// let mut chunks = Vec::new();
/// for _ in 0..30 {
///     chunker.on_samples(&[0.1; 128], 48_000, |chunk| chunks.push(chunk));
/// }
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].sample_count(), 1920);
/// assert_eq!(chunker.pending_samples(), 30 * 64 - 1920);
/// ```
#[derive(Debug)]
pub struct CaptureChunker {
    target_sample_rate: u32,
    samples_per_chunk: usize,
    accumulator: Vec<f32>,
    recording: bool,
    chunks_since_start: u64,
}

impl CaptureChunker {
    /// Creates a chunker that is not yet recording.
    ///
    /// A chunk duration shorter than one target sample is treated as one sample.
    pub fn new(config: &CaptureConfig) -> Self {
        let samples_per_chunk = config.samples_per_chunk().max(1);
        Self {
            target_sample_rate: config.target_sample_rate,
            samples_per_chunk,
            accumulator: Vec::with_capacity(samples_per_chunk * 2),
            recording: false,
            chunks_since_start: 0,
        }
    }

    /// Clears the accumulator and starts recording. Idempotent.
    pub fn start(&mut self) {
        self.accumulator.clear();
        self.chunks_since_start = 0;
        self.recording = true;
    }

    /// Stops recording without flushing the partial remainder.
    pub fn stop(&mut self) {
        self.recording = false;
    }

    /// Applies a control message.
    pub fn handle(&mut self, command: CaptureCommand) {
        match command {
            CaptureCommand::Start => self.start(),
            CaptureCommand::Stop => self.stop(),
        }
    }

    /// Returns `true` while recording.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Size of every emitted chunk, in target-rate samples.
    pub fn samples_per_chunk(&self) -> usize {
        self.samples_per_chunk
    }

    /// Target rate every chunk is produced at.
    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Resampled samples waiting for the next chunk boundary.
    pub fn pending_samples(&self) -> usize {
        self.accumulator.len()
    }

    /// Feeds one render callback's worth of native-rate samples.
    ///
    /// Calls `emit` once for every complete chunk, in capture order. Does
    /// nothing when not recording; an empty block or a zero rate simply
    /// contributes no samples.
    pub fn on_samples<F>(&mut self, block: &[f32], native_rate: u32, emit: F)
    where
        F: FnMut(AudioChunk),
    {
        self.on_samples_pooled(block, native_rate, || None, emit);
    }

    /// [`on_samples`](Self::on_samples), filling buffers handed out by `spare`.
    ///
    /// A chunk only allocates when `spare` returns `None`. Spares are
    /// cleared before use and should be unshared with room for
    /// [`samples_per_chunk`](Self::samples_per_chunk) samples.
    pub fn on_samples_pooled<S, F>(
        &mut self,
        block: &[f32],
        native_rate: u32,
        mut spare: S,
        mut emit: F,
    ) where
        S: FnMut() -> Option<Arc<Vec<f32>>>,
        F: FnMut(AudioChunk),
    {
        if !self.recording {
            return;
        }

        let incoming = resampled_len(block.len(), native_rate, self.target_sample_rate);
        self.accumulator.reserve(incoming);
        resample_into(
            block,
            native_rate,
            self.target_sample_rate,
            &mut self.accumulator,
        );

        while self.accumulator.len() >= self.samples_per_chunk {
            let len = self.samples_per_chunk;
            let mut samples = spare().unwrap_or_else(|| Arc::new(Vec::with_capacity(len)));
            let buf = Arc::make_mut(&mut samples);
            buf.clear();
            buf.extend(self.accumulator.drain(..len));

            let timestamp = self.chunk_timestamp(self.chunks_since_start);
            self.chunks_since_start += 1;
            emit(AudioChunk::from_shared(samples, timestamp, self.target_sample_rate));
        }
    }

    /// Feeds a block and collects the emitted chunks.
    pub fn process(&mut self, block: &[f32], native_rate: u32) -> Vec<AudioChunk> {
        let mut chunks = Vec::new();
        self.on_samples(block, native_rate, |chunk| chunks.push(chunk));
        chunks
    }

    fn chunk_timestamp(&self, index: u64) -> Duration {
        if self.target_sample_rate == 0 {
            return Duration::ZERO;
        }
        let samples = index * self.samples_per_chunk as u64;
        Duration::from_secs_f64(samples as f64 / f64::from(self.target_sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rate: u32, chunk_ms: u64) -> CaptureConfig {
        CaptureConfig {
            target_sample_rate: rate,
            chunk_duration: Duration::from_millis(chunk_ms),
        }
    }

    #[test]
    fn test_pooled_chunks_fill_spares_in_place() {
        let mut chunker = CaptureChunker::new(&config(1000, 10));
        chunker.start();

        let spare = Arc::new(vec![9.0; 3]);
        let spare_ptr = Arc::as_ptr(&spare);
        let mut spares = vec![spare];
        let mut chunks = Vec::new();
        chunker.on_samples_pooled(&[0.5; 20], 1000, || spares.pop(), |c| chunks.push(c));

        assert_eq!(chunks.len(), 2);
        // First chunk reuses the spare with its old contents cleared
        assert_eq!(Arc::as_ptr(&chunks[0].samples), spare_ptr);
        assert_eq!(*chunks[0].samples, vec![0.5; 10]);
        // Pool exhausted: the second chunk is allocated at full size
        assert_eq!(*chunks[1].samples, vec![0.5; 10]);
        assert!(chunks[1].samples.capacity() >= 10);
    }

    #[test]
    fn test_shared_spare_is_not_written_through() {
        let mut chunker = CaptureChunker::new(&config(1000, 10));
        chunker.start();

        let held = Arc::new(vec![1.0; 10]);
        let spare = Arc::clone(&held);
        let mut spares = vec![spare];
        let mut chunks = Vec::new();
        chunker.on_samples_pooled(&[0.5; 10], 1000, || spares.pop(), |c| chunks.push(c));

        assert_eq!(*held, vec![1.0; 10]);
        assert_eq!(*chunks[0].samples, vec![0.5; 10]);
    }

    #[test]
    fn test_not_recording_is_noop() {
        let mut chunker = CaptureChunker::new(&CaptureConfig::default());
        let chunks = chunker.process(&[0.5; 4000], 24_000);
        assert!(chunks.is_empty());
        assert_eq!(chunker.pending_samples(), 0);
    }

    #[test]
    fn test_emits_exact_chunk_and_retains_remainder() {
        let mut chunker = CaptureChunker::new(&config(1000, 10)); // 10-sample chunks
        chunker.start();

        let block: Vec<f32> = (0..25).map(|i| i as f32).collect();
        let chunks = chunker.process(&block, 1000);

        assert_eq!(chunks.len(), 2);
        assert_eq!(*chunks[0].samples, (0..10).map(|i| i as f32).collect::<Vec<_>>());
        assert_eq!(*chunks[1].samples, (10..20).map(|i| i as f32).collect::<Vec<_>>());
        assert_eq!(chunker.pending_samples(), 5);

        // The remainder leads the next chunk
        let chunks = chunker.process(&[100.0; 5], 1000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].samples[..5], [20.0, 21.0, 22.0, 23.0, 24.0]);
        assert_eq!(chunks[0].samples[5..], [100.0; 5]);
    }

    #[test]
    fn test_partial_remainder_never_emitted_early() {
        let mut chunker = CaptureChunker::new(&CaptureConfig::default());
        chunker.start();
        for _ in 0..14 {
            assert!(chunker.process(&[0.1; 128], 24_000).is_empty());
        }
        assert_eq!(chunker.pending_samples(), 14 * 128);
        let chunks = chunker.process(&[0.1; 128], 24_000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].sample_count(), 1920);
        assert_eq!(chunker.pending_samples(), 0);
    }

    #[test]
    fn test_stop_discards_remainder_on_next_start() {
        let mut chunker = CaptureChunker::new(&config(1000, 10));
        chunker.start();
        chunker.process(&[1.0; 7], 1000);
        chunker.stop();
        assert!(!chunker.is_recording());
        // Blocks while stopped are ignored
        assert!(chunker.process(&[1.0; 20], 1000).is_empty());
        assert_eq!(chunker.pending_samples(), 7);

        chunker.start();
        assert_eq!(chunker.pending_samples(), 0);
        let chunks = chunker.process(&[2.0; 10], 1000);
        assert_eq!(*chunks[0].samples, vec![2.0; 10]);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut chunker = CaptureChunker::new(&config(1000, 10));
        chunker.handle(CaptureCommand::Start);
        chunker.handle(CaptureCommand::Start);
        assert!(chunker.is_recording());
        chunker.handle(CaptureCommand::Stop);
        assert!(!chunker.is_recording());
    }

    #[test]
    fn test_identity_when_rates_match() {
        let mut chunker = CaptureChunker::new(&config(24_000, 10)); // 240 samples
        chunker.start();
        let block: Vec<f32> = (0..240).map(|i| (i as f32 * 0.01).sin()).collect();
        let chunks = chunker.process(&block, 24_000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(*chunks[0].samples, block);
    }

    #[test]
    fn test_chunk_metadata_and_timestamps() {
        let mut chunker = CaptureChunker::new(&CaptureConfig::default());
        chunker.start();
        let chunks = chunker.process(&vec![0.0; 1920 * 3], 24_000);
        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.sample_rate, 24_000);
            assert_eq!(chunk.sample_count(), 1920);
            assert_eq!(chunk.timestamp, Duration::from_millis(80 * i as u64));
        }
    }

    #[test]
    fn test_degenerate_input_emits_nothing() {
        let mut chunker = CaptureChunker::new(&CaptureConfig::default());
        chunker.start();
        assert!(chunker.process(&[], 48_000).is_empty());
        assert!(chunker.process(&[0.3; 128], 0).is_empty());
        assert_eq!(chunker.pending_samples(), 0);
    }

    #[test]
    fn test_zero_duration_chunks_are_single_samples() {
        let mut chunker = CaptureChunker::new(&config(24_000, 0));
        chunker.start();
        assert_eq!(chunker.samples_per_chunk(), 1);
        assert_eq!(chunker.process(&[0.1, 0.2, 0.3], 24_000).len(), 3);
    }
}
