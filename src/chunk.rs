//! Captured audio chunk with metadata.

use std::sync::Arc;
use std::time::Duration;

use crate::message::ChunkMessage;

/// A fixed-size slice of captured mono audio at the target rate.
///
/// `AudioChunk` is the unit the [`CaptureChunker`](crate::CaptureChunker)
/// emits and sinks receive. Samples are stored in an `Arc<Vec<f32>>` so
/// fanning a chunk out to several sinks does not copy audio.
///
/// # Example
///
/// ```
/// use voice_link::AudioChunk;
/// use std::time::Duration;
///
/// let chunk = AudioChunk::new(vec![0.0; 1920], Duration::ZERO, 24000);
/// assert_eq!(chunk.duration(), Duration::from_millis(80));
/// assert_eq!(chunk.sample_count(), 1920);
/// ```
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Mono samples, nominally in [-1.0, 1.0]; not clamped.
    pub samples: Arc<Vec<f32>>,

    /// Offset from the `start` that opened this recording.
    pub timestamp: Duration,

    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Creates a new `AudioChunk`.
    pub fn new(samples: Vec<f32>, timestamp: Duration, sample_rate: u32) -> Self {
        Self::from_shared(Arc::new(samples), timestamp, sample_rate)
    }

    /// Wraps samples that are already behind an `Arc`.
    pub fn from_shared(samples: Arc<Vec<f32>>, timestamp: Duration, sample_rate: u32) -> Self {
        Self {
            samples,
            timestamp,
            sample_rate,
        }
    }

    /// Returns the duration of this chunk.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_seconds())
    }

    /// Returns the duration of this chunk in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Returns the number of samples in this chunk.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if this chunk contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Builds the outbound `audioChunk` message for this chunk.
    pub fn to_message(&self) -> ChunkMessage {
        ChunkMessage::AudioChunk {
            samples: self.samples.as_ref().clone(),
            sample_rate: self.sample_rate,
            duration_seconds: self.duration_seconds(),
            sample_count: self.sample_count(),
        }
    }
}
