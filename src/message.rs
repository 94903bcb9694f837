//! Message contracts at the component boundaries.
//!
//! These are payload shapes, not wire bytes: the transport collaborator
//! decides how to frame them. All of them serialize to camelCase JSON with
//! a tag field for type discrimination.

use serde::{Deserialize, Serialize};

use crate::playout::Frame;

/// Control input for the [`CaptureChunker`](crate::CaptureChunker).
///
/// Serialized as `{"command": "start"}` / `{"command": "stop"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum CaptureCommand {
    /// Clear the accumulator and begin emitting chunks.
    Start,
    /// Stop emitting chunks; the partial remainder is discarded on the next start.
    Stop,
}

/// Data output of the capture chunker, one per emitted chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChunkMessage {
    /// A fixed-size chunk of captured audio.
    #[serde(rename = "audioChunk", rename_all = "camelCase")]
    AudioChunk {
        /// Mono samples at `sample_rate`.
        samples: Vec<f32>,
        /// Target capture rate in Hz.
        sample_rate: u32,
        /// Chunk duration in seconds.
        duration_seconds: f64,
        /// Number of samples, always the configured chunk size.
        sample_count: usize,
    },
}

/// Input of the [`PlayoutBuffer`](crate::PlayoutBuffer): control and data share one ordered channel.
///
/// Serialized as `{"type": "reset"}` / `{"type": "audio", "frame": [..]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlayoutMessage {
    /// Drop all queued audio and reinitialize adaptive state.
    Reset,
    /// A decoded frame at the output rate.
    Audio {
        /// The frame's samples.
        frame: Frame,
    },
}

impl PlayoutMessage {
    /// Wraps samples as an audio message.
    pub fn audio(samples: impl Into<Frame>) -> Self {
        Self::Audio {
            frame: samples.into(),
        }
    }
}

/// Delay telemetry emitted by the playout buffer on every render tick.
///
/// All values are seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    /// Output produced, silence included, since audio was first played.
    pub total_audio_played: f64,
    /// Output actually sourced from queued frames.
    pub actual_audio_played: f64,
    /// Buffered audio at this tick, before copying.
    pub delay: f64,
    /// Smallest delay observed while playing.
    pub min_delay: f64,
    /// Largest delay observed while playing.
    pub max_delay: f64,
}
