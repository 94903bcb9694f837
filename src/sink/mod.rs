//! Destinations for captured chunks.
//!
//! A [`Sink`] is anything that accepts [`AudioChunk`]s from the router. The
//! crate provides two built-in sinks:
//!
//! - [`ChannelSink`]: forwards chunks to a tokio mpsc channel
//! - [`MessageSink`]: forwards [`ChunkMessage`](crate::ChunkMessage) payloads,
//!   ready for the transport to serialize
//!
//! Implement [`Sink`] directly for anything else, such as a transport
//! connection that encodes PCM16 itself.

mod channel;
mod message;

pub use channel::ChannelSink;
pub use message::MessageSink;

use crate::{AudioChunk, SinkError};
use async_trait::async_trait;

/// Receives captured chunks on their way to the remote assistant.
///
/// The router hands every sink each chunk in capture order and awaits the
/// call before moving to the next chunk, so a slow sink delays its peers;
/// buffer inside the sink if the transport can stall.
///
/// Sinks are shared behind `Arc` and only ever see `&self`. Keep any
/// connection or encoder state behind a lock such as `parking_lot::Mutex`.
/// A failed [`write`](Self::write) may be retried with the same chunk.
///
/// # Example
///
/// ```
/// use voice_link::{format::encode_pcm16, AudioChunk, Sink, SinkError};
/// use async_trait::async_trait;
///
/// struct Pcm16Sink;
///
/// #[async_trait]
/// impl Sink for Pcm16Sink {
///     fn name(&self) -> &str {
///         "pcm16"
///     }
///
///     async fn write(&self, chunk: &AudioChunk) -> Result<(), SinkError> {
///         let bytes = encode_pcm16(&chunk.samples);
///         println!("{} bytes at {}Hz", bytes.len(), chunk.sample_rate);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Sink: Send + Sync {
    /// Identifies the sink in logs and [`StreamEvent::SinkError`](crate::StreamEvent::SinkError).
    fn name(&self) -> &str;

    /// Runs before the input stream opens; an error aborts session start.
    async fn on_start(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Delivers one chunk.
    ///
    /// An error is reported as an event and retried according to
    /// [`StreamConfig::sink_retry_attempts`](crate::StreamConfig::sink_retry_attempts);
    /// the chunk is skipped for this sink once retries run out.
    async fn write(&self, chunk: &AudioChunk) -> Result<(), SinkError>;

    /// Runs once the router has drained, even after failed writes.
    async fn on_stop(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
