//! Sink emitting [`ChunkMessage`] payloads for a message transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::message::ChunkMessage;
use crate::sink::Sink;
use crate::{AudioChunk, SinkError};

/// A sink that converts each chunk to a [`ChunkMessage`] and forwards it.
///
/// The receiver owns framing: serialize the message with `serde_json` (or
/// anything else) and put it on the wire.
///
/// # Example
///
/// ```
/// use voice_link::{ChunkMessage, MessageSink};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel::<ChunkMessage>(32);
/// let sink = MessageSink::new(tx);
/// ```
pub struct MessageSink {
    name: String,
    sender: mpsc::Sender<ChunkMessage>,
}

impl MessageSink {
    /// Creates a message sink named `"message"`.
    pub fn new(sender: mpsc::Sender<ChunkMessage>) -> Self {
        Self::with_name("message", sender)
    }

    /// Creates a message sink with a custom name.
    pub fn with_name(name: impl Into<String>, sender: mpsc::Sender<ChunkMessage>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }
}

#[async_trait]
impl Sink for MessageSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, chunk: &AudioChunk) -> Result<(), SinkError> {
        self.sender
            .send(chunk.to_message())
            .await
            .map_err(|_| SinkError::ChannelClosed)
    }
}
