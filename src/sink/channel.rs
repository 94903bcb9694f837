//! Tokio mpsc channel sink.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::sink::Sink;
use crate::{AudioChunk, SinkError};

/// A sink that forwards chunks to a tokio mpsc channel.
///
/// Chunks share their sample buffer, so forwarding is a reference-count
/// bump rather than a copy.
///
/// # Example
///
/// ```
/// use voice_link::{AudioChunk, ChannelSink};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel::<AudioChunk>(32);
/// let sink = ChannelSink::new(tx);
///
/// // Register the sink with VoiceLink::builder(), then:
/// // while let Some(chunk) = rx.recv().await { ... }
/// ```
pub struct ChannelSink {
    name: String,
    sender: mpsc::Sender<AudioChunk>,
}

impl ChannelSink {
    /// Creates a channel sink named `"channel"`.
    pub fn new(sender: mpsc::Sender<AudioChunk>) -> Self {
        Self::with_name("channel", sender)
    }

    /// Creates a channel sink with a custom name.
    pub fn with_name(name: impl Into<String>, sender: mpsc::Sender<AudioChunk>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }
}

#[async_trait]
impl Sink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, chunk: &AudioChunk) -> Result<(), SinkError> {
        self.sender
            .send(chunk.clone())
            .await
            .map_err(|_| SinkError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_channel_sink_shares_samples() {
        let (tx, mut rx) = mpsc::channel::<AudioChunk>(10);
        let sink = ChannelSink::new(tx);

        let chunk = AudioChunk::new(vec![0.1, 0.2, 0.3], Duration::ZERO, 24000);
        sink.write(&chunk).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(*received.samples, vec![0.1, 0.2, 0.3]);
        assert!(Arc::ptr_eq(&received.samples, &chunk.samples));
    }

    #[tokio::test]
    async fn test_dropped_receiver_reports_closed() {
        let (tx, rx) = mpsc::channel(1);
        let sink = ChannelSink::with_name("uplink", tx);
        drop(rx);

        let chunk = AudioChunk::new(vec![0.0; 3], Duration::ZERO, 24000);
        assert!(matches!(
            sink.write(&chunk).await,
            Err(SinkError::ChannelClosed)
        ));
        assert_eq!(sink.name(), "uplink");
    }

    #[tokio::test]
    async fn test_preserves_capture_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ChannelSink::new(tx);

        for i in 0..3u64 {
            let chunk = AudioChunk::new(vec![i as f32], Duration::from_millis(80 * i), 24000);
            sink.write(&chunk).await.unwrap();
        }
        for i in 0..3u64 {
            let chunk = rx.recv().await.unwrap();
            assert_eq!(chunk.timestamp, Duration::from_millis(80 * i));
        }
    }
}
