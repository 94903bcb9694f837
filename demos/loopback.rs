//! Loopback example.
//!
//! Captures the default microphone in 80ms chunks, encodes each one as
//! 16-bit PCM the way an assistant transport would, and plays it straight
//! back through the default output via the playout buffer.
//!
//! Run with: cargo run --example loopback

use std::time::Duration;

use tokio::sync::mpsc;
use voice_link::format::encode_pcm16;
use voice_link::{AudioChunk, ChannelSink, FormatPreset, StreamEvent, VoiceLink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_link=info".into()),
        )
        .init();

    let (tx, mut rx) = mpsc::channel::<AudioChunk>(32);

    let mut session = VoiceLink::builder()
        .format(FormatPreset::Assistant)
        .add_sink(ChannelSink::new(tx))
        .on_event(|event| match event {
            StreamEvent::Underrun { .. } | StreamEvent::BufferOverflow { .. } => {
                tracing::warn!(?event, "playout adapted");
            }
            other => tracing::info!(event = ?other, "stream event"),
        })
        .start()
        .await?;

    let mut playout = session.take_playout_sender()?;
    session.start_recording();

    println!("Speak into the microphone; you should hear yourself for 10 seconds.");

    let echo = async {
        while let Some(chunk) = rx.recv().await {
            let bytes = encode_pcm16(&chunk.samples);
            if let Err(e) = playout.send_pcm16(&bytes, chunk.sample_rate) {
                tracing::warn!(error = %e, "dropping echoed chunk");
            }
        }
    };
    let _ = tokio::time::timeout(Duration::from_secs(10), echo).await;

    let stats = session.stats();
    session.stop().await?;

    println!("Stats: {stats:?}");
    Ok(())
}
