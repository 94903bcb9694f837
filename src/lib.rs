//! # voice-link
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Real-time voice plumbing for streaming assistants.
//!
//! `voice-link` moves live audio between the local audio devices and a
//! remote assistant reached over a message transport with variable latency:
//!
//! - **Capture**: the microphone's native-rate stream is downmixed,
//!   resampled and cut into fixed-size chunks ([`CaptureChunker`]), then
//!   fanned out to [`Sink`]s
//! - **Playout**: decoded reply frames arrive whenever the network delivers
//!   them and leave as exactly one block per render callback
//!   ([`PlayoutBuffer`]), with drop-oldest overflow handling, adaptive
//!   underrun recovery and click-free fades
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use voice_link::{ChannelSink, VoiceLink};
//! use tokio::sync::mpsc;
//!
//! let (tx, mut rx) = mpsc::channel(32);
//!
//! let mut session = VoiceLink::builder()
//!     .add_sink(ChannelSink::new(tx))
//!     .on_event(|e| tracing::warn!(?e, "stream event"))
//!     .start()
//!     .await?;
//!
//! let mut playout = session.take_playout_sender()?;
//! session.start_recording();
//!
//! // Upstream: 80ms chunks at 24kHz
//! while let Some(chunk) = rx.recv().await {
//!     let bytes = voice_link::format::encode_pcm16(&chunk.samples);
//!     // send `bytes` to the assistant...
//! }
//!
//! // Downstream: decoded replies, any frame size
//! playout.send_pcm16(&reply_bytes, 24_000)?;
//!
//! session.stop().await?;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **CPAL threads**: input and output callbacks that never block
//! - **Ring buffers**: lock-free SPSC queues carry chunks out of the input
//!   callback, frames into the output callback, and telemetry back out
//! - **Tokio runtime**: a bridge and router fan chunks out to sinks; a
//!   monitor turns playout telemetry into [`StreamEvent`]s
//!
//! The two core components ([`CaptureChunker`], [`PlayoutBuffer`]) are plain
//! synchronous state machines and can be driven directly, without devices.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod chunk;
mod chunker;
mod config;
mod error;
mod event;
pub mod format;
mod message;
mod pipeline;
pub mod playout;
mod session;
mod sink;
pub mod source;

pub use builder::{VoiceLink, VoiceLinkBuilder};
pub use chunk::AudioChunk;
pub use chunker::CaptureChunker;
pub use config::{
    ms_to_samples, AdaptiveLimit, CaptureConfig, FormatPreset, PlayoutConfig, StreamConfig,
};
pub use error::{SinkError, VoiceLinkError};
pub use event::{event_callback, EventCallback, StreamEvent};
pub use message::{CaptureCommand, ChunkMessage, PlayoutMessage, Telemetry};
pub use pipeline::{
    capture_pipeline, chunk_buffer, playout_channel, pooled_chunk_buffer, telemetry_channel,
    CaptureControl,
    CaptureProcessor, ChunkBuffer, ChunkProducer, PlayoutMonitor, PlayoutReport,
    PlayoutRenderer, PlayoutSender, RenderQuantizer, Router, RouterCommand, SpareBuffers,
    TelemetryReceiver,
};
pub use playout::{Frame, PlayoutBuffer, PlayoutStats, MIN_DELAY_SENTINEL};
pub use session::{Session, SessionStats};
pub use sink::{ChannelSink, MessageSink, Sink};
pub use source::{
    default_input_device_name, default_output_device_name, list_devices, list_input_devices,
    list_output_devices, AudioDevice, Direction, MockSource,
};
