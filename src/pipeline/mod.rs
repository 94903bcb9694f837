//! Real-time plumbing between the device callbacks and the async side.
//!
//! ```text
//! input callback  → CaptureProcessor → chunk ring → CaptureBridge → Router → Sinks
//! output callback ← RenderQuantizer ← PlayoutRenderer ← playout ring ← PlayoutSender
//!                                          └→ telemetry ring → PlayoutMonitor → events
//! ```
//!
//! Every boundary a callback touches is a lock-free SPSC ring, so neither
//! callback ever blocks on the async side.

mod capture;
mod monitor;
mod playout;
mod quantizer;
mod ring_buffer;
mod router;

pub use capture::{capture_pipeline, CaptureControl, CaptureProcessor};
pub use monitor::PlayoutMonitor;
pub use playout::{
    playout_channel, telemetry_channel, PlayoutReport, PlayoutRenderer, PlayoutSender,
    TelemetryReceiver,
};
pub use quantizer::RenderQuantizer;
pub use ring_buffer::{
    chunk_buffer, pooled_chunk_buffer, ChunkBuffer, ChunkProducer, SpareBuffers,
};
pub use router::{Router, RouterCommand};

pub(crate) use capture::spawn_capture_bridge;
pub(crate) use monitor::spawn_playout_monitor;
