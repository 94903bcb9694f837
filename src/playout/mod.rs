//! Adaptive playout (jitter) buffer.
//!
//! Decoded frames arrive whenever the network delivers them; the audio
//! host asks for one fixed-size block per render callback. The
//! [`PlayoutBuffer`] sits between the two:
//!
//! ```text
//! push(frame) ─→ FrameQueue ─→ render_tick(out) ─→ output device
//!                    │                 │
//!              overflow trim      fades, underrun
//!              (drop oldest)      adaptation, telemetry
//! ```
//!
//! - **Start threshold**: nothing plays until one initial buffer of audio is queued
//! - **Partial buffer**: after an underrun, playback waits an extra, growing delay
//! - **Max buffer**: queued audio beyond the limit is dropped oldest-first,
//!   and the limit grows
//! - **Fades**: linear ramps on (re)start and on underrun avoid clicks

mod buffer;
mod fade;
mod frame;
mod queue;

pub use buffer::{PlayoutBuffer, PlayoutStats, MIN_DELAY_SENTINEL};
pub use fade::{fade_in, fade_out};
pub use frame::Frame;
pub use queue::FrameQueue;
