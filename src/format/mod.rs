//! Audio format conversion utilities.
//!
//! This module provides utilities for converting between audio formats:
//! - Sample format conversion (f32 ↔ i16, PCM16 byte encoding)
//! - Channel conversion (interleaved ↔ mono)
//! - Sample rate conversion (nearest-neighbor resampling)

mod convert;
mod resample;

pub use convert::{
    decode_pcm16, downmix_to_mono, encode_pcm16, f32_to_i16, i16_to_f32, upmix_mono,
};
pub use resample::{resample, resample_into, resampled_len};
