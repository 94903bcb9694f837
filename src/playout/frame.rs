//! Immutable decoded audio frame.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// An immutable run of mono samples at the playout buffer's output rate.
///
/// Frames are created when pushed and dropped once fully played or
/// discarded by the overflow policy. Zero-length frames are valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frame(Box<[f32]>);

impl Frame {
    /// Creates a frame from samples.
    pub fn new(samples: impl Into<Box<[f32]>>) -> Self {
        Self(samples.into())
    }

    /// The frame's samples.
    pub fn samples(&self) -> &[f32] {
        &self.0
    }
}

impl Deref for Frame {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for Frame {
    fn from(samples: Vec<f32>) -> Self {
        Self(samples.into_boxed_slice())
    }
}

impl From<&[f32]> for Frame {
    fn from(samples: &[f32]) -> Self {
        Self(samples.into())
    }
}
