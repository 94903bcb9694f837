//! Error types for voice-link.
//!
//! [`VoiceLinkError`] covers what a caller must handle: a session that
//! cannot start, or a playout message that did not fit. Trouble while
//! running is reported through [`EventCallback`](crate::EventCallback) instead.
//!
//! The capture chunker and playout buffer themselves never fail. Jitter,
//! underruns and overruns are absorbed by their adaptive policies.

/// Fatal errors from session setup and the playout channel.
#[derive(Debug, thiserror::Error)]
pub enum VoiceLinkError {
    /// No device in the requested direction has this name.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// The name that was looked up.
        name: String,
    },

    /// The host has no default microphone.
    #[error("no default input device configured")]
    NoDefaultInputDevice,

    /// The host has no default speaker.
    #[error("no default output device configured")]
    NoDefaultOutputDevice,

    /// The device only offers a sample format other than `f32` or `i16`.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The device's format, as cpal names it.
        format: String,
    },

    /// cpal failed to enumerate, configure or start a device.
    #[error("audio backend error: {0}")]
    BackendError(String),

    /// Capture was enabled with nowhere to send chunks.
    #[error("no sinks configured - add at least one sink")]
    NoSinksConfigured,

    /// A sink's `on_start` hook returned an error.
    #[error("sink '{sink_name}' failed to start: {reason}")]
    SinkStartFailed {
        /// The sink's name.
        sink_name: String,
        /// The hook's error, rendered.
        reason: String,
    },

    /// A configuration value the pipeline cannot run with.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The playout channel is full; the message was not enqueued.
    #[error("playout channel full ({capacity} messages)")]
    PlayoutChannelFull {
        /// Capacity of the channel.
        capacity: usize,
    },

    /// The session's playout sender was already taken.
    #[error("playout sender already taken from this session")]
    PlayoutSenderTaken,
}

impl VoiceLinkError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Wraps any displayable backend error.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::BackendError(err.to_string())
    }
}

/// Failure returned by a [`Sink`](crate::Sink).
///
/// The router turns each one into a
/// [`StreamEvent::SinkError`](crate::StreamEvent::SinkError) and retries
/// the write.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The destination refused or lost the chunk.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// What the destination reported.
        reason: String,
    },

    /// The receiving half of a channel sink was dropped.
    #[error("channel closed")]
    ChannelClosed,

    /// Free-form error for sinks outside this crate.
    #[error("{0}")]
    Custom(String),
}

impl SinkError {
    /// Shorthand for [`SinkError::Custom`].
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Shorthand for [`SinkError::WriteFailed`].
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }
}
