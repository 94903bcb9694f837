//! Configuration types for capture and playout.
//!
//! All sample-count thresholds are configured in milliseconds and converted
//! to samples against the rate of the component that owns them, using
//! [`ms_to_samples`].

use std::time::Duration;

use crate::VoiceLinkError;

/// Converts a millisecond duration to a sample count at `sample_rate`.
///
/// Rounds to the nearest sample: `round(ms * rate / 1000)`.
#[must_use]
pub fn ms_to_samples(ms: u64, sample_rate: u32) -> usize {
    ((ms as f64 * f64::from(sample_rate)) / 1000.0).round() as usize
}

/// Preset capture formats for common assistant backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatPreset {
    /// 24kHz mono, the rate realtime voice assistants stream PCM16 at.
    #[default]
    Assistant,

    /// 16kHz mono for speech-to-text services.
    Transcription,
}

impl FormatPreset {
    /// Returns the target capture sample rate for this preset.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Assistant => 24_000,
            Self::Transcription => 16_000,
        }
    }
}

/// Settings for the [`CaptureChunker`](crate::CaptureChunker).
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Rate every emitted chunk is resampled to.
    ///
    /// Default: 24000 Hz
    pub target_sample_rate: u32,

    /// Duration of each emitted chunk.
    ///
    /// Default: 80ms (1920 samples at 24kHz)
    pub chunk_duration: Duration,
}

impl CaptureConfig {
    /// Creates a capture configuration from a preset with the default chunk duration.
    #[must_use]
    pub fn from_preset(preset: FormatPreset) -> Self {
        Self {
            target_sample_rate: preset.sample_rate(),
            ..Default::default()
        }
    }

    /// Number of samples in every emitted chunk.
    #[must_use]
    pub fn samples_per_chunk(&self) -> usize {
        ms_to_samples(
            self.chunk_duration.as_millis() as u64,
            self.target_sample_rate,
        )
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: FormatPreset::Assistant.sample_rate(),
            chunk_duration: Duration::from_millis(80),
        }
    }
}

/// An adaptively growing threshold: a starting value, a growth step and a cap.
///
/// Growth is `min(current + increment, cap)`. Note that when `default_ms`
/// is already above `cap_ms`, the first growth step clamps the value *down*
/// to the cap; [`PlayoutConfig::validate`] warns about that shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveLimit {
    /// Value used at construction and after every reset.
    pub default_ms: u64,
    /// Amount added on each adaptation step.
    pub increment_ms: u64,
    /// Upper bound for adaptation.
    pub cap_ms: u64,
}

impl AdaptiveLimit {
    /// Creates a new limit.
    #[must_use]
    pub const fn new(default_ms: u64, increment_ms: u64, cap_ms: u64) -> Self {
        Self {
            default_ms,
            increment_ms,
            cap_ms,
        }
    }

    pub(crate) fn in_samples(&self, sample_rate: u32) -> SampleLimit {
        SampleLimit {
            default: ms_to_samples(self.default_ms, sample_rate),
            increment: ms_to_samples(self.increment_ms, sample_rate),
            cap: ms_to_samples(self.cap_ms, sample_rate),
        }
    }
}

/// An [`AdaptiveLimit`] resolved against an output rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SampleLimit {
    pub default: usize,
    pub increment: usize,
    pub cap: usize,
}

impl SampleLimit {
    /// One growth step from `current`.
    pub fn grow(&self, current: usize) -> usize {
        current.saturating_add(self.increment).min(self.cap)
    }
}

/// Settings for the [`PlayoutBuffer`](crate::PlayoutBuffer).
///
/// # Example
///
/// ```
/// use voice_link::{AdaptiveLimit, PlayoutConfig};
///
/// let config = PlayoutConfig {
///     output_sample_rate: 48_000,
///     max_buffer: AdaptiveLimit::new(2_000, 500, 10_000),
///     ..Default::default()
/// };
/// assert_eq!(config.initial_buffer_samples(), 3840);
/// ```
#[derive(Debug, Clone)]
pub struct PlayoutConfig {
    /// Native rate of the output device; every threshold is counted at this rate.
    ///
    /// Default: 24000 Hz
    pub output_sample_rate: u32,

    /// Size of one render callback block in samples.
    ///
    /// Default: 128
    pub render_quantum: usize,

    /// Audio that must be queued before playback may start.
    ///
    /// Default: 80ms, one capture chunk
    pub initial_buffer: Duration,

    /// Extra delay inserted after an underrun, grown on every underrun.
    ///
    /// Default: 10ms, +500ms, capped at 6000ms
    pub partial_buffer: AdaptiveLimit,

    /// Queued audio allowed before the oldest data is dropped, grown on every overflow.
    ///
    /// Default: 5 minutes, +500ms, capped at 6000ms
    pub max_buffer: AdaptiveLimit,

    /// Absolute amplitude below which a sample counts as silence.
    ///
    /// Default: one 16-bit LSB (1/32768)
    pub silence_threshold: f32,
}

impl PlayoutConfig {
    /// `initial_buffer` in output samples.
    #[must_use]
    pub fn initial_buffer_samples(&self) -> usize {
        ms_to_samples(
            self.initial_buffer.as_millis() as u64,
            self.output_sample_rate,
        )
    }

    /// Checks the configuration for values the buffer cannot run with.
    ///
    /// A limit whose default exceeds its cap is accepted but logged, since
    /// the first adaptation step will shrink it to the cap.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceLinkError::InvalidConfig`] for a zero output rate or
    /// a zero render quantum.
    pub fn validate(&self) -> Result<(), VoiceLinkError> {
        if self.output_sample_rate == 0 {
            return Err(VoiceLinkError::invalid_config(
                "output_sample_rate must be non-zero",
            ));
        }
        if self.render_quantum == 0 {
            return Err(VoiceLinkError::invalid_config(
                "render_quantum must be non-zero",
            ));
        }
        for (name, limit) in [
            ("partial_buffer", &self.partial_buffer),
            ("max_buffer", &self.max_buffer),
        ] {
            if limit.default_ms > limit.cap_ms {
                tracing::warn!(
                    limit = name,
                    default_ms = limit.default_ms,
                    cap_ms = limit.cap_ms,
                    "adaptive limit starts above its cap; first growth step will shrink it"
                );
            }
        }
        Ok(())
    }
}

impl Default for PlayoutConfig {
    fn default() -> Self {
        Self {
            output_sample_rate: 24_000,
            render_quantum: 128,
            initial_buffer: Duration::from_millis(80),
            partial_buffer: AdaptiveLimit::new(10, 500, 6_000),
            max_buffer: AdaptiveLimit::new(5 * 60 * 1000, 500, 6_000),
            silence_threshold: 1.0 / 32768.0,
        }
    }
}

/// Configuration for a full [`Session`](crate::Session).
///
/// Use [`StreamConfig::default()`] for sensible defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use voice_link::StreamConfig;
/// use std::time::Duration;
///
/// let mut config = StreamConfig::default();
/// config.capture.chunk_duration = Duration::from_millis(40);
/// assert_eq!(config.capture.samples_per_chunk(), 960);
/// ```
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Capture chunker settings.
    pub capture: CaptureConfig,

    /// Playout buffer settings.
    ///
    /// `output_sample_rate` is overwritten with the output device's native
    /// rate when a session opens a real device.
    pub playout: PlayoutConfig,

    /// Chunks the capture callback may hold before the bridge drains them.
    ///
    /// Default: 64 (about 5 seconds at 80ms chunks)
    pub chunk_buffer_capacity: usize,

    /// Messages the playout channel may hold before `send` reports it full.
    ///
    /// Default: 1024
    pub playout_channel_capacity: usize,

    /// Telemetry reports kept between drains; older reports are dropped.
    ///
    /// Default: 512
    pub telemetry_capacity: usize,

    /// Number of attempts for failed sink writes.
    ///
    /// Default: 3
    pub sink_retry_attempts: u32,

    /// Initial delay between sink retry attempts, doubled each attempt.
    ///
    /// Default: 20ms
    pub sink_retry_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            playout: PlayoutConfig::default(),
            chunk_buffer_capacity: 64,
            playout_channel_capacity: 1024,
            telemetry_capacity: 512,
            sink_retry_attempts: 3,
            sink_retry_delay: Duration::from_millis(20),
        }
    }
}
