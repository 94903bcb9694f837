//! The adaptive playout buffer state machine.

use crate::config::{PlayoutConfig, SampleLimit};
use crate::message::{PlayoutMessage, Telemetry};

use super::fade::{fade_in, fade_out};
use super::{Frame, FrameQueue};

/// Reported `min_delay` before any audio has played.
pub const MIN_DELAY_SENTINEL: f64 = 9999.0;

/// Monotonic counters for one buffer instance.
///
/// Unlike the [`Telemetry`] metrics these survive [`PlayoutBuffer::reset`],
/// so an observer can diff two snapshots to see what happened in between.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayoutStats {
    /// Frames pushed, including empty ones.
    pub frames_received: u64,
    /// Buffering → started transitions.
    pub starts: u64,
    /// Underruns that faded out and grew the partial buffer.
    pub underruns: u64,
    /// Overflow trims that grew the max buffer.
    pub overflows: u64,
    /// Samples discarded by overflow trims.
    pub dropped_samples: u64,
    /// Explicit resets applied.
    pub resets: u64,
}

/// Jitter buffer that turns irregular frame arrivals into one steady block per render tick.
///
/// Owns its queue and every adaptive parameter; producers only ever
/// [`push`](Self::push). All thresholds are counted in samples at the
/// output rate.
///
/// # Example
///
/// ```
/// use voice_link::{PlayoutBuffer, PlayoutConfig};
///
/// let mut buffer = PlayoutBuffer::new(&PlayoutConfig::default());
/// let mut block = [0.0f32; 128];
///
/// // Nothing queued yet: silence
/// buffer.render_tick(&mut block);
/// assert!(block.iter().all(|&s| s == 0.0));
///
/// // 80ms at 24kHz reaches the start threshold
/// buffer.push(vec![0.5; 1920].into());
/// assert!(buffer.is_started());
/// ```
#[derive(Debug)]
pub struct PlayoutBuffer {
    sample_rate: u32,
    silence_threshold: f32,

    initial_buffer_samples: usize,
    partial_limit: SampleLimit,
    max_limit: SampleLimit,
    partial_buffer_samples: usize,
    max_buffer_samples: usize,
    remaining_partial_buffer_samples: usize,

    queue: FrameQueue,
    started: bool,
    first_out: bool,

    total_audio_played: f64,
    actual_audio_played: f64,
    delay: f64,
    min_delay: f64,
    max_delay: f64,

    stats: PlayoutStats,
}

impl PlayoutBuffer {
    /// Creates an empty buffer in the buffering state.
    pub fn new(config: &PlayoutConfig) -> Self {
        Self::with_frame_capacity(config, 0)
    }

    /// Creates a buffer whose queue holds `frames` frames before reallocating.
    ///
    /// Played and discarded frames are then kept (up to the same bound) for
    /// [`take_retired`](Self::take_retired) instead of being freed on the
    /// rendering thread.
    pub fn with_frame_capacity(config: &PlayoutConfig, frames: usize) -> Self {
        let partial_limit = config.partial_buffer.in_samples(config.output_sample_rate);
        let max_limit = config.max_buffer.in_samples(config.output_sample_rate);

        Self {
            sample_rate: config.output_sample_rate,
            silence_threshold: config.silence_threshold,
            initial_buffer_samples: config.initial_buffer_samples(),
            partial_limit,
            max_limit,
            partial_buffer_samples: partial_limit.default,
            max_buffer_samples: max_limit.default,
            remaining_partial_buffer_samples: 0,
            queue: FrameQueue::with_capacity(frames),
            started: false,
            first_out: false,
            total_audio_played: 0.0,
            actual_audio_played: 0.0,
            delay: 0.0,
            min_delay: MIN_DELAY_SENTINEL,
            max_delay: 0.0,
            stats: PlayoutStats::default(),
        }
    }

    /// Appends a newly arrived frame, then applies the overflow and start checks.
    pub fn push(&mut self, frame: Frame) {
        self.stats.frames_received += 1;
        self.queue.push(frame);
        self.enforce_max_buffer();
        self.check_start();
    }

    /// Drops all queued audio and returns every parameter and metric to its initial value.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.partial_buffer_samples = self.partial_limit.default;
        self.max_buffer_samples = self.max_limit.default;
        self.remaining_partial_buffer_samples = 0;
        self.started = false;
        self.first_out = false;
        self.total_audio_played = 0.0;
        self.actual_audio_played = 0.0;
        self.delay = 0.0;
        self.min_delay = MIN_DELAY_SENTINEL;
        self.max_delay = 0.0;
        self.stats.resets += 1;
    }

    /// Applies one message from the playout channel.
    pub fn handle(&mut self, message: PlayoutMessage) {
        match message {
            PlayoutMessage::Reset => self.reset(),
            PlayoutMessage::Audio { frame } => self.push(frame),
        }
    }

    /// Fills `out` with exactly one block of output and returns this tick's telemetry.
    ///
    /// Every sample of `out` is written: queued audio where it can play,
    /// silence everywhere else. Never blocks and never allocates.
    pub fn render_tick(&mut self, out: &mut [f32]) -> Telemetry {
        self.enforce_max_buffer();
        self.check_start();

        let block_len = out.len();
        let can_play =
            self.started && !self.queue.is_empty() && self.remaining_partial_buffer_samples == 0;

        if !can_play {
            out.fill(0.0);
            if self.actual_audio_played > 0.0 {
                self.total_audio_played += self.samples_to_seconds(block_len);
            }
            self.remaining_partial_buffer_samples = self
                .remaining_partial_buffer_samples
                .saturating_sub(block_len);
            return self.telemetry();
        }

        // Delay metrics only move while audio is actually playing
        self.delay = self.samples_to_seconds(self.queue.available());
        self.min_delay = self.min_delay.min(self.delay);
        self.max_delay = self.max_delay.max(self.delay);

        let copied = self.queue.read_into(out);
        out[copied..].fill(0.0);
        let played = &mut out[..copied];
        let silent = self.is_silent(played);

        if self.first_out {
            fade_in(played);
            self.first_out = false;
        }

        if copied < block_len && !silent {
            fade_out(played);
            self.started = false;
            self.partial_buffer_samples = self.partial_limit.grow(self.partial_buffer_samples);
            self.stats.underruns += 1;
        }

        self.total_audio_played += self.samples_to_seconds(block_len);
        self.actual_audio_played += self.samples_to_seconds(copied);
        self.telemetry()
    }

    /// Telemetry as of the last tick.
    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            total_audio_played: self.total_audio_played,
            actual_audio_played: self.actual_audio_played,
            delay: self.delay,
            min_delay: self.min_delay,
            max_delay: self.max_delay,
        }
    }

    /// Hands out a frame that has left the queue, oldest first.
    pub fn take_retired(&mut self) -> Option<Frame> {
        self.queue.take_retired()
    }

    /// Counters since construction.
    pub fn stats(&self) -> PlayoutStats {
        self.stats
    }

    /// Samples queued and not yet played.
    pub fn available_samples(&self) -> usize {
        self.queue.available()
    }

    /// Whether the start threshold has been reached since the last (re)start.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Samples required before playback may start.
    pub fn initial_buffer_samples(&self) -> usize {
        self.initial_buffer_samples
    }

    /// Current post-underrun delay in samples.
    pub fn partial_buffer_samples(&self) -> usize {
        self.partial_buffer_samples
    }

    /// Current overflow headroom in samples.
    pub fn max_buffer_samples(&self) -> usize {
        self.max_buffer_samples
    }

    /// Samples of the partial-buffer countdown still to elapse.
    pub fn remaining_partial_buffer_samples(&self) -> usize {
        self.remaining_partial_buffer_samples
    }

    /// Output rate all thresholds are counted at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Trims the oldest audio back to `initial + partial` once `initial + partial + max` is reached.
    fn enforce_max_buffer(&mut self) {
        let keep = self
            .initial_buffer_samples
            .saturating_add(self.partial_buffer_samples);
        let limit = keep.saturating_add(self.max_buffer_samples);
        let available = self.queue.available();
        if available < limit {
            return;
        }

        let dropped = self.queue.discard_front(available - keep);
        self.max_buffer_samples = self.max_limit.grow(self.max_buffer_samples);
        self.stats.overflows += 1;
        self.stats.dropped_samples += dropped as u64;
    }

    fn check_start(&mut self) {
        if self.started || self.queue.available() < self.initial_buffer_samples {
            return;
        }
        self.started = true;
        self.first_out = true;
        self.remaining_partial_buffer_samples = self.partial_buffer_samples;
        self.stats.starts += 1;
    }

    fn is_silent(&self, samples: &[f32]) -> bool {
        samples.iter().all(|s| s.abs() < self.silence_threshold)
    }

    fn samples_to_seconds(&self, samples: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        samples as f64 / f64::from(self.sample_rate)
    }
}
