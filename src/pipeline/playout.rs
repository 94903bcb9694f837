//! Lock-free delivery of frames into the render callback, and telemetry back out.
//!
//! ```text
//! network task ── PlayoutSender ──[SPSC ring]──→ PlayoutRenderer (audio callback)
//!                                                      │
//! monitor task ←── TelemetryReceiver ←──[SPSC ring]────┘
//! ```
//!
//! Both rings are `ringbuf` SPSC queues: neither end ever takes a lock, and
//! the callback side never waits on an empty or full ring. A third ring
//! carries played frames back to the sender, which frees them on its own
//! thread.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;

use crate::config::PlayoutConfig;
use crate::format::{decode_pcm16, resample};
use crate::message::{PlayoutMessage, Telemetry};
use crate::playout::{Frame, PlayoutBuffer, PlayoutStats};
use crate::VoiceLinkError;

/// One render tick's view of the playout buffer, as sent to the monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayoutReport {
    /// The tick's telemetry message.
    pub telemetry: Telemetry,
    /// Counters after the tick.
    pub stats: PlayoutStats,
    /// Overflow headroom after the tick, in output samples.
    pub max_buffer_samples: usize,
    /// Post-underrun delay after the tick, in output samples.
    pub partial_buffer_samples: usize,
}

/// Producer end of the playout channel.
///
/// Owned by whatever decodes the transport's audio. Sends never block;
/// a full channel is reported as [`VoiceLinkError::PlayoutChannelFull`].
pub struct PlayoutSender {
    producer: ringbuf::HeapProd<PlayoutMessage>,
    recycled: ringbuf::HeapCons<Frame>,
    output_sample_rate: u32,
}

impl PlayoutSender {
    /// Enqueues a message.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceLinkError::PlayoutChannelFull`] if the renderer has
    /// not drained enough of the channel.
    pub fn send(&mut self, message: PlayoutMessage) -> Result<(), VoiceLinkError> {
        self.release_played();
        let capacity = self.producer.capacity().get();
        self.producer
            .try_push(message)
            .map_err(|_| VoiceLinkError::PlayoutChannelFull { capacity })
    }

    /// Enqueues a frame already at the output rate.
    pub fn send_frame(&mut self, samples: impl Into<Frame>) -> Result<(), VoiceLinkError> {
        self.send(PlayoutMessage::audio(samples))
    }

    /// Resamples a frame from `sample_rate` to the output rate, then enqueues it.
    ///
    /// The resampling runs here, in the producer's context, not in the callback.
    pub fn send_frame_at(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), VoiceLinkError> {
        let frame = resample(samples, sample_rate, self.output_sample_rate);
        self.send_frame(frame)
    }

    /// Decodes 16-bit little-endian PCM at `sample_rate` and enqueues it.
    pub fn send_pcm16(&mut self, bytes: &[u8], sample_rate: u32) -> Result<(), VoiceLinkError> {
        self.send_frame_at(&decode_pcm16(bytes), sample_rate)
    }

    /// Enqueues a reset; frames sent afterwards are never mixed with earlier ones.
    pub fn reset(&mut self) -> Result<(), VoiceLinkError> {
        self.send(PlayoutMessage::Reset)
    }

    /// Messages waiting for the renderer.
    pub fn pending(&self) -> usize {
        self.producer.occupied_len()
    }

    /// Frees frames the renderer has finished with.
    ///
    /// Called by every send; a sender that goes quiet may call it directly.
    pub fn release_played(&mut self) -> usize {
        let mut released = 0;
        while self.recycled.try_pop().is_some() {
            released += 1;
        }
        released
    }

    /// Rate frames must be at after resampling.
    pub fn output_sample_rate(&self) -> u32 {
        self.output_sample_rate
    }
}

/// Consumer end of the playout channel, owning the [`PlayoutBuffer`].
///
/// Lives inside the output callback. Each [`render`](Self::render) applies
/// every pending message in arrival order, then renders exactly one block.
pub struct PlayoutRenderer {
    consumer: ringbuf::HeapCons<PlayoutMessage>,
    buffer: PlayoutBuffer,
    recycle: ringbuf::HeapProd<Frame>,
    reports: Option<ringbuf::HeapProd<PlayoutReport>>,
}

impl PlayoutRenderer {
    /// Sends a [`PlayoutReport`] after every tick; reports are dropped while the ring is full.
    pub fn with_reports(mut self, reports: ringbuf::HeapProd<PlayoutReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Applies pending messages and renders one block into `out`.
    pub fn render(&mut self, out: &mut [f32]) -> Telemetry {
        while let Some(message) = self.consumer.try_pop() {
            self.buffer.handle(message);
        }

        let telemetry = self.buffer.render_tick(out);

        // Anything the ring cannot take stays parked in the buffer
        while self.recycle.vacant_len() > 0 {
            let Some(frame) = self.buffer.take_retired() else {
                break;
            };
            let _ = self.recycle.try_push(frame);
        }

        if let Some(reports) = self.reports.as_mut() {
            let _ = reports.try_push(PlayoutReport {
                telemetry,
                stats: self.buffer.stats(),
                max_buffer_samples: self.buffer.max_buffer_samples(),
                partial_buffer_samples: self.buffer.partial_buffer_samples(),
            });
        }

        telemetry
    }

    /// The buffer being rendered from.
    pub fn buffer(&self) -> &PlayoutBuffer {
        &self.buffer
    }
}

/// Creates a playout channel and the buffer behind it.
///
/// `capacity` bounds the number of undelivered messages. It also sizes the
/// buffer's frame queue and the ring returning played frames, so the
/// callback neither grows nor frees storage while the sender keeps up.
pub fn playout_channel(capacity: usize, config: &PlayoutConfig) -> (PlayoutSender, PlayoutRenderer) {
    let capacity = capacity.max(1);
    let (producer, consumer) = HeapRb::<PlayoutMessage>::new(capacity).split();
    let (recycle, recycled) = HeapRb::<Frame>::new(capacity).split();

    (
        PlayoutSender {
            producer,
            recycled,
            output_sample_rate: config.output_sample_rate,
        },
        PlayoutRenderer {
            consumer,
            buffer: PlayoutBuffer::with_frame_capacity(config, capacity),
            recycle,
            reports: None,
        },
    )
}

/// Receiving end of the telemetry ring.
pub struct TelemetryReceiver {
    consumer: ringbuf::HeapCons<PlayoutReport>,
}

impl TelemetryReceiver {
    /// Takes the oldest report, if any.
    pub fn try_recv(&mut self) -> Option<PlayoutReport> {
        self.consumer.try_pop()
    }

    /// Discards everything but the newest report.
    pub fn latest(&mut self) -> Option<PlayoutReport> {
        let mut latest = None;
        while let Some(report) = self.consumer.try_pop() {
            latest = Some(report);
        }
        latest
    }
}

/// Creates a telemetry ring holding up to `capacity` reports.
pub fn telemetry_channel(capacity: usize) -> (ringbuf::HeapProd<PlayoutReport>, TelemetryReceiver) {
    let ring = HeapRb::<PlayoutReport>::new(capacity.max(1));
    let (producer, consumer) = ring.split();
    (producer, TelemetryReceiver { consumer })
}
