//! Capture side of the pipeline: the callback-side processor and the bridge task.
//!
//! ```text
//! input callback: downmix → commands → CaptureChunker → ChunkProducer
//!                                                            │ (SPSC ring)
//! bridge task:                 router ← CaptureBridge ← ChunkBuffer
//! ```

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use tokio::sync::mpsc;

use crate::chunker::CaptureChunker;
use crate::config::CaptureConfig;
use crate::event::EventCallback;
use crate::format::{downmix_to_mono, i16_to_f32};
use crate::message::CaptureCommand;
use crate::pipeline::{pooled_chunk_buffer, ChunkBuffer, ChunkProducer, SpareBuffers};
use crate::session::SessionState;
use crate::{AudioChunk, StreamEvent};

/// Pending start/stop commands the callback can hold before dropping new ones.
const COMMAND_CAPACITY: usize = 16;

/// Log progress every this many forwarded chunks.
const PROGRESS_LOG_INTERVAL: u64 = 50;

/// Runs inside the input callback: turns interleaved device blocks into chunks.
///
/// Never blocks. Commands sent through the paired [`CaptureControl`] are
/// applied at the start of the next callback, before its samples are
/// chunked.
pub struct CaptureProcessor {
    chunker: CaptureChunker,
    commands: ringbuf::HeapCons<CaptureCommand>,
    chunks: ChunkProducer,
    spares: SpareBuffers,
    native_rate: u32,
    channels: u16,
    mono: Vec<f32>,
    converted: Vec<f32>,
}

impl CaptureProcessor {
    /// Device rate the callback delivers.
    pub fn native_rate(&self) -> u32 {
        self.native_rate
    }

    /// Interleaved channels the callback delivers.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// The chunker fed by this processor.
    pub fn chunker(&self) -> &CaptureChunker {
        &self.chunker
    }

    /// Processes one block of interleaved `f32` samples.
    pub fn process(&mut self, interleaved: &[f32]) {
        while let Some(command) = self.commands.try_pop() {
            self.chunker.handle(command);
        }

        self.mono.clear();
        downmix_to_mono(interleaved, self.channels, &mut self.mono);

        let chunks = &mut self.chunks;
        let spares = &mut self.spares;
        self.chunker.on_samples_pooled(
            &self.mono,
            self.native_rate,
            || spares.take(),
            |chunk| {
                chunks.push(chunk);
            },
        );
    }

    /// Processes one block of interleaved 16-bit samples.
    pub fn process_i16(&mut self, interleaved: &[i16]) {
        let mut converted = std::mem::take(&mut self.converted);
        converted.clear();
        converted.extend(interleaved.iter().copied().map(i16_to_f32));
        self.process(&converted);
        self.converted = converted;
    }
}

/// Sends start/stop commands to a [`CaptureProcessor`] from any thread.
pub struct CaptureControl {
    producer: ringbuf::HeapProd<CaptureCommand>,
}

impl CaptureControl {
    /// Queues a command, returning `false` if the command ring is full.
    pub fn send(&mut self, command: CaptureCommand) -> bool {
        let queued = self.producer.try_push(command).is_ok();
        if queued {
            tracing::debug!(?command, "capture command queued");
        } else {
            tracing::warn!(?command, "capture command ring full - command dropped");
        }
        queued
    }
}

/// Creates the callback-side processor, its control handle and the chunk ring it fills.
pub fn capture_pipeline(
    config: &CaptureConfig,
    native_rate: u32,
    channels: u16,
    chunk_capacity: usize,
) -> (CaptureProcessor, CaptureControl, ChunkBuffer) {
    let (command_tx, command_rx) = HeapRb::<CaptureCommand>::new(COMMAND_CAPACITY).split();
    let chunker = CaptureChunker::new(config);
    let (producer, spares, buffer) =
        pooled_chunk_buffer(chunk_capacity, chunker.samples_per_chunk());

    // One second of native audio, so a typical callback never reallocates
    let scratch = native_rate as usize * usize::from(channels.max(1));

    let processor = CaptureProcessor {
        chunker,
        commands: command_rx,
        chunks: producer,
        spares,
        native_rate,
        channels,
        mono: Vec::with_capacity(scratch),
        converted: Vec::with_capacity(scratch),
    };

    (
        processor,
        CaptureControl {
            producer: command_tx,
        },
        buffer,
    )
}

/// Drains the chunk ring on an interval and forwards chunks to the router.
pub(crate) struct CaptureBridge {
    chunks: ChunkBuffer,
    chunk_tx: mpsc::Sender<AudioChunk>,
    state: Arc<SessionState>,
    poll_interval: Duration,
    event_callback: Option<EventCallback>,
    reported_overflows: u64,
}

impl CaptureBridge {
    /// Creates a bridge polling at half the chunk duration.
    pub fn new(
        chunks: ChunkBuffer,
        chunk_duration: Duration,
        chunk_tx: mpsc::Sender<AudioChunk>,
        state: Arc<SessionState>,
        event_callback: Option<EventCallback>,
    ) -> Self {
        let poll_interval = (chunk_duration / 2).max(Duration::from_millis(1));
        tracing::info!(?chunk_duration, ?poll_interval, "capture bridge created");

        Self {
            chunks,
            chunk_tx,
            state,
            poll_interval,
            event_callback,
            reported_overflows: 0,
        }
    }

    /// Runs until the session stops, then forwards whatever is left in the ring.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.poll_interval);

        while self.state.is_running() {
            interval.tick().await;

            while let Some(chunk) = self.chunks.try_read_chunk() {
                self.record(&chunk);
                if self.chunk_tx.send(chunk).await.is_err() {
                    // Router gone, nothing left to forward to
                    return;
                }
            }
            self.chunks.refill_spares();
            self.check_overflow();
        }

        for chunk in self.chunks.drain() {
            self.record(&chunk);
            let _ = self.chunk_tx.send(chunk).await;
        }
        self.check_overflow();
    }

    fn record(&self, chunk: &AudioChunk) {
        self.state
            .samples_captured
            .fetch_add(chunk.sample_count() as u64, Ordering::SeqCst);
        let chunks = self.state.chunks_processed.fetch_add(1, Ordering::SeqCst);

        if chunks % PROGRESS_LOG_INTERVAL == 0 {
            tracing::debug!(
                chunk = chunks,
                samples = chunk.sample_count(),
                timestamp = ?chunk.timestamp,
                "capture bridge forwarded chunk"
            );
        }
    }

    /// Reports chunks the callback dropped since the last check.
    fn check_overflow(&mut self) {
        let dropped = self.chunks.dropped();
        if dropped == self.reported_overflows {
            return;
        }

        let dropped_chunks = dropped - self.reported_overflows;
        self.reported_overflows = dropped;
        self.state.chunk_overflows.store(dropped, Ordering::SeqCst);
        tracing::warn!(dropped_chunks, "capture ring full - chunks dropped");

        if let Some(ref callback) = self.event_callback {
            callback(StreamEvent::ChunkOverflow { dropped_chunks });
        }
    }
}

/// Spawns the capture bridge as a background task.
pub(crate) fn spawn_capture_bridge(
    chunks: ChunkBuffer,
    chunk_duration: Duration,
    chunk_tx: mpsc::Sender<AudioChunk>,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
) -> tokio::task::JoinHandle<()> {
    let bridge = CaptureBridge::new(chunks, chunk_duration, chunk_tx, state, event_callback);
    tokio::spawn(bridge.run())
}
