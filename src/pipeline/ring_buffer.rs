//! Ring buffer carrying finished chunks out of the capture callback.
//!
//! A second ring runs the other way, carrying empty sample buffers
//! allocated by the bridge so the callback can fill them in place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;

use crate::AudioChunk;

/// Callback-side end of the chunk ring.
///
/// Pushing never blocks: when the ring is full the chunk is dropped and
/// counted, so a stalled bridge costs audio rather than a missed deadline.
pub struct ChunkProducer {
    producer: ringbuf::HeapProd<AudioChunk>,
    dropped: Arc<AtomicU64>,
}

impl ChunkProducer {
    /// Pushes a chunk, returning `false` if it was dropped.
    pub fn push(&mut self, chunk: AudioChunk) -> bool {
        if self.producer.try_push(chunk).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }
}

/// Callback-side end of the spare ring: empty sample buffers allocated by the bridge.
pub struct SpareBuffers {
    consumer: ringbuf::HeapCons<Arc<Vec<f32>>>,
}

impl SpareBuffers {
    /// Takes an empty, pre-allocated sample buffer, if the bridge left one.
    pub fn take(&mut self) -> Option<Arc<Vec<f32>>> {
        self.consumer.try_pop()
    }
}

/// Consumer end of the chunk ring with chunk-at-a-time reads.
pub struct ChunkBuffer {
    consumer: ringbuf::HeapCons<AudioChunk>,
    spares: ringbuf::HeapProd<Arc<Vec<f32>>>,
    spare_len: usize,
    dropped: Arc<AtomicU64>,
    chunks_read: u64,
}

impl ChunkBuffer {
    /// Tops the spare ring up with empty buffers of the pool's chunk length.
    ///
    /// Does nothing for a ring created without a pool.
    pub fn refill_spares(&mut self) {
        if self.spare_len == 0 {
            return;
        }
        while self.spares.vacant_len() > 0 {
            let _ = self
                .spares
                .try_push(Arc::new(Vec::with_capacity(self.spare_len)));
        }
    }

    /// Empty buffers waiting for the producer.
    pub fn spares_available(&self) -> usize {
        self.spares.occupied_len()
    }

    /// Takes the oldest chunk, if any.
    pub fn try_read_chunk(&mut self) -> Option<AudioChunk> {
        let chunk = self.consumer.try_pop()?;
        self.chunks_read += 1;
        Some(chunk)
    }

    /// Returns the number of chunks currently in the buffer.
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Chunks read since creation.
    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    /// Chunks the producer dropped because the ring was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drains all remaining chunks in order.
    pub fn drain(&mut self) -> Vec<AudioChunk> {
        let mut chunks = Vec::with_capacity(self.available());
        while let Some(chunk) = self.try_read_chunk() {
            chunks.push(chunk);
        }
        chunks
    }
}

/// Creates a chunk ring holding up to `capacity` chunks.
///
/// Returns a producer (for the capture callback) and a `ChunkBuffer` (for the bridge).
pub fn chunk_buffer(capacity: usize) -> (ChunkProducer, ChunkBuffer) {
    let (producer, _spares, buffer) = pooled_chunk_buffer(capacity, 0);
    (producer, buffer)
}

/// Creates a chunk ring plus a pool of `capacity` spare buffers sized for
/// `chunk_len` samples, filled before returning.
///
/// The bridge keeps the pool topped up with
/// [`ChunkBuffer::refill_spares`].
pub fn pooled_chunk_buffer(
    capacity: usize,
    chunk_len: usize,
) -> (ChunkProducer, SpareBuffers, ChunkBuffer) {
    let capacity = capacity.max(1);
    let (producer, consumer) = HeapRb::<AudioChunk>::new(capacity).split();
    let (spare_tx, spare_rx) = HeapRb::<Arc<Vec<f32>>>::new(capacity).split();
    let dropped = Arc::new(AtomicU64::new(0));

    let mut buffer = ChunkBuffer {
        consumer,
        spares: spare_tx,
        spare_len: chunk_len,
        dropped: Arc::clone(&dropped),
        chunks_read: 0,
    };
    buffer.refill_spares();

    (
        ChunkProducer { producer, dropped },
        SpareBuffers { consumer: spare_rx },
        buffer,
    )
}
