//! Frame queue with a head-offset cursor.

use std::collections::VecDeque;

use super::Frame;

/// Ordered frames awaiting playout plus a cursor into the head frame.
///
/// Partially played frames are never copied or shifted: reading advances
/// `offset`, and a frame is popped once the cursor reaches its end.
///
/// Invariant: whenever the queue is non-empty, `offset < head.len()`.
/// Zero-length frames therefore never enter the queue; they contribute
/// no samples either way.
///
/// Frames leaving the queue are parked in a retired list, bounded by the
/// capacity given at construction, so the owner can free them on another
/// thread via [`take_retired`](Self::take_retired). Past that bound they
/// are dropped in place.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: VecDeque<Frame>,
    retired: VecDeque<Frame>,
    offset: usize,
    available: usize,
}

impl FrameQueue {
    /// Creates an empty queue that retires nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue with room for `frames` queued and `frames` retired frames.
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(frames),
            retired: VecDeque::with_capacity(frames),
            offset: 0,
            available: 0,
        }
    }

    /// Appends a frame to the tail.
    pub fn push(&mut self, frame: Frame) {
        if frame.is_empty() {
            return;
        }
        self.available += frame.len();
        self.frames.push_back(frame);
    }

    /// Samples not yet consumed: total queued length minus the head offset.
    pub fn available(&self) -> usize {
        self.available
    }

    /// Returns `true` when no samples are queued.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames queued, including a partially consumed head.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Samples of the head frame already consumed.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Retires every queued frame.
    pub fn clear(&mut self) {
        while let Some(frame) = self.frames.pop_front() {
            self.retire(frame);
        }
        self.offset = 0;
        self.available = 0;
    }

    /// Hands out the oldest retired frame.
    pub fn take_retired(&mut self) -> Option<Frame> {
        self.retired.pop_front()
    }

    /// Retired frames waiting to be taken.
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    fn retire(&mut self, frame: Frame) {
        if self.retired.len() < self.retired.capacity() {
            self.retired.push_back(frame);
        }
    }

    fn pop_head(&mut self) {
        if let Some(frame) = self.frames.pop_front() {
            self.retire(frame);
        }
        self.offset = 0;
    }

    /// Discards up to `count` of the oldest samples, returning how many were discarded.
    pub fn discard_front(&mut self, count: usize) -> usize {
        let mut remaining = count;
        while remaining > 0 {
            let Some(head) = self.frames.front() else {
                break;
            };
            let left_in_head = head.len() - self.offset;
            if remaining < left_in_head {
                self.offset += remaining;
                remaining = 0;
            } else {
                remaining -= left_in_head;
                self.pop_head();
            }
        }
        let discarded = count - remaining;
        self.available -= discarded;
        discarded
    }

    /// Copies the oldest samples into `out`, crossing frame boundaries as needed.
    ///
    /// Returns the number of samples copied: `out.len()` unless the queue ran out.
    pub fn read_into(&mut self, out: &mut [f32]) -> usize {
        let mut copied = 0;
        while copied < out.len() {
            let Some(head) = self.frames.front() else {
                break;
            };
            let source = &head[self.offset..];
            let take = source.len().min(out.len() - copied);
            out[copied..copied + take].copy_from_slice(&source[..take]);
            copied += take;

            if take == source.len() {
                self.pop_head();
            } else {
                self.offset += take;
            }
        }
        self.available -= copied;
        copied
    }
}
