//! Notifications about adaptation and faults in a running session.
//!
//! Nothing here stops the session. Events describe what the pipeline
//! already did about a problem (dropped audio, waited longer, retried a sink).

use std::sync::Arc;

/// Runtime events emitted by a running [`Session`](crate::Session).
///
/// The playout events mirror the adaptive steps of the
/// [`PlayoutBuffer`](crate::PlayoutBuffer): they are reported after the
/// fact from outside the audio callback.
///
/// # Example
///
/// ```
/// use voice_link::StreamEvent;
///
/// fn handle_event(event: StreamEvent) {
///     match event {
///         StreamEvent::BufferOverflow { dropped_samples, max_buffer_samples } => {
///             eprintln!("dropped {dropped_samples} samples, headroom now {max_buffer_samples}");
///         }
///         StreamEvent::Underrun { partial_buffer_samples } => {
///             eprintln!("underrun, restart delay now {partial_buffer_samples} samples");
///         }
///         StreamEvent::PlaybackStarted => eprintln!("playback started"),
///         StreamEvent::PlayoutReset => eprintln!("playout reset"),
///         StreamEvent::ChunkOverflow { dropped_chunks } => {
///             eprintln!("capture dropped {dropped_chunks} chunks");
///         }
///         StreamEvent::SinkError { sink_name, error } => {
///             eprintln!("{sink_name} rejected a chunk: {error}");
///         }
///         StreamEvent::StreamInterrupted { reason } => eprintln!("device error: {reason}"),
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The playout buffer discarded its oldest audio to get back under its limit.
    BufferOverflow {
        /// Samples discarded since the previous report.
        dropped_samples: u64,
        /// The grown overflow threshold, in output samples.
        max_buffer_samples: usize,
    },

    /// The playout buffer ran dry mid-block and faded out.
    ///
    /// Playback waits for the start threshold again, plus the grown
    /// partial buffer.
    Underrun {
        /// The grown post-underrun delay, in output samples.
        partial_buffer_samples: usize,
    },

    /// The playout buffer accumulated its start threshold and started.
    PlaybackStarted,

    /// A reset message was applied to the playout buffer.
    PlayoutReset,

    /// The capture callback produced chunks faster than the bridge drained them.
    ChunkOverflow {
        /// Chunks dropped since the previous report.
        dropped_chunks: u64,
    },

    /// One write attempt (or a shutdown hook) failed on a sink.
    ///
    /// Emitted per attempt, so a chunk that is retried twice produces two events.
    SinkError {
        /// [`Sink::name`](crate::Sink::name) of the failing sink.
        sink_name: String,
        /// The sink's error, rendered.
        error: String,
    },

    /// The input or output device reported an error from its callback thread.
    StreamInterrupted {
        /// The backend's error, rendered.
        reason: String,
    },
}

/// Shared event handler, invoked from the monitor, bridge and router tasks
/// and from device error callbacks.
///
/// Usually installed with [`VoiceLinkBuilder::on_event`](crate::VoiceLinkBuilder::on_event).
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Wraps a closure as an [`EventCallback`].
///
/// ```
/// use voice_link::{event_callback, StreamEvent};
///
/// let log = event_callback(|event| tracing::info!(?event, "voice event"));
/// log(StreamEvent::PlaybackStarted);
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(StreamEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_events_compare_by_value() {
        let overflow = StreamEvent::BufferOverflow {
            dropped_samples: 480,
            max_buffer_samples: 12_000,
        };
        assert_eq!(overflow.clone(), overflow);
        assert_ne!(
            overflow,
            StreamEvent::BufferOverflow {
                dropped_samples: 480,
                max_buffer_samples: 24_000,
            }
        );
    }

    #[test]
    fn test_callback_shared_across_clones() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback = event_callback(move |event| sink.lock().push(event));

        let for_monitor = Arc::clone(&callback);
        callback(StreamEvent::PlaybackStarted);
        for_monitor(StreamEvent::Underrun {
            partial_buffer_samples: 12_240,
        });

        assert_eq!(
            *seen.lock(),
            vec![
                StreamEvent::PlaybackStarted,
                StreamEvent::Underrun {
                    partial_buffer_samples: 12_240
                },
            ]
        );
    }
}
