//! Router task that fans captured chunks out to sinks.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::session::SessionState;
use crate::sink::Sink;
use crate::{AudioChunk, EventCallback, StreamConfig, StreamEvent, VoiceLinkError};

/// Command sent to the router task.
pub enum RouterCommand {
    /// Forward what is already queued, stop the sinks and exit.
    Stop,
}

/// How often a failing write is retried, with doubling delays in between.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    attempts: u32,
    initial_delay: Duration,
}

impl RetryPolicy {
    fn from_config(config: &StreamConfig) -> Self {
        Self {
            attempts: config.sink_retry_attempts.max(1),
            initial_delay: config.sink_retry_delay,
        }
    }
}

/// The router receives chunks from the capture bridge and forwards them to every sink.
pub struct Router {
    sinks: Vec<Arc<dyn Sink>>,
    retry: RetryPolicy,
    event_callback: Option<EventCallback>,
    state: Option<Arc<SessionState>>,
}

impl Router {
    /// Creates a router over `sinks` using the retry settings in `config`.
    pub fn new(sinks: Vec<Arc<dyn Sink>>, config: &StreamConfig) -> Self {
        Self {
            sinks,
            retry: RetryPolicy::from_config(config),
            event_callback: None,
            state: None,
        }
    }

    /// Sets the event callback.
    pub fn with_event_callback(mut self, callback: Option<EventCallback>) -> Self {
        self.event_callback = callback;
        self
    }

    pub(crate) fn with_state(mut self, state: Arc<SessionState>) -> Self {
        self.state = Some(state);
        self
    }

    fn emit_event(&self, event: StreamEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }

    /// Writes a chunk to one sink, retrying with exponential backoff.
    ///
    /// Returns `false` if every attempt failed and the chunk was given up on.
    async fn write_to_sink(&self, sink: &Arc<dyn Sink>, chunk: &AudioChunk) -> bool {
        let mut delay = self.retry.initial_delay;

        for attempt in 1..=self.retry.attempts {
            match sink.write(chunk).await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::debug!(sink = sink.name(), attempt, error = %e, "sink write failed");
                    self.emit_event(StreamEvent::SinkError {
                        sink_name: sink.name().to_string(),
                        error: e.to_string(),
                    });

                    if attempt < self.retry.attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        tracing::warn!(
            sink = sink.name(),
            attempts = self.retry.attempts,
            timestamp = ?chunk.timestamp,
            "giving up on chunk"
        );
        if let Some(ref state) = self.state {
            state.sink_failures.fetch_add(1, Ordering::SeqCst);
        }
        false
    }

    /// Writes a chunk to all sinks concurrently, returning how many accepted it.
    pub async fn write_chunk(&self, chunk: &AudioChunk) -> usize {
        let writes: Vec<_> = self
            .sinks
            .iter()
            .map(|sink| self.write_to_sink(sink, chunk))
            .collect();

        futures::future::join_all(writes)
            .await
            .into_iter()
            .filter(|&delivered| delivered)
            .count()
    }

    /// Starts all sinks, in registration order.
    ///
    /// Returns an error if any sink fails to start.
    pub async fn start_sinks(&self) -> Result<(), VoiceLinkError> {
        for sink in &self.sinks {
            sink.on_start()
                .await
                .map_err(|e| VoiceLinkError::SinkStartFailed {
                    sink_name: sink.name().to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Stops all sinks, reporting failures as events.
    pub async fn stop_sinks(&self) {
        for sink in &self.sinks {
            if let Err(e) = sink.on_stop().await {
                self.emit_event(StreamEvent::SinkError {
                    sink_name: sink.name().to_string(),
                    error: format!("Error during shutdown: {e}"),
                });
            }
        }
    }

    /// Runs the router until a [`RouterCommand::Stop`] arrives or both channels close.
    pub async fn run(
        self,
        mut chunk_rx: mpsc::Receiver<AudioChunk>,
        mut cmd_rx: mpsc::Receiver<RouterCommand>,
    ) {
        loop {
            tokio::select! {
                Some(chunk) = chunk_rx.recv() => {
                    self.write_chunk(&chunk).await;
                }
                Some(RouterCommand::Stop) = cmd_rx.recv() => {
                    while let Ok(chunk) = chunk_rx.try_recv() {
                        self.write_chunk(&chunk).await;
                    }
                    break;
                }
                else => break,
            }
        }

        self.stop_sinks().await;
    }
}
