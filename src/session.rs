//! Running voice session management.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::message::{CaptureCommand, Telemetry};
use crate::pipeline::{CaptureControl, PlayoutReport, PlayoutSender, RouterCommand};
use crate::playout::PlayoutStats;
use crate::source::{InputStream, OutputStream};
use crate::VoiceLinkError;

/// Statistics about a running session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Chunks forwarded to the sinks.
    pub chunks_processed: u64,
    /// Target-rate samples forwarded to the sinks.
    pub samples_captured: u64,
    /// Chunks dropped because the capture ring was full.
    pub chunk_overflows: u64,
    /// Sink writes that failed after every retry.
    pub sink_failures: u64,
    /// Latest playout telemetry, if the output side has rendered.
    pub telemetry: Option<Telemetry>,
    /// Latest playout counters, if the output side has rendered.
    pub playout: Option<PlayoutStats>,
}

/// Internal state shared between Session and background tasks.
pub(crate) struct SessionState {
    pub running: AtomicBool,
    pub chunks_processed: AtomicU64,
    pub samples_captured: AtomicU64,
    pub chunk_overflows: AtomicU64,
    pub sink_failures: AtomicU64,
    pub playout: Mutex<Option<PlayoutReport>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            chunks_processed: AtomicU64::new(0),
            samples_captured: AtomicU64::new(0),
            chunk_overflows: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            playout: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SessionStats {
        let playout = *self.playout.lock();
        SessionStats {
            chunks_processed: self.chunks_processed.load(Ordering::SeqCst),
            samples_captured: self.samples_captured.load(Ordering::SeqCst),
            chunk_overflows: self.chunk_overflows.load(Ordering::SeqCst),
            sink_failures: self.sink_failures.load(Ordering::SeqCst),
            telemetry: playout.map(|report| report.telemetry),
            playout: playout.map(|report| report.stats),
        }
    }
}

/// The capture half of a running session.
pub(crate) struct CaptureHandles {
    pub control: CaptureControl,
    pub router_cmd_tx: mpsc::Sender<RouterCommand>,
    pub bridge: JoinHandle<()>,
    pub router: JoinHandle<()>,
    // Dropping the stream stops the device; `None` only in tests
    pub stream: Option<InputStream>,
}

/// The playout half of a running session.
pub(crate) struct PlayoutHandles {
    pub sender: Option<PlayoutSender>,
    pub monitor: JoinHandle<()>,
    pub stream: OutputStream,
}

/// Handle to a running voice session.
///
/// Returned by [`VoiceLinkBuilder::start()`]. The capture side starts idle:
/// chunks only flow to the sinks between
/// [`start_recording`](Session::start_recording) and
/// [`stop_recording`](Session::stop_recording). The playout side renders
/// silence until frames arrive through the [`PlayoutSender`] taken with
/// [`take_playout_sender`](Session::take_playout_sender).
///
/// # Lifecycle
///
/// 1. Created by [`VoiceLinkBuilder::start()`]
/// 2. Device streams and background tasks run until stopped
/// 3. Call [`stop()`](Session::stop) for graceful shutdown
/// 4. Dropping the `Session` also stops everything (but prefer explicit `stop()`)
///
/// # Example
///
/// ```ignore
/// let mut session = VoiceLink::builder()
///     .add_sink(ChannelSink::new(tx))
///     .start()
///     .await?;
///
/// let mut playout = session.take_playout_sender()?;
/// session.start_recording();
///
/// // Forward chunks upstream, push decoded replies into `playout`...
///
/// session.stop().await?;
/// ```
///
/// [`VoiceLinkBuilder::start()`]: crate::VoiceLinkBuilder::start
pub struct Session {
    state: Arc<SessionState>,
    capture: Option<CaptureHandles>,
    playout: Option<PlayoutHandles>,
}

impl Session {
    pub(crate) fn new(
        state: Arc<SessionState>,
        capture: Option<CaptureHandles>,
        playout: Option<PlayoutHandles>,
    ) -> Self {
        Self {
            state,
            capture,
            playout,
        }
    }

    /// Returns `true` if the session is still running.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Starts emitting chunks, discarding any partial chunk from a previous recording.
    ///
    /// Returns `false` if there is no capture side or its command ring is full.
    pub fn start_recording(&mut self) -> bool {
        self.send_capture_command(CaptureCommand::Start)
    }

    /// Stops emitting chunks.
    ///
    /// Returns `false` if there is no capture side or its command ring is full.
    pub fn stop_recording(&mut self) -> bool {
        self.send_capture_command(CaptureCommand::Stop)
    }

    fn send_capture_command(&mut self, command: CaptureCommand) -> bool {
        match self.capture.as_mut() {
            Some(capture) => capture.control.send(command),
            None => false,
        }
    }

    /// Takes the producer end of the playout channel.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceLinkError::PlayoutSenderTaken`] on every call after the
    /// first, or when the session was started without playout.
    pub fn take_playout_sender(&mut self) -> Result<PlayoutSender, VoiceLinkError> {
        self.playout
            .as_mut()
            .and_then(|playout| playout.sender.take())
            .ok_or(VoiceLinkError::PlayoutSenderTaken)
    }

    /// Returns current session statistics.
    pub fn stats(&self) -> SessionStats {
        self.state.snapshot()
    }

    /// Gracefully stops the session.
    ///
    /// This will:
    /// 1. Stop both device streams
    /// 2. Forward chunks still in the capture ring to the sinks
    /// 3. Call `on_stop()` on all sinks
    /// 4. Wait for background tasks to complete
    ///
    /// # Errors
    ///
    /// Returns an error if shutdown fails.
    pub async fn stop(mut self) -> Result<(), VoiceLinkError> {
        self.stop_internal().await
    }

    async fn stop_internal(&mut self) -> Result<(), VoiceLinkError> {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(playout) = self.playout.take() {
            drop(playout.stream);
            let _ = playout.monitor.await;
        }

        if let Some(capture) = self.capture.take() {
            drop(capture.stream);
            // The bridge drains the ring before the router is told to stop
            let _ = capture.bridge.await;
            let _ = capture.router_cmd_tx.send(RouterCommand::Stop).await;
            let _ = capture.router.await;
        }

        tracing::info!(stats = ?self.state.snapshot(), "session stopped");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state.running.swap(false, Ordering::SeqCst) {
            // Dropped without explicit stop(): tasks observe `running` and wind down
            if let Some(capture) = self.capture.as_ref() {
                let _ = capture.router_cmd_tx.try_send(RouterCommand::Stop);
            }
        }
    }
}
