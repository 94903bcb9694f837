//! Builder pattern for `VoiceLink`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::pipeline::{
    capture_pipeline, playout_channel, spawn_capture_bridge, spawn_playout_monitor,
    telemetry_channel, CaptureControl, ChunkBuffer, RenderQuantizer, Router,
};
use crate::session::{CaptureHandles, PlayoutHandles, Session, SessionState};
use crate::sink::Sink;
use crate::source::{AudioDevice, InputStream};
use crate::{event_callback, EventCallback, FormatPreset, StreamConfig, StreamEvent, VoiceLinkError};

/// Channel capacity for chunks flowing from the bridge to the router.
/// About 8 seconds of 80ms chunks.
const CHUNK_CHANNEL_CAPACITY: usize = 100;

/// Channel capacity for router commands.
/// Only need 1 since commands are rare (just Stop).
const COMMAND_CHANNEL_CAPACITY: usize = 1;

/// How often the playout monitor drains telemetry.
const MONITOR_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Which audio device to use for one direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum DeviceSelection {
    /// Use the system's default device.
    #[default]
    SystemDefault,
    /// Use a specific device by name.
    ByName(String),
}

/// Builder for configuring and starting a voice session.
///
/// Use [`VoiceLink::builder()`] to create a new builder. Capture and playout
/// are both enabled by default on the system's default devices.
///
/// # Example
///
/// ```ignore
/// use voice_link::{ChannelSink, FormatPreset, VoiceLink};
/// use tokio::sync::mpsc;
///
/// let (tx, rx) = mpsc::channel(32);
///
/// let mut session = VoiceLink::builder()
///     .format(FormatPreset::Assistant)
///     .add_sink(ChannelSink::new(tx))
///     .on_event(|e| tracing::warn!(?e, "stream event"))
///     .start()
///     .await?;
/// ```
///
/// [`VoiceLink::builder()`]: crate::VoiceLink::builder
#[must_use]
pub struct VoiceLinkBuilder {
    config: StreamConfig,
    /// `None` when capture is disabled.
    input: Option<DeviceSelection>,
    /// `None` when playout is disabled.
    output: Option<DeviceSelection>,
    sinks: Vec<Arc<dyn Sink>>,
    event_callback: Option<EventCallback>,
}

impl Default for VoiceLinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceLinkBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: StreamConfig::default(),
            input: Some(DeviceSelection::SystemDefault),
            output: Some(DeviceSelection::SystemDefault),
            sinks: Vec::new(),
            event_callback: None,
        }
    }

    /// Set the capture format preset.
    ///
    /// Default: [`FormatPreset::Assistant`] (24kHz mono)
    pub fn format(mut self, format: FormatPreset) -> Self {
        self.config.capture.target_sample_rate = format.sample_rate();
        self
    }

    /// Set custom stream configuration.
    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Capture from the named input device instead of the default.
    pub fn input_device(mut self, name: impl Into<String>) -> Self {
        self.input = Some(DeviceSelection::ByName(name.into()));
        self
    }

    /// Play out through the named output device instead of the default.
    pub fn output_device(mut self, name: impl Into<String>) -> Self {
        self.output = Some(DeviceSelection::ByName(name.into()));
        self
    }

    /// Start without an input stream; sinks are not required.
    pub fn without_capture(mut self) -> Self {
        self.input = None;
        self
    }

    /// Start without an output stream.
    pub fn without_playout(mut self) -> Self {
        self.output = None;
        self
    }

    /// Add a sink to receive every captured chunk.
    pub fn add_sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include playout overflow/underrun adaptation, capture ring
    /// overflows, sink errors and stream interruptions.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(StreamEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Validates the builder configuration.
    fn validate(&self) -> Result<(), VoiceLinkError> {
        if self.input.is_none() && self.output.is_none() {
            return Err(VoiceLinkError::invalid_config(
                "both capture and playout are disabled",
            ));
        }
        if self.input.is_some() {
            if self.sinks.is_empty() {
                return Err(VoiceLinkError::NoSinksConfigured);
            }
            if self.config.capture.target_sample_rate == 0 {
                return Err(VoiceLinkError::invalid_config(
                    "capture target sample rate must be non-zero",
                ));
            }
        }
        if self.output.is_some() {
            self.config.playout.validate()?;
        }
        Ok(())
    }

    /// Start the session.
    ///
    /// Returns a [`Session`] handle to control capture and playout.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Capture is enabled and no sinks are configured
    /// - The configuration is invalid
    /// - An audio device cannot be opened or started
    /// - Any sink fails to start
    ///
    /// A capture side that started before the playout side failed is
    /// stopped, sinks included, before the error is returned.
    pub async fn start(self) -> Result<Session, VoiceLinkError> {
        self.validate()?;

        let state = Arc::new(SessionState::new());

        let capture = match self.input.as_ref() {
            Some(selection) => Some(self.start_capture(selection, &state).await?),
            None => None,
        };
        let playout = match self.output.as_ref() {
            Some(selection) => match self.start_playout(selection, &state) {
                Ok(handles) => Some(handles),
                Err(e) => {
                    tracing::warn!(error = %e, "playout failed to start");
                    abort_start(state, capture).await;
                    return Err(e);
                }
            },
            None => None,
        };

        tracing::info!(
            capture = capture.is_some(),
            playout = playout.is_some(),
            "voice session started"
        );
        Ok(Session::new(state, capture, playout))
    }

    async fn start_capture(
        &self,
        selection: &DeviceSelection,
        state: &Arc<SessionState>,
    ) -> Result<CaptureHandles, VoiceLinkError> {
        let device = match selection {
            DeviceSelection::SystemDefault => AudioDevice::open_default_input()?,
            DeviceSelection::ByName(name) => AudioDevice::open_input_by_name(name)?,
        };
        let (native_rate, channels) = device.native_config()?;

        let router = Router::new(self.sinks.clone(), &self.config)
            .with_event_callback(self.event_callback.clone())
            .with_state(Arc::clone(state));
        router.start_sinks().await?;

        let (processor, control, chunks) = capture_pipeline(
            &self.config.capture,
            native_rate,
            channels,
            self.config.chunk_buffer_capacity,
        );
        let stream = match device.start_capture(processor, self.event_callback.clone()) {
            Ok(stream) => stream,
            Err(e) => {
                router.stop_sinks().await;
                return Err(e);
            }
        };

        Ok(self.spawn_capture_tasks(router, chunks, control, state, Some(stream)))
    }

    /// Spawns the router and bridge around an already running capture stream.
    fn spawn_capture_tasks(
        &self,
        router: Router,
        chunks: ChunkBuffer,
        control: CaptureControl,
        state: &Arc<SessionState>,
        stream: Option<InputStream>,
    ) -> CaptureHandles {
        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        let (router_cmd_tx, router_cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let router = tokio::spawn(router.run(chunk_rx, router_cmd_rx));
        let bridge = spawn_capture_bridge(
            chunks,
            self.config.capture.chunk_duration,
            chunk_tx,
            Arc::clone(state),
            self.event_callback.clone(),
        );

        CaptureHandles {
            control,
            router_cmd_tx,
            bridge,
            router,
            stream,
        }
    }

    fn start_playout(
        &self,
        selection: &DeviceSelection,
        state: &Arc<SessionState>,
    ) -> Result<PlayoutHandles, VoiceLinkError> {
        let device = match selection {
            DeviceSelection::SystemDefault => AudioDevice::open_default_output()?,
            DeviceSelection::ByName(name) => AudioDevice::open_output_by_name(name)?,
        };
        let (native_rate, channels) = device.native_config()?;

        let mut playout_config = self.config.playout.clone();
        if playout_config.output_sample_rate != native_rate {
            tracing::info!(
                configured = playout_config.output_sample_rate,
                device = native_rate,
                "output device dictates playout rate"
            );
            playout_config.output_sample_rate = native_rate;
        }

        let (sender, renderer) =
            playout_channel(self.config.playout_channel_capacity, &playout_config);
        let (reports, receiver) = telemetry_channel(self.config.telemetry_capacity);
        let renderer = renderer.with_reports(reports);
        let quantizer = RenderQuantizer::new(playout_config.render_quantum, channels);

        let stream = device.start_playout(renderer, quantizer, self.event_callback.clone())?;
        let monitor = spawn_playout_monitor(
            receiver,
            Arc::clone(state),
            self.event_callback.clone(),
            MONITOR_POLL_INTERVAL,
        );

        Ok(PlayoutHandles {
            sender: Some(sender),
            monitor,
            stream,
        })
    }
}

/// Stops the half of a session that started before a later step failed.
async fn abort_start(state: Arc<SessionState>, capture: Option<CaptureHandles>) {
    if let Err(e) = Session::new(state, capture, None).stop().await {
        tracing::warn!(error = %e, "teardown after failed start");
    }
}

/// Main entry point for voice-link.
///
/// Use [`VoiceLink::builder()`] to start configuring a session.
pub struct VoiceLink;

impl VoiceLink {
    /// Creates a new builder for configuring a voice session.
    pub fn builder() -> VoiceLinkBuilder {
        VoiceLinkBuilder::new()
    }
}
