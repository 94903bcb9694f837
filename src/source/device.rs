//! CPAL device wrapper for capture and playout.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig as CpalStreamConfig, SupportedStreamConfig};

use crate::event::EventCallback;
use crate::format::f32_to_i16;
use crate::pipeline::{CaptureProcessor, PlayoutRenderer, RenderQuantizer};
use crate::{StreamEvent, VoiceLinkError};

/// Which way audio flows through a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Microphone side.
    Input,
    /// Speaker side.
    Output,
}

/// Wrapper around a CPAL audio device opened for one direction.
#[must_use]
pub struct AudioDevice {
    device: Device,
    direction: Direction,
}

impl AudioDevice {
    /// Opens the default input device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultInputDevice` if no default input device is configured.
    pub fn open_default_input() -> Result<Self, VoiceLinkError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(VoiceLinkError::NoDefaultInputDevice)?;
        Ok(Self {
            device,
            direction: Direction::Input,
        })
    }

    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultOutputDevice` if no default output device is configured.
    pub fn open_default_output() -> Result<Self, VoiceLinkError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(VoiceLinkError::NoDefaultOutputDevice)?;
        Ok(Self {
            device,
            direction: Direction::Output,
        })
    }

    /// Opens an input device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no input device with the given name exists.
    pub fn open_input_by_name(name: &str) -> Result<Self, VoiceLinkError> {
        let devices = cpal::default_host()
            .input_devices()
            .map_err(VoiceLinkError::backend)?;
        Self::find(devices, name, Direction::Input)
    }

    /// Opens an output device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no output device with the given name exists.
    pub fn open_output_by_name(name: &str) -> Result<Self, VoiceLinkError> {
        let devices = cpal::default_host()
            .output_devices()
            .map_err(VoiceLinkError::backend)?;
        Self::find(devices, name, Direction::Output)
    }

    fn find(
        mut devices: impl Iterator<Item = Device>,
        name: &str,
        direction: Direction,
    ) -> Result<Self, VoiceLinkError> {
        devices
            .find(|device| device.name().is_ok_and(|n| n == name))
            .map(|device| Self { device, direction })
            .ok_or_else(|| VoiceLinkError::DeviceNotFound {
                name: name.to_string(),
            })
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    /// Returns the direction the device was opened for.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn default_config(&self) -> Result<SupportedStreamConfig, VoiceLinkError> {
        let config = match self.direction {
            Direction::Input => self.device.default_input_config(),
            Direction::Output => self.device.default_output_config(),
        };
        config.map_err(VoiceLinkError::backend)
    }

    /// Returns the device's native format (sample rate, channels).
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the device cannot report a default configuration.
    pub fn native_config(&self) -> Result<(u32, u16), VoiceLinkError> {
        let config = self.default_config()?;
        Ok((config.sample_rate().0, config.channels()))
    }

    /// Starts capturing, feeding every callback block to `processor`.
    ///
    /// The processor must have been built for this device's
    /// [`native_config`](Self::native_config). The returned stream must be
    /// kept alive for capture to continue.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not an input device, uses an
    /// unsupported sample format, or the stream cannot be built or started.
    pub fn start_capture(
        &self,
        mut processor: CaptureProcessor,
        events: Option<EventCallback>,
    ) -> Result<InputStream, VoiceLinkError> {
        if self.direction != Direction::Input {
            return Err(VoiceLinkError::invalid_config(
                "start_capture requires an input device",
            ));
        }

        let supported = self.default_config()?;
        let sample_format = supported.sample_format();
        let config: CpalStreamConfig = supported.into();

        tracing::info!(
            device = %self.name(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            ?sample_format,
            "starting capture stream"
        );

        let stream = match sample_format {
            SampleFormat::F32 => self.device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| processor.process(data),
                error_handler(events),
                None,
            ),
            SampleFormat::I16 => self.device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| processor.process_i16(data),
                error_handler(events),
                None,
            ),
            format => {
                return Err(VoiceLinkError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        }
        .map_err(VoiceLinkError::backend)?;

        stream.play().map_err(VoiceLinkError::backend)?;
        Ok(InputStream { _stream: stream })
    }

    /// Starts playout, rendering one quantum at a time from `renderer`.
    ///
    /// The renderer's buffer must run at this device's native rate and the
    /// quantizer must match its channel count.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is not an output device, uses an
    /// unsupported sample format, or the stream cannot be built or started.
    pub fn start_playout(
        &self,
        mut renderer: PlayoutRenderer,
        mut quantizer: RenderQuantizer,
        events: Option<EventCallback>,
    ) -> Result<OutputStream, VoiceLinkError> {
        if self.direction != Direction::Output {
            return Err(VoiceLinkError::invalid_config(
                "start_playout requires an output device",
            ));
        }

        let supported = self.default_config()?;
        let sample_format = supported.sample_format();
        let config: CpalStreamConfig = supported.into();

        tracing::info!(
            device = %self.name(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            quantum = quantizer.quantum_size(),
            ?sample_format,
            "starting playout stream"
        );

        let stream = match sample_format {
            SampleFormat::F32 => self.device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    quantizer.fill(data, |block| {
                        renderer.render(block);
                    });
                },
                error_handler(events),
                None,
            ),
            SampleFormat::I16 => {
                let mut scratch: Vec<f32> = Vec::new();
                self.device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        // Grows only when the host hands us a larger buffer than before
                        scratch.resize(data.len(), 0.0);
                        quantizer.fill(&mut scratch, |block| {
                            renderer.render(block);
                        });
                        for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                            *out = f32_to_i16(sample);
                        }
                    },
                    error_handler(events),
                    None,
                )
            }
            format => {
                return Err(VoiceLinkError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        }
        .map_err(VoiceLinkError::backend)?;

        stream.play().map_err(VoiceLinkError::backend)?;
        Ok(OutputStream { _stream: stream })
    }
}

fn error_handler(events: Option<EventCallback>) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        tracing::error!("Audio stream error: {}", err);
        if let Some(ref callback) = events {
            callback(StreamEvent::StreamInterrupted {
                reason: err.to_string(),
            });
        }
    }
}

/// A running capture stream.
///
/// Capture continues while this is held; dropping it stops the device.
pub struct InputStream {
    _stream: Stream,
}

/// A running playout stream.
///
/// Playout continues while this is held; dropping it stops the device.
pub struct OutputStream {
    _stream: Stream,
}
