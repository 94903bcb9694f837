//! Audio devices and synthetic sources.
//!
//! This module is the boundary between CPAL's device callbacks and the
//! pipeline, plus a [`MockSource`] for hardware-free tests.

mod device;
mod mock;

pub use device::{AudioDevice, Direction, InputStream, OutputStream};
pub use mock::MockSource;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

use crate::VoiceLinkError;

fn names(devices: impl Iterator<Item = Device>) -> Vec<String> {
    devices.filter_map(|device| device.name().ok()).collect()
}

/// Names of every device usable in `direction`; devices without a readable name are skipped.
///
/// # Errors
///
/// Returns [`VoiceLinkError::BackendError`] if the host cannot enumerate devices.
pub fn list_devices(direction: Direction) -> Result<Vec<String>, VoiceLinkError> {
    let host = cpal::default_host();
    let names = match direction {
        Direction::Input => names(host.input_devices().map_err(VoiceLinkError::backend)?),
        Direction::Output => names(host.output_devices().map_err(VoiceLinkError::backend)?),
    };
    Ok(names)
}

/// Microphones, by name.
pub fn list_input_devices() -> Result<Vec<String>, VoiceLinkError> {
    list_devices(Direction::Input)
}

/// Speakers, by name.
pub fn list_output_devices() -> Result<Vec<String>, VoiceLinkError> {
    list_devices(Direction::Output)
}

/// The host's default microphone, if it has one.
pub fn default_input_device_name() -> Option<String> {
    AudioDevice::open_default_input().ok().map(|d| d.name())
}

/// The host's default speaker, if it has one.
pub fn default_output_device_name() -> Option<String> {
    AudioDevice::open_default_output().ok().map(|d| d.name())
}
