//! List available audio input devices.

use crate::audio::capture::suppress_alsa_warnings;
use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait};

/// Lists all available audio input devices on the system.
///
/// # Errors
/// - If the audio host cannot be initialized
pub fn handle_list_devices() -> Result<(), anyhow::Error> {
    // Enumerate devices while suppressing ALSA library warnings
    let (host, devices) = suppress_alsa_warnings(|| {
        let host = cpal::default_host();
        let device_iter = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate audio devices: {e}"))?;

        // Collect devices, skipping any that fail to query
        let devices: Vec<cpal::Device> = device_iter
            .filter_map(|d| d.name().ok().map(|_| d))
            .collect();

        Ok((host, devices))
    })?;

    if devices.is_empty() {
        println!("No audio input devices found on this system.");
        return Ok(());
    }

    println!();
    println!("Available audio input devices:");
    println!();

    // Find the default device
    let default_device = host.default_input_device().and_then(|d| d.name().ok());

    for (index, device) in devices.iter().enumerate() {
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let is_default = default_device.as_ref() == Some(&device_name);
        let default_indicator = if is_default { " [DEFAULT]" } else { "" };

        match device.default_input_config() {
            Ok(config) => {
                println!(
                    "  [{index}] {device_name}{default_indicator} ({} Hz, {} channel{})",
                    config.sample_rate().0,
                    config.channels(),
                    if config.channels() == 1 { "" } else { "s" }
                );
            }
            Err(_) => {
                println!("  [{index}] {device_name}{default_indicator} (configuration unavailable)");
            }
        }
    }

    println!();
    println!("Set the device in ~/.config/cascade/cascade.toml using its index or name,");
    println!("or override it for one session with 'cascade run --device <N>'.");

    Ok(())
}
