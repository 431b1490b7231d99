//! Microphone capture.
//!
//! Opens an input device through cpal and streams mono samples into a shared
//! tail buffer sized for the FFT. The audio callback thread and the render
//! loop only ever meet at that buffer; everything else is single-threaded.

use crate::config::AudioConfig;
use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// How many FFT frames of history the tail buffer retains.
const BUFFERED_FRAMES: usize = 4;

/// Captures audio from a specified or default input device.
///
/// Features:
/// - Captures from a specified input device or system default at its native sample rate
/// - Converts multi-channel audio to mono by averaging channels
/// - Keeps only the newest samples, bounded to a few FFT frames
pub struct AudioCapture {
    /// Actual capture sample rate from device
    sample_rate: u32,
    /// Newest mono samples, oldest first
    samples: Arc<Mutex<Vec<f32>>>,
    /// Active audio input stream (kept alive while capturing)
    _stream: cpal::Stream,
}

impl AudioCapture {
    /// Opens the configured device and starts the capture stream.
    ///
    /// The actual sample rate follows the device and may differ from the
    /// configured one; call `sample_rate()` for the rate in effect.
    ///
    /// # Errors
    /// - If the specified device is not available
    /// - If device configuration fails
    /// - If audio stream creation fails or the sample format is unsupported
    pub fn start(config: &AudioConfig) -> Result<Self> {
        // Get device while suppressing ALSA library warnings
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if config.device == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device_by_name(&host, &config.device)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Capture device: {}", device_name);

        let device_config = device.default_input_config()?;
        let device_sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        if device_sample_rate != config.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Capturing at device rate.",
                config.sample_rate,
                device_sample_rate
            );
        }

        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}",
            device_sample_rate,
            num_channels,
            device_config.sample_format()
        );

        let max_buffered = config.fft_size * BUFFERED_FRAMES;
        let samples = Arc::new(Mutex::new(Vec::with_capacity(max_buffered)));

        let stream = match device_config.sample_format() {
            cpal::SampleFormat::F32 => {
                let samples_arc = Arc::clone(&samples);
                device.build_input_stream(
                    &device_config.clone().into(),
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        accumulate_mono(&samples_arc, data, num_channels, max_buffered);
                    },
                    |err| {
                        tracing::error!("Audio stream error: {}", err);
                    },
                    None,
                )?
            }
            cpal::SampleFormat::I16 => {
                let samples_arc = Arc::clone(&samples);
                device.build_input_stream(
                    &device_config.clone().into(),
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let converted: Vec<f32> =
                            data.iter().map(|&s| s as f32 / 32768.0).collect();
                        accumulate_mono(&samples_arc, &converted, num_channels, max_buffered);
                    },
                    |err| {
                        tracing::error!("Audio stream error: {}", err);
                    },
                    None,
                )?
            }
            format => {
                return Err(anyhow!("Unsupported input sample format: {format:?}"));
            }
        };

        stream.play()?;
        tracing::debug!("Audio stream started");

        Ok(Self {
            sample_rate: device_sample_rate,
            samples,
            _stream: stream,
        })
    }

    /// Returns the actual sample rate of the capture stream.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples currently buffered.
    pub fn buffered_len(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    /// Copies out the newest `count` samples (fewer if the buffer is still
    /// filling), oldest first.
    pub fn latest(&self, count: usize) -> Vec<f32> {
        let samples = self.samples.lock().unwrap();
        let start = samples.len().saturating_sub(count);
        samples[start..].to_vec()
    }
}

/// Folds an interleaved callback block into the shared mono tail buffer.
///
/// Multi-channel frames are averaged; the buffer is trimmed from the front so
/// it never grows past `max_buffered`.
fn accumulate_mono(
    samples_arc: &Arc<Mutex<Vec<f32>>>,
    data: &[f32],
    num_channels: usize,
    max_buffered: usize,
) {
    let mut samples = samples_arc.lock().unwrap();

    match num_channels {
        0 => {}
        1 => samples.extend_from_slice(data),
        n => {
            for frame in data.chunks_exact(n) {
                let sum: f32 = frame.iter().sum();
                samples.push(sum / n as f32);
            }
        }
    }

    let len = samples.len();
    if len > max_buffered {
        samples.drain(..len - max_buffered);
    }
}

/// Finds an audio input device by name or numeric index.
///
/// # Arguments
/// * `host` - The cpal audio host
/// * `device_spec` - Either "default" for system default, a device name, or a numeric index (0, 1, 2, etc.)
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    // Try to parse as a numeric index first
    if let Ok(index) = device_spec.parse::<usize>() {
        let devices: Vec<_> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
            .collect();

        if index < devices.len() {
            return Ok(devices.into_iter().nth(index).unwrap());
        } else {
            return Err(anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                devices.len().saturating_sub(1)
            ));
        }
    }

    // Try to find by name
    let devices = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?;

    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_spec {
                return Ok(device);
            }
        }
    }

    Err(anyhow!(
        "Audio input device '{device_spec}' not found. Use 'cascade list-devices' to see available devices."
    ))
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    // Open /dev/null for writing
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let dev_null_fd = dev_null.as_raw_fd();

    // Save the current stderr file descriptor
    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    // Redirect stderr to /dev/null
    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    // Execute the closure
    let result = f();

    // Restore the original stderr
    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// On non-Linux platforms, no stderr suppression is needed since ALSA doesn't exist.
#[cfg(not(target_os = "linux"))]
pub(crate) fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
