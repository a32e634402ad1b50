//! Microphone input streams.
//!
//! Opens a cpal input stream on the configured device, converts whatever the
//! device delivers to mono `i16` PCM and hands each chunk to a caller closure.
//! Both the encoder and the visualizer open their own capture.

use anyhow::{anyhow, bail, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// A running microphone stream. Dropping it closes the stream.
pub struct InputCapture {
    /// Kept alive for as long as samples should flow
    _stream: cpal::Stream,
    sample_rate: u32,
    device_name: String,
}

impl InputCapture {
    /// Opens `device_spec` and starts streaming.
    ///
    /// # Arguments
    /// * `device_spec` - "default", a numeric index from `voxdrop list-devices`, or a device name
    /// * `on_samples` - receives mono i16 chunks on the audio thread
    /// * `on_error` - receives stream errors on the audio thread
    ///
    /// # Errors
    /// - If the device is missing or cannot be opened (including permission denial)
    /// - If the device's native sample format is not supported
    pub fn open<F, E>(device_spec: &str, on_samples: F, on_error: E) -> Result<Self>
    where
        F: FnMut(&[i16]) + Send + 'static,
        E: FnMut(cpal::StreamError) + Send + 'static,
    {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            if device_spec == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                find_device(&host, device_spec)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());

        let device_config = device
            .default_input_config()
            .map_err(|e| anyhow!("Failed to query input device '{device_name}': {e}"))?;
        let sample_rate = device_config.sample_rate().0;
        let channels = usize::from(device_config.channels()).max(1);
        let sample_format = device_config.sample_format();
        let stream_config: cpal::StreamConfig = device_config.into();

        tracing::debug!(
            "Opening input '{}': {}Hz, {} channels, {:?}",
            device_name,
            sample_rate,
            channels,
            sample_format
        );

        let mut on_samples = on_samples;
        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    on_samples(&downmix(data, channels));
                },
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                    on_samples(&downmix(&converted, channels));
                },
                on_error,
                None,
            ),
            other => bail!("Unsupported input sample format {other:?} on '{device_name}'"),
        }
        .map_err(|e| anyhow!("Failed to open input stream on '{device_name}': {e}"))?;

        stream
            .play()
            .map_err(|e| anyhow!("Failed to start input stream on '{device_name}': {e}"))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
            device_name,
        })
    }

    /// Native sample rate the device is delivering.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// Averages interleaved frames down to one channel.
pub fn downmix(data: &[i16], channels: usize) -> Vec<i16> {
    match channels {
        0 | 1 => data.to_vec(),
        _ => data
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                (sum / channels as i32) as i16
            })
            .collect(),
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Finds an audio input device by numeric index or exact name.
///
/// # Errors
/// - If devices cannot be enumerated
/// - If no device with the specified name/index exists
pub fn find_device(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            )
        });
    }

    devices
        .into_iter()
        .find(|device| device.name().is_ok_and(|name| name == device_spec))
        .ok_or_else(|| {
            anyhow!(
                "Audio input device '{device_spec}' not found. Use 'voxdrop list-devices' to see available devices."
            )
        })
}

/// Runs `f` with stderr pointed at /dev/null so ALSA's probing noise does not
/// reach the terminal.
#[cfg(target_os = "linux")]
pub fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
pub fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}
