//! Microphone waveform visualizer.
//!
//! Opens its own input stream and feeds a [`SharedWaveform`] that the terminal
//! panel draws. Open failures and stream errors are never returned; they go out
//! as [`DeviceEvent`]s on the device channel.

use std::sync::PoisonError;
use tokio::sync::mpsc::UnboundedSender;

use super::capture::InputCapture;
use super::waveform::SharedWaveform;
use crate::session::Visualizer;

/// Asynchronous notification from the visualizer's input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Device could not be opened or the stream failed
    Error { code: String },
}

/// [`Visualizer`] backed by a cpal input stream.
pub struct MicrophoneVisualizer {
    device: String,
    waveform: SharedWaveform,
    events: UnboundedSender<DeviceEvent>,
    capture: Option<InputCapture>,
}

impl MicrophoneVisualizer {
    pub fn new(device: String, waveform: SharedWaveform, events: UnboundedSender<DeviceEvent>) -> Self {
        Self {
            device,
            waveform,
            events,
            capture: None,
        }
    }

    /// Whether a stream is currently open.
    pub fn is_running(&self) -> bool {
        self.capture.is_some()
    }

    fn emit(events: &UnboundedSender<DeviceEvent>, code: String) {
        if events.send(DeviceEvent::Error { code }).is_err() {
            tracing::debug!("Device event dropped: receiver closed");
        }
    }
}

impl Visualizer for MicrophoneVisualizer {
    fn start(&mut self) {
        if self.is_running() {
            tracing::debug!("Visualizer already running");
            return;
        }

        let waveform = self.waveform.clone();
        let stream_events = self.events.clone();
        let opened = InputCapture::open(
            &self.device,
            move |chunk| {
                waveform
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push_samples(chunk);
            },
            move |err| Self::emit(&stream_events, err.to_string()),
        );

        match opened {
            Ok(capture) => {
                self.waveform
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_sample_rate(capture.sample_rate());
                tracing::debug!("Visualizer started on {}", capture.device_name());
                self.capture = Some(capture);
            }
            Err(e) => {
                tracing::debug!("Visualizer failed to open microphone: {e:#}");
                Self::emit(&self.events, format!("{e:#}"));
            }
        }
    }

    fn stop(&mut self) {
        if self.capture.take().is_some() {
            tracing::debug!("Visualizer stopped");
        }
        self.waveform
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }
}
