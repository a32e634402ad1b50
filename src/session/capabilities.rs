//! Capability traits the recording controller is built from.
//!
//! The controller never talks to a device, codec or network directly. It is
//! handed one implementation of each trait at construction; the terminal
//! application wires in the cpal/ffmpeg/reqwest implementations, tests wire
//! in scripted fakes.

use std::fmt;
use std::path::PathBuf;

use super::state::ToggleLabel;
use super::status::StatusMessage;

/// Finalized recording handed from the encoder to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    /// Encoded MP3 bytes
    pub data: Vec<u8>,
    /// Location of the encoded file on disk, if one was kept
    pub path: Option<PathBuf>,
}

impl fmt::Display for EncodedAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} bytes at {}", self.data.len(), path.display()),
            None => write!(f, "{} bytes", self.data.len()),
        }
    }
}

/// Parsed server answer for a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Where the uploaded recording can be listened to
    pub url: String,
}

/// Live waveform display fed from its own microphone stream.
///
/// Start and stop are fire-and-forget. Failures are reported asynchronously
/// on the visualizer's device error channel, never returned.
pub trait Visualizer {
    fn start(&mut self);
    fn stop(&mut self);
}

/// Microphone capture plus compression.
#[allow(async_fn_in_trait)]
pub trait Encoder {
    /// Opens the microphone and begins capturing.
    ///
    /// # Errors
    /// - If the microphone is unavailable or access is denied
    async fn start(&mut self) -> anyhow::Result<()>;

    /// Stops capturing and produces the encoded recording.
    ///
    /// # Errors
    /// - If nothing was captured or encoding fails
    async fn stop(&mut self) -> anyhow::Result<EncodedAudio>;
}

/// Single-file submission to the recording endpoint.
#[allow(async_fn_in_trait)]
pub trait Uploader {
    /// Uploads `audio` under `filename`.
    ///
    /// # Errors
    /// - On transport failure or a non-success status
    /// - If the response has no usable `url`
    async fn upload(&self, audio: EncodedAudio, filename: &str) -> anyhow::Result<UploadReceipt>;
}

/// The status region and the toggle control's label.
///
/// Implementations use interior mutability; the display is shared between the
/// controller and whatever renders it.
pub trait StatusDisplay {
    /// Overwrites the status region.
    fn show_status(&self, status: StatusMessage);
    fn set_toggle_label(&self, label: ToggleLabel);
}
