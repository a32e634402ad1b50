//! Status messages shown in the status region.
//!
//! Each lifecycle step overwrites the status with one of these values. The
//! terminal renders the plain text form; `markup()` renders the same message as
//! an HTML fragment, where a completed upload becomes a link that opens in a
//! new browsing context.

use std::fmt;

/// A status line value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusMessage {
    /// Nothing has happened yet
    #[default]
    Ready,
    /// Encoder started successfully
    Recording,
    /// Recording finalized, upload in flight
    Uploading,
    /// Server accepted the upload and returned a listen URL
    UploadComplete { url: String },
    /// Transport failure, non-2xx status or a response without a URL
    UploadFailed,
    /// Encoder failed to finalize the recording
    RecordingFailed,
    /// Encoder could not open the microphone
    MicrophoneDenied,
    /// Asynchronous error reported by the visualizer's input device
    DeviceError,
}

impl StatusMessage {
    /// Plain text form used by the terminal UI.
    pub fn text(&self) -> String {
        match self {
            StatusMessage::Ready => "Press Space to record.".to_string(),
            StatusMessage::Recording => "Recording...".to_string(),
            StatusMessage::Uploading => "Uploading...".to_string(),
            StatusMessage::UploadComplete { url } => format!("Upload complete! Listen here: {url}"),
            StatusMessage::UploadFailed => "Upload failed!".to_string(),
            StatusMessage::RecordingFailed => "Recording failed!".to_string(),
            StatusMessage::MicrophoneDenied => "Microphone access denied.".to_string(),
            StatusMessage::DeviceError => "Microphone error. Please check permissions.".to_string(),
        }
    }

    /// HTML fragment form. Only a completed upload carries markup; every
    /// other message is its escaped text.
    pub fn markup(&self) -> String {
        match self {
            StatusMessage::UploadComplete { url } => format!(
                "Upload complete! <a href=\"{}\" target=\"_blank\">Listen here</a>",
                escape_html(url)
            ),
            other => escape_html(&other.text()),
        }
    }

    /// Whether this message reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StatusMessage::UploadFailed
                | StatusMessage::RecordingFailed
                | StatusMessage::MicrophoneDenied
                | StatusMessage::DeviceError
        )
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
