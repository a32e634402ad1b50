//! Audio capture, encoding and live visualization.
//!
//! Provides the microphone-facing implementations of the session capabilities:
//! the MP3 [`Mp3Encoder`] and the waveform [`MicrophoneVisualizer`].

pub mod capture;
pub mod encoder;
pub mod ffmpeg;
pub mod visualizer;
pub mod waveform;

pub use encoder::Mp3Encoder;
pub use visualizer::{DeviceEvent, MicrophoneVisualizer};
pub use waveform::WaveformMeter;
