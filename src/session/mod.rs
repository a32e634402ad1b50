//! Recording session control.
//!
//! The session is a two-state toggle (`Idle`/`Recording`) that sequences the
//! microphone visualizer, the audio encoder and the upload client, and mirrors
//! every step onto a status display.
//!
//! # Modules
//! - `state`: session state and toggle label
//! - `status`: status messages shown to the user
//! - `capabilities`: traits implemented by the visualizer, encoder, uploader and display
//! - `filename`: upload filename synthesis from an injectable random source
//! - `controller`: the recording controller itself

pub mod capabilities;
pub mod controller;
pub mod filename;
pub mod state;
pub mod status;

pub use capabilities::{EncodedAudio, Encoder, StatusDisplay, UploadReceipt, Uploader, Visualizer};
pub use controller::{report_device_error, RecordingController};
pub use filename::{recording_filename, UuidRandom};
pub use state::{SessionState, ToggleLabel};
pub use status::StatusMessage;
