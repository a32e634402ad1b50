//! Application command handlers for voxdrop.
//!
//! # Commands
//! - `record`: interactive recorder with live waveform and automatic upload
//! - `upload`: upload an existing MP3 file
//! - `config`: open the configuration file in the user's editor
//! - `list_devices`: list available audio input devices
//! - `logs`: display recent log entries

pub mod config;
pub mod list_devices;
pub mod logs;
pub mod record;
pub mod upload;

pub use config::handle_config;
pub use list_devices::handle_list_devices;
pub use logs::handle_logs;
pub use record::handle_record;
pub use upload::handle_upload;
