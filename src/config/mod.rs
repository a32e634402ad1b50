//! Configuration management for voxdrop.
//!
//! Settings live in `~/.config/voxdrop/voxdrop.toml`; a default file is
//! written the first time the recorder runs.

pub mod file;

pub use file::{config_path, AudioConfig, VoxdropConfig};
