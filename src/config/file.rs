//! Configuration file loading and saving.

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Audio capture and encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `voxdrop list-devices`
    /// - device name from `voxdrop list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Requested sample rate in Hz; the device's native rate is used if it differs
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// MP3 bitrate in kbps
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,
    /// Reference level in dBFS for a full-height waveform (typical: -20 to -6 dBFS)
    #[serde(default = "default_reference_level_db")]
    pub reference_level_db: i8,
    /// Explicit ffmpeg binary; searched for when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_bitrate_kbps() -> u32 {
    128
}

fn default_reference_level_db() -> i8 {
    -20
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            bitrate_kbps: default_bitrate_kbps(),
            reference_level_db: default_reference_level_db(),
            ffmpeg_path: None,
        }
    }
}

/// Upload server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Base URL of the server; recordings are posted to `<server_url>/upload/record`
    #[serde(default = "default_server_url")]
    pub server_url: String,
}

fn default_server_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoxdropConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

impl VoxdropConfig {
    /// Loads the user's configuration, writing defaults if the file is missing.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the file cannot be read or written
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from `path`, writing defaults there if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: VoxdropConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Invalid configuration in {}: {e}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes this configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Checks values serde cannot express constraints for.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.audio.bitrate_kbps == 0 {
            return Err(anyhow!("audio.bitrate_kbps must be greater than zero"));
        }
        let url = self.upload.server_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(anyhow!(
                "upload.server_url must start with http:// or https:// (got '{url}')"
            ));
        }
        Ok(())
    }
}

/// Path of the config file, `~/.config/voxdrop/voxdrop.toml`.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(".config").join("voxdrop").join("voxdrop.toml"))
}
