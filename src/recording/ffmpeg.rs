//! ffmpeg discovery and MP3 encoding.
//!
//! The encoder writes captured PCM to a WAV file and lets ffmpeg's
//! `libmp3lame` turn it into MP3. ffmpeg is located from an explicit config
//! path, then standard install locations, then PATH.

use anyhow::{anyhow, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Locates the ffmpeg binary.
///
/// An explicitly configured path wins and must exist. Otherwise standard
/// install locations for the platform are checked before searching PATH.
///
/// # Errors
/// - If the configured path does not exist
/// - If ffmpeg cannot be found anywhere
pub async fn find_ffmpeg(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!(
            "Configured ffmpeg_path does not exist: {}",
            path.display()
        ));
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/opt/homebrew/bin/ffmpeg",
            "/usr/local/bin/ffmpeg",
            "/usr/bin/ffmpeg",
        ]
    } else if cfg!(target_os = "linux") {
        &["/usr/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/snap/bin/ffmpeg"]
    } else if cfg!(target_os = "windows") {
        &[
            "C:\\ffmpeg\\bin\\ffmpeg.exe",
            "C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe",
        ]
    } else {
        &[]
    };

    if let Some(path) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
        tracing::debug!("Found ffmpeg at: {}", path.display());
        return Ok(path);
    }

    let path = find_in_path("ffmpeg").await?;
    tracing::debug!("Found ffmpeg in PATH at: {}", path.display());
    Ok(path)
}

async fn find_in_path(binary_name: &str) -> Result<PathBuf> {
    let search_cmd = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };

    let output = tokio::process::Command::new(search_cmd)
        .arg(binary_name)
        .output()
        .await
        .map_err(|e| anyhow!("Failed to search PATH for {binary_name}: {e}"))?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        // `where` may list several matches, one per line
        if let Some(first) = path_str.lines().map(str::trim).find(|l| !l.is_empty()) {
            return Ok(PathBuf::from(first));
        }
    }

    Err(anyhow!(
        "ffmpeg not found. Please install ffmpeg:\n\
         macOS: brew install ffmpeg\n\
         Linux: apt install ffmpeg (Debian/Ubuntu) or dnf install ffmpeg (Fedora)\n\
         Windows: Download from https://ffmpeg.org/download.html"
    ))
}

/// Arguments for a mono MP3 encode of `input` into `output`.
pub fn mp3_args(input: &Path, output: &Path, bitrate_kbps: u32) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-loglevel", "error", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(input.as_os_str().to_os_string());
    for arg in ["-acodec", "libmp3lame", "-ab"] {
        args.push(arg.into());
    }
    args.push(format!("{bitrate_kbps}k").into());
    for arg in ["-ac", "1", "-y"] {
        args.push(arg.into());
    }
    args.push(output.as_os_str().to_os_string());
    args
}

/// Encodes a WAV file to MP3 without blocking the runtime thread.
///
/// # Errors
/// - If ffmpeg cannot be spawned
/// - If ffmpeg exits unsuccessfully
pub async fn encode_mp3(ffmpeg: &Path, input: &Path, output: &Path, bitrate_kbps: u32) -> Result<()> {
    let result = tokio::process::Command::new(ffmpeg)
        .args(mp3_args(input, output, bitrate_kbps))
        .output()
        .await
        .map_err(|e| anyhow!("Failed to run ffmpeg at {}: {e}", ffmpeg.display()))?;

    if result.status.success() {
        tracing::debug!("Encoded {} to MP3 at {}kbps", input.display(), bitrate_kbps);
        Ok(())
    } else {
        let error_msg = String::from_utf8_lossy(&result.stderr);
        tracing::error!("ffmpeg conversion failed: {}", error_msg);
        Err(anyhow!("Audio encoding failed: {error_msg}"))
    }
}
