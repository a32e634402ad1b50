//! Upload an existing MP3 without recording.

use std::path::PathBuf;

use crate::config::VoxdropConfig;
use crate::session::{recording_filename, EncodedAudio, StatusMessage, Uploader, UuidRandom};
use crate::upload::HttpUploader;

/// Uploads `file` the same way a finished recording is uploaded and prints
/// the returned listen URL to stdout, or the status markup with `html`.
///
/// # Errors
/// - If the file cannot be read
/// - If configuration is invalid
/// - If the upload fails or the response has no URL
pub async fn handle_upload(
    file: PathBuf,
    html: bool,
    server: Option<String>,
) -> Result<(), anyhow::Error> {
    tracing::info!("=== voxdrop upload command ===");

    let data = tokio::fs::read(&file)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?;

    let mut config_data = VoxdropConfig::load()?;
    if let Some(server_url) = server {
        config_data.upload.server_url = server_url;
        config_data.validate()?;
    }

    let filename = recording_filename(&mut UuidRandom);
    let uploader = HttpUploader::new(&config_data.upload.server_url);
    tracing::info!(
        "Uploading {} as {} to {}",
        file.display(),
        filename,
        uploader.endpoint()
    );

    let audio = EncodedAudio {
        data,
        path: Some(file),
    };
    tracing::debug!("Read {audio}");

    let receipt = uploader
        .upload(audio, &filename)
        .await
        .map_err(|e| {
            tracing::error!("Upload error: {e:#}");
            e
        })?;

    if html {
        println!("{}", StatusMessage::UploadComplete { url: receipt.url }.markup());
    } else {
        println!("{}", receipt.url);
    }
    Ok(())
}
