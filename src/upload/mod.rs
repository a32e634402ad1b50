//! Recording upload client.
//!
//! Posts a finalized recording as multipart form data (one `file` field) to
//! `<server_url>/upload/record` and reads the listen URL out of the JSON reply.

#[cfg(test)]
pub(crate) mod test_server;

use serde_json::Value;

use crate::session::{EncodedAudio, UploadReceipt, Uploader};

/// Path of the recording upload endpoint, relative to the server URL.
pub const UPLOAD_PATH: &str = "/upload/record";

/// MIME type sent with the `file` part.
const AUDIO_MIME: &str = "audio/mpeg";

/// reqwest-backed [`Uploader`].
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploader {
    /// Creates an uploader for the server at `server_url` (scheme, host and
    /// optional path prefix; a trailing slash is ignored).
    pub fn new(server_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}{}", server_url.trim_end_matches('/'), UPLOAD_PATH),
        }
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Uploader for HttpUploader {
    async fn upload(&self, audio: EncodedAudio, filename: &str) -> anyhow::Result<UploadReceipt> {
        let size = audio.data.len();
        let file_part = reqwest::multipart::Part::bytes(audio.data)
            .file_name(filename.to_string())
            .mime_str(AUDIO_MIME)
            .map_err(|e| anyhow::anyhow!("Failed to create file part for upload: {e}"))?;
        let form = reqwest::multipart::Form::new().part("file", file_part);

        tracing::debug!(
            "Upload request:\n  URL: {}\n  Method: POST\n  Content-Type: multipart/form-data\n  file: {} ({} bytes, {})",
            self.endpoint,
            filename,
            size,
            AUDIO_MIME
        );

        let response = match self.client.post(&self.endpoint).multipart(form).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let error_msg = if e.is_connect() {
                    format!("Failed to connect to upload server at {}", self.endpoint)
                } else if e.is_timeout() {
                    "Upload request timed out".to_string()
                } else {
                    format!("Upload network error: {e}")
                };
                return Err(anyhow::anyhow!(error_msg));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("Upload rejected with {}: {}", status, error_body);
            return Err(anyhow::anyhow!("Upload server returned status {status}"));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse upload response: {e}"))?;

        tracing::debug!("Upload response: {}", body);

        let url = extract_url(&body)
            .ok_or_else(|| anyhow::anyhow!("Upload response has no url field: {body}"))?;

        Ok(UploadReceipt { url })
    }
}

/// Reads the listen URL from an upload response.
///
/// Only a non-empty string `url` counts; `null`, numbers, objects and empty
/// strings are treated as missing.
pub fn extract_url(body: &Value) -> Option<String> {
    body.get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
