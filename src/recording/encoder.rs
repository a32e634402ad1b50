//! MP3 encoder backed by a microphone capture and ffmpeg.
//!
//! While active, mono samples accumulate in memory. Stopping writes them to a
//! temporary WAV, encodes that to MP3 with ffmpeg, and returns the MP3 bytes.
//! The MP3 file itself is kept as the downloadable copy of the last recording.

use anyhow::{anyhow, Result};
use hound::WavWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::capture::InputCapture;
use super::ffmpeg::{encode_mp3, find_ffmpeg};
use crate::config::AudioConfig;
use crate::session::{EncodedAudio, Encoder};

/// Records from the configured device and encodes to MP3 on stop.
pub struct Mp3Encoder {
    device: String,
    requested_sample_rate: u32,
    bitrate_kbps: u32,
    ffmpeg_path: Option<PathBuf>,
    output_path: PathBuf,
    samples: Arc<Mutex<Vec<i16>>>,
    capture: Option<InputCapture>,
}

impl Mp3Encoder {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            device: config.device.clone(),
            requested_sample_rate: config.sample_rate,
            bitrate_kbps: config.bitrate_kbps,
            ffmpeg_path: config.ffmpeg_path.clone(),
            output_path: std::env::temp_dir().join("voxdrop-recording.mp3"),
            samples: Arc::new(Mutex::new(Vec::new())),
            capture: None,
        }
    }

    fn take_samples(&self) -> Vec<i16> {
        std::mem::take(&mut *self.samples.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Encoder for Mp3Encoder {
    async fn start(&mut self) -> Result<()> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let samples = Arc::clone(&self.samples);
        let capture = InputCapture::open(
            &self.device,
            move |chunk| {
                samples
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(chunk);
            },
            |err| tracing::error!("Recording stream error: {}", err),
        )?;

        if capture.sample_rate() != self.requested_sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                self.requested_sample_rate,
                capture.sample_rate()
            );
        }
        tracing::info!(
            "Recording device: {} ({}Hz)",
            capture.device_name(),
            capture.sample_rate()
        );

        self.capture = Some(capture);
        Ok(())
    }

    async fn stop(&mut self) -> Result<EncodedAudio> {
        let capture = self
            .capture
            .take()
            .ok_or_else(|| anyhow!("Encoder is not recording"))?;
        let sample_rate = capture.sample_rate();
        drop(capture);

        let samples = self.take_samples();
        if samples.is_empty() {
            tracing::warn!("Recording stopped with no samples captured");
            return Err(anyhow!("No audio was captured"));
        }

        tracing::info!(
            "Recording stopped: {:.2}s ({} samples at {}Hz)",
            samples.len() as f32 / sample_rate as f32,
            samples.len(),
            sample_rate
        );

        let ffmpeg = find_ffmpeg(self.ffmpeg_path.as_deref()).await?;
        let temp_wav = std::env::temp_dir().join(format!("voxdrop_{}.wav", std::process::id()));
        write_wav(samples, sample_rate, temp_wav.clone()).await?;

        let encoded = encode_mp3(&ffmpeg, &temp_wav, &self.output_path, self.bitrate_kbps).await;

        if let Err(e) = tokio::fs::remove_file(&temp_wav).await {
            tracing::debug!("Failed to remove temp file: {}", e);
        }
        encoded?;

        let data = tokio::fs::read(&self.output_path)
            .await
            .map_err(|e| anyhow!("Failed to read encoded recording: {e}"))?;
        tracing::info!(
            "Audio saved: {} ({} bytes)",
            self.output_path.display(),
            data.len()
        );

        Ok(EncodedAudio {
            data,
            path: Some(self.output_path.clone()),
        })
    }
}

/// Writes the WAV on the blocking pool so the panel keeps drawing while a
/// long recording is flushed to disk.
pub async fn write_wav(samples: Vec<i16>, sample_rate: u32, path: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || save_wav(&samples, sample_rate, &path))
        .await
        .map_err(|e| anyhow!("WAV writer task failed: {e}"))?
}

/// Writes mono 16-bit PCM to a WAV file.
fn save_wav(samples: &[i16], sample_rate: u32, path: &Path) -> Result<()> {
    let wav_spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, wav_spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    tracing::debug!("Temporary WAV created: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio_config() -> AudioConfig {
        AudioConfig {
            device: "default".to_string(),
            sample_rate: 44100,
            bitrate_kbps: 128,
            reference_level_db: -20,
            ffmpeg_path: None,
        }
    }

    #[tokio::test]
    async fn test_stop_without_start_fails() {
        let mut encoder = Mp3Encoder::new(&audio_config());
        let err = encoder.stop().await.unwrap_err();
        assert!(err.to_string().contains("not recording"));
    }

    #[test]
    fn test_save_wav_round_trips_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        save_wav(&[0, 1000, -1000, i16::MAX], 16000, &path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 16000);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 1000, -1000, i16::MAX]);
    }

    #[tokio::test]
    async fn test_write_wav_on_blocking_pool_keeps_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.wav");
        let samples: Vec<i16> = (0..48_000).map(|i| (i % 200) as i16 - 100).collect();

        write_wav(samples.clone(), 48_000, path.clone()).await.unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 48_000);
        let written: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(written, samples);
    }

    #[tokio::test]
    async fn test_write_wav_reports_unwritable_path() {
        let err = write_wav(vec![1, 2, 3], 16000, PathBuf::from("/definitely/not/here/a.wav"))
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
