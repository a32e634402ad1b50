//! Interactive recording session.
//!
//! Wires the cpal/ffmpeg/reqwest capabilities into a recording controller and
//! drives it from the terminal panel. Everything runs on one thread: the
//! controller is a local task that handles queued toggles one at a time and
//! hands each finalized recording to its own local upload task, while the panel
//! loop keeps drawing and surfaces device errors as they arrive.
//! SIGUSR1 toggles recording from outside the terminal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet, LocalSet};

use crate::config::VoxdropConfig;
use crate::recording::{DeviceEvent, MicrophoneVisualizer, Mp3Encoder, WaveformMeter};
use crate::session::{report_device_error, RecordingController, SessionState, UuidRandom};
use crate::ui::{ControlPanel, PanelCommand, PanelState};
use crate::upload::HttpUploader;

/// Frame and waveform sampling interval.
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the interactive recorder until the user quits.
///
/// # Errors
/// - If configuration cannot be loaded or the server override is invalid
/// - If the terminal cannot be driven
pub async fn handle_record(server: Option<String>) -> Result<(), anyhow::Error> {
    tracing::info!("=== voxdrop recorder started ===");

    let mut config_data = VoxdropConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {e:#}");
        anyhow::anyhow!("Configuration error: {e:#}")
    })?;
    if let Some(server_url) = server {
        config_data.upload.server_url = server_url;
        config_data.validate()?;
    }

    tracing::info!(
        "Configuration loaded: device={}, bitrate={}kbps, reference_level={}dBFS, server={}",
        config_data.audio.device,
        config_data.audio.bitrate_kbps,
        config_data.audio.reference_level_db,
        config_data.upload.server_url
    );

    LocalSet::new().run_until(run_session(config_data)).await?;

    tracing::info!("=== voxdrop recorder exited ===");
    Ok(())
}

async fn run_session(config: VoxdropConfig) -> anyhow::Result<()> {
    let (device_tx, mut device_rx) = mpsc::unbounded_channel::<DeviceEvent>();
    let (toggle_tx, mut toggle_rx) = mpsc::unbounded_channel::<()>();

    let mut panel = ControlPanel::new()?;
    let waveform = Arc::new(Mutex::new(WaveformMeter::new(
        config.audio.reference_level_db,
        panel.width()?,
    )));
    let panel_state = PanelState::default();

    let uploader = HttpUploader::new(&config.upload.server_url);
    tracing::debug!("Uploading to {}", uploader.endpoint());

    let mut controller = RecordingController::new(
        MicrophoneVisualizer::new(config.audio.device.clone(), Arc::clone(&waveform), device_tx),
        Mp3Encoder::new(&config.audio),
        uploader,
        UuidRandom,
        panel_state.clone(),
    );

    let controller_task = tokio::task::spawn_local(async move {
        let mut uploads = JoinSet::new();
        while toggle_rx.recv().await.is_some() {
            if let Some(upload) = controller.toggle().await {
                tracing::debug!("Starting upload of {}", upload.filename());
                uploads.spawn_local(upload.run());
            }
            while let Some(finished) = uploads.try_join_next() {
                log_upload_task(finished);
            }
        }
        if !uploads.is_empty() {
            tracing::info!("Waiting for {} upload(s) to finish", uploads.len());
        }
        while let Some(finished) = uploads.join_next().await {
            log_upload_task(finished);
        }
        controller.state()
    });

    let external_toggle = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&external_toggle))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    let mut interval = tokio::time::interval(FRAME_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let mut toggles = 0;
        if external_toggle.swap(false, Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: toggling recording");
            toggles += 1;
        }
        match panel.handle_input()? {
            PanelCommand::Continue => {}
            PanelCommand::Toggle => toggles += 1,
            PanelCommand::Quit => break,
        }
        for _ in 0..toggles {
            if toggle_tx.send(()).is_err() {
                anyhow::bail!("Recording controller stopped unexpectedly");
            }
        }

        while let Ok(DeviceEvent::Error { code }) = device_rx.try_recv() {
            report_device_error(&panel_state, &code);
        }

        let (history, level) = {
            let mut meter = waveform.lock().unwrap_or_else(PoisonError::into_inner);
            meter.resize(panel.width()?);
            meter.record_level();
            (meter.history(), meter.level())
        };
        panel.render(&panel_state.snapshot(), &history, level)?;
    }

    panel.cleanup()?;

    // Let queued toggles and in-flight uploads finish; nothing is cancelled.
    drop(toggle_tx);
    match controller_task.await {
        Ok(SessionState::Recording) => {
            tracing::warn!("Exited while recording; the capture was discarded");
        }
        Ok(SessionState::Idle) => {}
        Err(e) => tracing::error!("Recording controller task failed: {e}"),
    }

    Ok(())
}

fn log_upload_task(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        tracing::error!("Upload task failed: {e}");
    }
}
