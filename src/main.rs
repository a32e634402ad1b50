//! voxdrop: toggle the microphone, watch the waveform, upload the recording.

mod app;
mod commands;
mod config;
mod logging;
mod recording;
mod session;
mod ui;
mod upload;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = app::run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
