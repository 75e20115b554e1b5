pub mod audio;
pub mod commands;
pub mod engine;
pub mod persistence;
pub mod state;

use anyhow::{Context, Result};

use audio::CpalOutput;
use commands::tts::Speaker;
use state::AppStatus;

/// Speak `text` on the default output device and wait until it finishes
/// or Ctrl-C is pressed.
pub async fn run(text: String) -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting Read Aloud v{}", env!("CARGO_PKG_VERSION"));

    if text.trim().is_empty() {
        anyhow::bail!("Usage: read-aloud <text...>");
    }

    let settings = persistence::load_settings();
    let speaker = Speaker::from_settings(&settings, CpalOutput::new())?;

    let mut status = AppStatus::Synthesizing;
    tracing::info!("Status: {:?} (voice: {})", status, settings.speech.voice);

    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = speaker.speak_text(&text, move || {
        let _ = done_tx.send(());
    }).await?;

    status = AppStatus::Playing;
    tracing::info!("Status: {:?} ({:.2}s)", status, handle.duration().as_secs_f64());

    tokio::select! {
        finished = done_rx => {
            if finished.is_err() {
                tracing::warn!("Playback ended without completing");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            speaker.stop_speaking();
            tracing::info!("Interrupted");
        }
    }

    status = AppStatus::Idle;
    tracing::info!("Status: {:?}", status);
    Ok(())
}
