use anyhow::Result;

use crate::audio::{decode_payload, AudioOutput, PlaybackController, PlaybackHandle, PlaybackState};
use crate::engine::gemini_tts::GeminiTtsClient;
use crate::engine::TtsOptions;
use crate::state::Settings;

/// Text in, audible speech out: generation, decoding and playback in one place.
pub struct Speaker {
    client: GeminiTtsClient,
    options: TtsOptions,
    controller: PlaybackController,
}

impl Speaker {
    pub fn new(client: GeminiTtsClient, options: TtsOptions, output: impl AudioOutput + 'static) -> Self {
        Self {
            client,
            options,
            controller: PlaybackController::new(output),
        }
    }

    pub fn from_settings(settings: &Settings, output: impl AudioOutput + 'static) -> Result<Self> {
        let client = GeminiTtsClient::from_settings(&settings.speech)?;
        Ok(Self::new(client, settings.speech.tts_options(), output))
    }

    /// Generate speech for `text` and play it, replacing any current playback.
    pub async fn speak_text<F>(&self, text: &str, on_complete: F) -> Result<PlaybackHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let payload = self.client.generate(text, &self.options).await?
            .ok_or_else(|| anyhow::anyhow!("Speech generation returned no audio"))?;

        let buffer = decode_payload(&payload)?;
        tracing::info!(
            "Decoded {} samples ({:.2}s) for '{}'",
            buffer.len(),
            buffer.duration().as_secs_f64(),
            text
        );

        let handle = self.controller.start(buffer, on_complete)?;
        Ok(handle)
    }

    pub fn stop_speaking(&self) {
        self.controller.stop();
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }
}
