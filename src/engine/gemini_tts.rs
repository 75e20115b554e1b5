use anyhow::{Context, Result};
use serde_json::{json, Value};

use super::TtsOptions;
use crate::state::SpeechSettings;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";

/// Gemini speech generation over the REST `generateContent` call.
///
/// Responses carry base64 s16le PCM at 24kHz mono.
pub struct GeminiTtsClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiTtsClient {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Route requests through a specific HTTP client (tests bypass proxies)
    #[cfg(test)]
    pub(crate) fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn from_settings(settings: &SpeechSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("API key not found: set {}", settings.api_key_env))?;
        Ok(Self::new(api_key, settings.endpoint.clone()))
    }

    /// Request speech for `text`. `Ok(None)` means the model answered without audio.
    pub async fn generate(&self, text: &str, options: &TtsOptions) -> Result<Option<String>> {
        if text.trim().is_empty() {
            anyhow::bail!("Cannot synthesize empty text");
        }

        let url = generate_url(&self.endpoint, &options.model);
        let resp = self.client.post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("User-Agent", concat!("ReadAloud/", env!("CARGO_PKG_VERSION")))
            .json(&request_body(text, &options.voice))
            .send()
            .await
            .context("Speech generation request failed")?
            .error_for_status()?;

        let body: Value = resp.json().await
            .context("Failed to parse speech generation response")?;

        let payload = extract_audio_payload(&body);
        match &payload {
            Some(data) => tracing::info!("Speech generated: {} base64 chars ({})", data.len(), options.voice),
            None => tracing::warn!("Speech generation response contained no audio"),
        }
        Ok(payload)
    }
}

fn generate_url(endpoint: &str, model: &str) -> String {
    format!("{}/models/{}:generateContent", endpoint.trim_end_matches('/'), model)
}

fn request_body(text: &str, voice: &str) -> Value {
    json!({
        "contents": [{
            "parts": [{ "text": text }]
        }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice }
                }
            }
        }
    })
}

/// First inline audio part of a `generateContent` response
pub fn extract_audio_payload(response: &Value) -> Option<String> {
    response.get("candidates")?
        .as_array()?
        .iter()
        .filter_map(|candidate| candidate.pointer("/content/parts")?.as_array())
        .flatten()
        .find_map(|part| part.pointer("/inlineData/data")?.as_str().map(str::to_string))
}
