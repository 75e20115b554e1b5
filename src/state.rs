use serde::{Serialize, Deserialize};

use crate::engine::{gemini_tts, TtsOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    Idle,
    Synthesizing,
    Playing,
}

impl Default for AppStatus {
    fn default() -> Self {
        Self::Idle
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub speech: SpeechSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub model: String,
    pub voice: String,
    pub endpoint: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model: gemini_tts::DEFAULT_MODEL.to_string(),
            voice: gemini_tts::DEFAULT_VOICE.to_string(),
            endpoint: gemini_tts::DEFAULT_ENDPOINT.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

impl SpeechSettings {
    pub fn tts_options(&self) -> TtsOptions {
        TtsOptions {
            model: self.model.clone(),
            voice: self.voice.clone(),
        }
    }
}
