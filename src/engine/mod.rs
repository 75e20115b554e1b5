pub mod gemini_tts;

use std::time::Duration;
use serde::{Serialize, Deserialize};

/// Decoded audio ready for playback.
///
/// Holds one normalized sample sequence per channel. Only mono buffers are
/// produced by this crate, so the single channel is stored flat.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: crate::audio::CHANNELS,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample sequence of one channel, `None` past the channel count
    pub fn channel_data(&self, channel: u16) -> Option<&[f32]> {
        (channel < self.channels).then_some(self.samples.as_slice())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of samples per channel
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        crate::audio::processing::duration_of(self.samples.len(), self.sample_rate)
    }
}

/// Parameters of a speech generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsOptions {
    pub model: String,
    pub voice: String,
}

impl Default for TtsOptions {
    fn default() -> Self {
        Self {
            model: gemini_tts::DEFAULT_MODEL.to_string(),
            voice: gemini_tts::DEFAULT_VOICE.to_string(),
        }
    }
}
