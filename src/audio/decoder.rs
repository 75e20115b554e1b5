//! Speech payload decoder
//!
//! Turns the base64 payload returned by the speech model into raw PCM bytes,
//! then into a normalized mono [`AudioBuffer`].

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

use super::{BYTES_PER_SAMPLE, SAMPLE_RATE};
use crate::engine::AudioBuffer;

/// Malformed base64 payload
#[derive(Debug, Error)]
#[error("Invalid base64 audio payload: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);

/// Raw s16le PCM bytes as delivered by the speech model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcmSampleBuffer {
    bytes: Vec<u8>,
}

impl PcmSampleBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of complete samples
    pub fn sample_count(&self) -> usize {
        self.bytes.len() / BYTES_PER_SAMPLE
    }

    /// Bytes past the last complete sample (0 or 1)
    pub fn trailing_bytes(&self) -> usize {
        self.bytes.len() % BYTES_PER_SAMPLE
    }
}

impl From<Vec<u8>> for PcmSampleBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// Standard (padded) base64 decoding. The empty string decodes to no bytes.
pub fn decode_base64(payload: &str) -> Result<PcmSampleBuffer, DecodeError> {
    let bytes = general_purpose::STANDARD.decode(payload)?;
    Ok(PcmSampleBuffer::new(bytes))
}

/// Convert s16le PCM into a 24kHz mono buffer normalized to [-1.0, 1.0].
///
/// An odd trailing byte cannot form a sample and is dropped.
pub fn to_audio_buffer(pcm: &PcmSampleBuffer) -> AudioBuffer {
    let trailing = pcm.trailing_bytes();
    if trailing > 0 {
        tracing::warn!(
            "PCM payload has odd length ({} bytes), dropping {} trailing byte",
            pcm.len(),
            trailing
        );
    }

    let samples: Vec<f32> = pcm
        .as_bytes()
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect();

    AudioBuffer::mono(samples, SAMPLE_RATE)
}

/// Decode a speech payload straight into a playable buffer
pub fn decode_payload(payload: &str) -> Result<AudioBuffer, DecodeError> {
    let pcm = decode_base64(payload)?;
    Ok(to_audio_buffer(&pcm))
}
