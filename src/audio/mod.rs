pub mod decoder;
pub mod output;
pub mod playback;
pub mod processing;

pub use decoder::{decode_base64, decode_payload, to_audio_buffer, DecodeError, PcmSampleBuffer};
pub use output::{AudioOutput, CpalOutput, FinishedCallback, OutputStream};
pub use playback::{PlaybackController, PlaybackError, PlaybackHandle, PlaybackState};

/// Sample rate of the speech model output
pub const SAMPLE_RATE: u32 = 24000;
/// Channel count of the speech model output
pub const CHANNELS: u16 = 1;
/// Width of one signed 16-bit little-endian sample
pub const BYTES_PER_SAMPLE: usize = 2;
