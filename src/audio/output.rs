use std::sync::{mpsc, Arc};
use std::thread;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample, StreamConfig};

use super::playback::PlaybackError;
use super::processing;
use crate::engine::AudioBuffer;

/// Invoked once when a stream has rendered its whole buffer
pub type FinishedCallback = Box<dyn FnOnce() + Send + 'static>;

/// Platform audio sink that can play one buffer per opened stream.
pub trait AudioOutput: Send + Sync {
    /// Start audible output of `buffer`.
    ///
    /// `on_finished` fires at most once, from another thread, after the last
    /// sample was rendered or the device was lost. It must never be called from inside `open`, and a
    /// stream that was stopped or dropped must never call it.
    fn open(
        &self,
        buffer: Arc<AudioBuffer>,
        on_finished: FinishedCallback,
    ) -> Result<Box<dyn OutputStream>, PlaybackError>;
}

/// One opened output stream
pub trait OutputStream: Send {
    /// Halt output. Safe to call repeatedly and after natural completion.
    fn stop(&mut self);
}

/// Default output device of the default cpal host
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalOutput;

impl CpalOutput {
    pub fn new() -> Self {
        Self
    }
}

impl AudioOutput for CpalOutput {
    fn open(
        &self,
        buffer: Arc<AudioBuffer>,
        on_finished: FinishedCallback,
    ) -> Result<Box<dyn OutputStream>, PlaybackError> {
        let host = cpal::default_host();
        let device = host.default_output_device()
            .ok_or_else(|| PlaybackError::Unavailable("No output device available".into()))?;

        let supported = device.default_output_config()
            .map_err(|e| PlaybackError::Unavailable(format!("Failed to get default output config: {}", e)))?;

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let device_sample_rate = config.sample_rate.0;
        let device_channels = config.channels as usize;

        let resampled = processing::resample(buffer.samples(), buffer.sample_rate(), device_sample_rate)
            .map_err(|e| PlaybackError::Unavailable(format!(
                "Failed to resample {}Hz to {}Hz: {}",
                buffer.sample_rate(),
                device_sample_rate,
                e
            )))?;
        let interleaved = processing::upmix(&resampled, device_channels);

        let (done_tx, done_rx) = mpsc::channel::<()>();

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, interleaved, done_tx)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, interleaved, done_tx)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, interleaved, done_tx)?,
            format => {
                return Err(PlaybackError::Unavailable(format!("Unsupported sample format: {:?}", format)));
            }
        };

        stream.play()
            .map_err(|e| PlaybackError::Unavailable(format!("Failed to start output stream: {}", e)))?;

        // The senders live in the stream callbacks, so dropping the stream
        // ends this thread without signalling.
        thread::spawn(move || {
            if done_rx.recv().is_ok() {
                on_finished();
            }
        });

        tracing::debug!(
            "Output stream opened ({}Hz, {} channels, {:?})",
            device_sample_rate,
            device_channels,
            sample_format
        );

        Ok(Box::new(CpalStream { stream: Some(stream) }))
    }
}

fn build_stream<T: SizedSample + FromSample<f32>>(
    device: &cpal::Device,
    config: &StreamConfig,
    samples: Vec<f32>,
    done_tx: mpsc::Sender<()>,
) -> Result<cpal::Stream, PlaybackError> {
    let mut renderer = Renderer::new(samples);
    let error_tx = done_tx.clone();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if renderer.fill(data) {
                let _ = done_tx.send(());
            }
        },
        move |err| {
            tracing::error!("Audio output error: {}", err);
            // A vanished device will never reach the end of the buffer
            if is_fatal(&err) {
                let _ = error_tx.send(());
            }
        },
        None,
    ).map_err(|e| PlaybackError::Unavailable(format!("Failed to build output stream: {}", e)))
}

fn is_fatal(err: &cpal::StreamError) -> bool {
    matches!(err, cpal::StreamError::DeviceNotAvailable)
}

/// Feeds interleaved samples into device periods, then silence.
struct Renderer {
    samples: Vec<f32>,
    position: usize,
    signalled: bool,
}

impl Renderer {
    fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            position: 0,
            signalled: false,
        }
    }

    /// Fill one period. Returns true exactly once: on the first period that
    /// starts after the last sample, so the tail is heard before teardown.
    fn fill<T: FromSample<f32> + cpal::Sample>(&mut self, data: &mut [T]) -> bool {
        let exhausted = self.position >= self.samples.len();

        for sample in data.iter_mut() {
            let value = match self.samples.get(self.position) {
                Some(&value) => {
                    self.position += 1;
                    value
                }
                None => 0.0,
            };
            *sample = T::from_sample(value);
        }

        if exhausted && !self.signalled {
            self.signalled = true;
            return true;
        }
        false
    }
}

struct CpalStream {
    stream: Option<cpal::Stream>,
}

// Safety: a CpalStream is owned by exactly one playback slot entry and only
// moves between threads together with it, so it is never used concurrently.
unsafe impl Send for CpalStream {}

impl OutputStream for CpalStream {
    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                tracing::debug!("Output stream already halted: {}", e);
            }
        }
    }
}
