use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use super::output::{AudioOutput, OutputStream};
use crate::engine::AudioBuffer;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Audio playback unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Playing,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Identifies one started playback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackHandle {
    id: u64,
    duration: Duration,
}

impl PlaybackHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

struct ActivePlayback {
    handle: PlaybackHandle,
    stream: Box<dyn OutputStream>,
    on_complete: Box<dyn FnOnce() + Send>,
}

#[derive(Default)]
struct Slot {
    next_id: u64,
    active: Option<ActivePlayback>,
}

/// Single-slot playback: at most one buffer is audible at a time.
///
/// `start`, `stop` and natural completion all go through the slot mutex.
/// The completion callback runs after the lock is released, so it may start
/// another playback.
pub struct PlaybackController {
    output: Box<dyn AudioOutput>,
    slot: Arc<Mutex<Slot>>,
}

impl PlaybackController {
    pub fn new(output: impl AudioOutput + 'static) -> Self {
        Self {
            output: Box::new(output),
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Play `buffer`, silently stopping whatever was playing.
    ///
    /// `on_complete` runs once if the buffer plays to its end, and never if
    /// the playback is stopped or replaced. If the output cannot be opened
    /// the controller is left idle.
    pub fn start<F>(&self, buffer: AudioBuffer, on_complete: F) -> Result<PlaybackHandle, PlaybackError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = lock_slot(&self.slot);

        if let Some(mut previous) = slot.active.take() {
            previous.stream.stop();
            tracing::info!("Playback #{} replaced by a new playback", previous.handle.id);
        }

        slot.next_id += 1;
        let handle = PlaybackHandle {
            id: slot.next_id,
            duration: buffer.duration(),
        };
        let sample_count = buffer.len();

        let id = handle.id;
        let weak_slot = Arc::downgrade(&self.slot);
        let on_finished = Box::new(move || {
            if let Some(slot) = weak_slot.upgrade() {
                complete(&slot, id);
            }
        });

        let stream = match self.output.open(Arc::new(buffer), on_finished) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Failed to start playback #{}: {}", id, e);
                return Err(e);
            }
        };

        slot.active = Some(ActivePlayback {
            handle,
            stream,
            on_complete: Box::new(on_complete),
        });

        tracing::info!(
            "Playback #{} started: {} samples ({:.2}s)",
            id,
            sample_count,
            handle.duration.as_secs_f64()
        );
        Ok(handle)
    }

    /// Halt the active playback without running its completion callback.
    /// No-op when idle.
    pub fn stop(&self) {
        let active = lock_slot(&self.slot).active.take();

        match active {
            Some(mut active) => {
                active.stream.stop();
                tracing::info!("Playback #{} stopped", active.handle.id);
            }
            None => {
                tracing::debug!("Stop requested while idle");
            }
        }
    }

    pub fn state(&self) -> PlaybackState {
        if lock_slot(&self.slot).active.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        }
    }

    /// Handle of the active playback, if any
    pub fn current(&self) -> Option<PlaybackHandle> {
        lock_slot(&self.slot).active.as_ref().map(|active| active.handle)
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn complete(slot: &Mutex<Slot>, id: u64) {
    let finished = {
        let mut slot = lock_slot(slot);
        if slot.active.as_ref().map(|active| active.handle.id) == Some(id) {
            slot.active.take()
        } else {
            None
        }
    };

    match finished {
        Some(ActivePlayback { mut stream, on_complete, .. }) => {
            stream.stop();
            tracing::info!("Playback #{} completed", id);
            on_complete();
        }
        None => {
            tracing::debug!("Ignoring completion of playback #{} (already stopped)", id);
        }
    }
}

fn lock_slot(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use crate::audio::output::FinishedCallback;

    struct OpenedStream {
        on_finished: Option<FinishedCallback>,
        stopped: Arc<AtomicBool>,
        samples: usize,
    }

    /// Records opened streams; tests decide when each one finishes.
    #[derive(Default, Clone)]
    struct ManualOutput {
        opened: Arc<Mutex<Vec<OpenedStream>>>,
        unavailable: Arc<AtomicBool>,
    }

    struct ManualStream {
        stopped: Arc<AtomicBool>,
    }

    impl OutputStream for ManualStream {
        fn stop(&mut self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    impl AudioOutput for ManualOutput {
        fn open(
            &self,
            buffer: Arc<AudioBuffer>,
            on_finished: FinishedCallback,
        ) -> Result<Box<dyn OutputStream>, PlaybackError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(PlaybackError::Unavailable("no device".into()));
            }
            let stopped = Arc::new(AtomicBool::new(false));
            self.opened.lock().unwrap().push(OpenedStream {
                on_finished: Some(on_finished),
                stopped: stopped.clone(),
                samples: buffer.len(),
            });
            Ok(Box::new(ManualStream { stopped }))
        }
    }

    impl ManualOutput {
        /// Simulate the device reaching the end of stream `index`
        fn finish(&self, index: usize) {
            let callback = self.opened.lock().unwrap()[index].on_finished.take();
            if let Some(callback) = callback {
                callback();
            }
        }

        fn stopped(&self, index: usize) -> bool {
            self.opened.lock().unwrap()[index].stopped.load(Ordering::SeqCst)
        }

        fn opened_count(&self) -> usize {
            self.opened.lock().unwrap().len()
        }
    }

    fn buffer(len: usize) -> AudioBuffer {
        AudioBuffer::mono(vec![0.0; len], 24000)
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_starts_idle() {
        let controller = PlaybackController::new(ManualOutput::default());
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(controller.current(), None);
    }

    #[test]
    fn test_start_enters_playing() {
        let output = ManualOutput::default();
        let controller = PlaybackController::new(output.clone());

        let handle = controller.start(buffer(2400), || {}).unwrap();
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.current(), Some(handle));
        assert_eq!(handle.duration(), Duration::from_millis(100));
        assert_eq!(output.opened.lock().unwrap()[0].samples, 2400);
    }

    #[test]
    fn test_stop_while_idle_is_noop() {
        let controller = PlaybackController::new(ManualOutput::default());
        controller.stop();
        controller.stop();
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_stop_does_not_complete() {
        let output = ManualOutput::default();
        let controller = PlaybackController::new(output.clone());
        let (completions, on_complete) = counter();

        controller.start(buffer(10), on_complete).unwrap();
        controller.stop();

        assert_eq!(controller.state(), PlaybackState::Idle);
        assert!(output.stopped(0));
        assert_eq!(completions.load(Ordering::SeqCst), 0);

        controller.stop();
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_natural_completion_fires_once() {
        let output = ManualOutput::default();
        let controller = PlaybackController::new(output.clone());
        let (completions, on_complete) = counter();

        controller.start(buffer(10), on_complete).unwrap();
        output.finish(0);

        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(completions.load(Ordering::SeqCst), 1);

        output.finish(0);
        controller.stop();
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_restart_replaces_previous_silently() {
        let output = ManualOutput::default();
        let controller = PlaybackController::new(output.clone());
        let (first_done, first_complete) = counter();
        let (second_done, second_complete) = counter();

        let first = controller.start(buffer(10), first_complete).unwrap();
        let second = controller.start(buffer(20), second_complete).unwrap();

        assert_ne!(first.id(), second.id());
        assert!(output.stopped(0));
        assert!(!output.stopped(1));
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.current(), Some(second));

        // A late end-of-stream from the replaced playback changes nothing
        output.finish(0);
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(first_done.load(Ordering::SeqCst), 0);

        output.finish(1);
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(first_done.load(Ordering::SeqCst), 0);
        assert_eq!(second_done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completion_after_stop_is_ignored() {
        let output = ManualOutput::default();
        let controller = PlaybackController::new(output.clone());
        let (completions, on_complete) = counter();

        controller.start(buffer(10), on_complete).unwrap();
        controller.stop();
        output.finish(0);

        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unavailable_output_leaves_idle() {
        let output = ManualOutput::default();
        output.unavailable.store(true, Ordering::SeqCst);
        let controller = PlaybackController::new(output.clone());

        let err = controller.start(buffer(10), || {}).unwrap_err();
        assert!(matches!(err, PlaybackError::Unavailable(_)));
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(output.opened_count(), 0);
    }

    #[test]
    fn test_failed_restart_still_stops_previous() {
        let output = ManualOutput::default();
        let controller = PlaybackController::new(output.clone());
        let (completions, on_complete) = counter();

        controller.start(buffer(10), on_complete).unwrap();
        output.unavailable.store(true, Ordering::SeqCst);

        assert!(controller.start(buffer(10), || {}).is_err());
        assert!(output.stopped(0));
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_completion_callback_may_start_next_playback() {
        let output = ManualOutput::default();
        let controller = Arc::new(PlaybackController::new(output.clone()));

        let next = controller.clone();
        controller.start(buffer(10), move || {
            next.start(buffer(10), || {}).unwrap();
        }).unwrap();

        output.finish(0);
        assert_eq!(output.opened_count(), 2);
        assert_eq!(controller.state(), PlaybackState::Playing);

        output.finish(1);
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_completion_from_another_thread() {
        let output = ManualOutput::default();
        let controller = PlaybackController::new(output.clone());
        let (completions, on_complete) = counter();

        controller.start(buffer(10), on_complete).unwrap();

        let remote = output.clone();
        std::thread::spawn(move || remote.finish(0)).join().unwrap();

        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_stops_active_stream() {
        let output = ManualOutput::default();
        let (completions, on_complete) = counter();
        {
            let controller = PlaybackController::new(output.clone());
            controller.start(buffer(10), on_complete).unwrap();
        }
        assert!(output.stopped(0));

        // Device finishing after the controller is gone is harmless
        output.finish(0);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }
}
