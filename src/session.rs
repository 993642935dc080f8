//! Gaze stream session lifecycle.
//!
//! A session owns one subscription to the engine's gaze stream: it opens the
//! device on first start, funnels engine deliveries through a bounded queue
//! onto a dispatch thread, hands each sample to the caller's callback, and
//! keeps the most recent sample readable at any time.
//!
//! The engine delivers on its own thread; decoupling it from the caller
//! through the queue means a slow callback can never stall device I/O, and
//! stopping the stream has a precise meaning: unsubscribe, drain, join.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};

use crate::diagnostics::{StreamStats, StreamStatsSnapshot};
use crate::engine::{DeviceHandle, GazeEngine};
use crate::error::GazeError;
use crate::gaze::GazePoint;

/// Caller-supplied sample handler. Runs on the dispatch thread, not the
/// thread that started the stream.
pub type GazeCallback = Box<dyn FnMut(GazePoint) + Send>;

/// Tunables for a stream session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bound of the engine-to-dispatch queue. A full queue drops the newest
    /// sample instead of stalling the engine's delivery thread.
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No active subscription.
    Idle,
    /// Samples are being delivered.
    Streaming,
}

/// A subscription lifecycle around an engine's gaze stream.
pub struct StreamSession {
    engine: Box<dyn GazeEngine>,
    config: SessionConfig,
    state: SessionState,
    device: Option<DeviceHandle>,
    latest: Arc<Mutex<Option<GazePoint>>>,
    callback: Arc<Mutex<Option<GazeCallback>>>,
    dispatcher: Option<JoinHandle<()>>,
    stats: Arc<StreamStats>,
}

impl StreamSession {
    /// Session that only maintains the latest sample.
    pub fn new(engine: Box<dyn GazeEngine>) -> Self {
        Self::with_config(engine, None, SessionConfig::default())
    }

    /// Session that invokes `callback` for every delivered sample.
    pub fn with_callback(
        engine: Box<dyn GazeEngine>,
        callback: impl FnMut(GazePoint) + Send + 'static,
    ) -> Self {
        Self::with_config(engine, Some(Box::new(callback)), SessionConfig::default())
    }

    /// Session with explicit tunables.
    pub fn with_config(
        engine: Box<dyn GazeEngine>,
        callback: Option<GazeCallback>,
        config: SessionConfig,
    ) -> Self {
        Self {
            engine,
            config,
            state: SessionState::Idle,
            device: None,
            latest: Arc::new(Mutex::new(None)),
            callback: Arc::new(Mutex::new(callback)),
            dispatcher: None,
            stats: Arc::new(StreamStats::new()),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    /// Most recent sample, or `None` if nothing has arrived yet.
    ///
    /// Best-effort snapshot: a concurrent delivery may overwrite the slot
    /// between two reads.
    pub fn latest_gaze_point(&self) -> Option<GazePoint> {
        *lock_or_recover(&self.latest)
    }

    /// Attached device URLs, for device pickers and diagnostics.
    pub fn device_urls(&mut self) -> Result<Vec<String>, GazeError> {
        self.engine.device_urls()
    }

    /// Per-session delivery counters.
    pub fn stats(&self) -> StreamStatsSnapshot {
        self.stats.snapshot()
    }

    /// Begin streaming. Opens the device on first use.
    ///
    /// Fails with [`GazeError::DeviceUnavailable`] when no compatible device
    /// is discoverable and [`GazeError::AlreadyStreaming`] when called while
    /// a stream is running.
    pub fn start_stream(&mut self) -> Result<(), GazeError> {
        if self.state == SessionState::Streaming {
            return Err(GazeError::AlreadyStreaming);
        }
        if self.device.is_none() {
            self.device = Some(self.engine.discover()?);
        }

        let (tx, rx) = bounded(self.config.queue_capacity);
        let dispatcher = thread::Builder::new().name("gaze-dispatch".into()).spawn({
            let latest = self.latest.clone();
            let callback = self.callback.clone();
            let stats = self.stats.clone();
            move || run_dispatch(rx, latest, callback, stats)
        })?;

        let device = self.device.take().ok_or(GazeError::DeviceUnavailable)?;
        let subscribed = self.engine.subscribe(&device, tx);
        self.device = Some(device);
        if let Err(error) = subscribed {
            // The engine dropped its sender on failure, so the dispatcher
            // sees a closed queue and exits.
            let _ = dispatcher.join();
            return Err(error);
        }

        self.dispatcher = Some(dispatcher);
        self.stats.mark_started();
        self.state = SessionState::Streaming;
        tracing::info!("gaze stream started");
        Ok(())
    }

    /// Stop streaming. Calling while idle is a no-op.
    ///
    /// Blocks until the delivery queue is drained and the dispatch thread
    /// has exited, so no callback fires after this returns.
    pub fn stop_stream(&mut self) -> Result<(), GazeError> {
        if self.state != SessionState::Streaming {
            return Ok(());
        }
        self.state = SessionState::Idle;

        let device = self.device.take().ok_or(GazeError::DeviceUnavailable)?;
        let unsubscribed = self.engine.unsubscribe(&device);
        self.device = Some(device);

        if let Some(dispatcher) = self.dispatcher.take() {
            if unsubscribed.is_ok() {
                if dispatcher.join().is_err() {
                    tracing::error!("gaze dispatch thread panicked");
                }
            } else {
                // The engine may still hold its sender; joining could block
                // forever, so the dispatcher is left to exit whenever the
                // queue finally closes.
                drop(dispatcher);
            }
        }

        if unsubscribed.is_ok() {
            tracing::info!("gaze stream stopped");
        }
        unsubscribed
    }

    /// Start streaming for the lifetime of the returned guard.
    ///
    /// The guard stops the stream when it leaves scope, whether the scope
    /// ends normally, by early return, or by panic.
    pub fn stream(&mut self) -> Result<StreamGuard<'_>, GazeError> {
        self.start_stream()?;
        Ok(StreamGuard { session: self })
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if self.state == SessionState::Streaming {
            if let Err(error) = self.stop_stream() {
                tracing::warn!(error = %error, "failed to stop gaze stream during drop");
            }
        }
        if let Some(device) = self.device.take() {
            self.engine.release(device);
        }
    }
}

/// RAII handle for a running stream.
pub struct StreamGuard<'a> {
    session: &'a mut StreamSession,
}

impl StreamGuard<'_> {
    /// Most recent sample, or `None` if nothing has arrived yet.
    pub fn latest_gaze_point(&self) -> Option<GazePoint> {
        self.session.latest_gaze_point()
    }

    /// Per-session delivery counters.
    pub fn stats(&self) -> StreamStatsSnapshot {
        self.session.stats()
    }
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        if let Err(error) = self.session.stop_stream() {
            tracing::warn!(error = %error, "failed to stop gaze stream at scope exit");
        }
    }
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drains the queue until the engine drops its sender.
fn run_dispatch(
    rx: Receiver<GazePoint>,
    latest: Arc<Mutex<Option<GazePoint>>>,
    callback: Arc<Mutex<Option<GazeCallback>>>,
    stats: Arc<StreamStats>,
) {
    for point in rx.iter() {
        *lock_or_recover(&latest) = Some(point);
        stats.record_sample(point.valid);

        let mut slot = lock_or_recover(&callback);
        if let Some(handler) = slot.as_mut() {
            // A panicking callback must not kill delivery.
            if catch_unwind(AssertUnwindSafe(|| handler(point))).is_err() {
                tracing::error!("gaze callback panicked, sample ignored by handler");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngine;

    #[test]
    fn new_session_is_idle() {
        let session = StreamSession::new(Box::new(SimulatedEngine::with_script(Vec::new())));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_streaming());
        assert_eq!(session.latest_gaze_point(), None);
    }

    #[test]
    fn default_queue_bound_matches_engine_rate_headroom() {
        assert_eq!(SessionConfig::default().queue_capacity, 10_000);
    }

    #[test]
    fn start_and_stop_transition_state() {
        let mut session = StreamSession::new(Box::new(SimulatedEngine::with_script(Vec::new())));
        session.start_stream().expect("start works");
        assert!(session.is_streaming());
        session.stop_stream().expect("stop works");
        assert_eq!(session.state(), SessionState::Idle);
    }
}
