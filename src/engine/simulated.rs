//! In-process engine that replays a scripted sample sequence.
//!
//! Lets the session lifecycle, the test suite, and the demo run without
//! eye-tracking hardware. Delivery happens on a spawned thread to match the
//! vendor engine's threading contract: samples arrive on a thread the
//! caller does not own.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::engine::{DeviceHandle, GazeEngine};
use crate::error::GazeError;
use crate::gaze::GazePoint;

/// Lifecycle counters observable from outside a session.
#[derive(Debug, Default)]
pub struct EngineProbe {
    pub subscribes: AtomicUsize,
    pub unsubscribes: AtomicUsize,
    pub releases: AtomicUsize,
}

impl EngineProbe {
    /// Subscriptions currently live on the engine.
    pub fn live_subscriptions(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst) - self.unsubscribes.load(Ordering::SeqCst)
    }
}

/// A scripted gaze engine.
///
/// Each subscription replays the script from the beginning, either as fast
/// as the queue accepts it or spaced by a configured cadence.
pub struct SimulatedEngine {
    script: Vec<GazePoint>,
    cadence: Duration,
    online: bool,
    stop: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
    probe: Arc<EngineProbe>,
}

impl SimulatedEngine {
    /// Engine that replays `script` once per subscription.
    pub fn with_script(script: Vec<GazePoint>) -> Self {
        Self {
            script,
            cadence: Duration::ZERO,
            online: true,
            stop: Arc::new(AtomicBool::new(false)),
            feeder: None,
            probe: Arc::new(EngineProbe::default()),
        }
    }

    /// Space deliveries `cadence` apart instead of replaying immediately.
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// Engine with no discoverable device.
    pub fn offline() -> Self {
        let mut engine = Self::with_script(Vec::new());
        engine.online = false;
        engine
    }

    /// Shared lifecycle counters, for assertions on the session contract.
    pub fn probe(&self) -> Arc<EngineProbe> {
        self.probe.clone()
    }
}

impl GazeEngine for SimulatedEngine {
    fn device_urls(&mut self) -> Result<Vec<String>, GazeError> {
        if self.online {
            Ok(vec!["sim://gaze-0".to_string()])
        } else {
            Ok(Vec::new())
        }
    }

    fn discover(&mut self) -> Result<DeviceHandle, GazeError> {
        if self.online {
            Ok(DeviceHandle(0))
        } else {
            Err(GazeError::DeviceUnavailable)
        }
    }

    fn subscribe(&mut self, _device: &DeviceHandle, tx: Sender<GazePoint>) -> Result<(), GazeError> {
        self.stop.store(false, Ordering::SeqCst);
        let script = self.script.clone();
        let cadence = self.cadence;
        let stop = self.stop.clone();
        let feeder = thread::Builder::new()
            .name("sim-gaze-feed".into())
            .spawn(move || {
                for point in script {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    if tx.send(point).is_err() {
                        break;
                    }
                    if !cadence.is_zero() {
                        thread::sleep(cadence);
                    }
                }
                // The sender drops here, closing the session's queue.
            })?;
        self.feeder = Some(feeder);
        self.probe.subscribes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unsubscribe(&mut self, _device: &DeviceHandle) -> Result<(), GazeError> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(feeder) = self.feeder.take() {
            let _ = feeder.join();
        }
        self.probe.unsubscribes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self, _device: DeviceHandle) {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
    }
}
