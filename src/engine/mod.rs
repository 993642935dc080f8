//! Engine collaborators for gaze streaming.
//!
//! The vendor engine is opaque to this crate: it performs device I/O and
//! gaze estimation on its own, and delivers finished samples asynchronously.
//! [`GazeEngine`] is the seam between the session lifecycle and a concrete
//! backend, so the session can run against real hardware or a scripted
//! replay without changing shape.

pub mod simulated;

#[cfg(feature = "tobii")]
pub mod tobii;

use crossbeam_channel::Sender;

use crate::error::GazeError;
use crate::gaze::GazePoint;

pub use simulated::{EngineProbe, SimulatedEngine};

#[cfg(feature = "tobii")]
pub use tobii::TobiiEngine;

/// Opaque token for an open engine device.
///
/// Not cloneable, and [`GazeEngine::release`] consumes it, so releasing a
/// device twice is unrepresentable.
#[derive(Debug)]
pub struct DeviceHandle(pub(crate) u64);

/// A gaze-data source with a subscribe/unsubscribe delivery contract.
///
/// Implementations own their delivery thread. `subscribe` takes ownership of
/// the channel sender; `unsubscribe` must stop the delivery thread and drop
/// that sender (a closed channel is how the session detects the end of
/// delivery). When `subscribe` returns an error the sender must already have
/// been dropped.
pub trait GazeEngine: Send {
    /// Enumerate the URLs of attached compatible devices.
    fn device_urls(&mut self) -> Result<Vec<String>, GazeError>;

    /// Open the preferred, or first discovered, device.
    fn discover(&mut self) -> Result<DeviceHandle, GazeError>;

    /// Begin asynchronous sample delivery into `tx`.
    fn subscribe(&mut self, device: &DeviceHandle, tx: Sender<GazePoint>) -> Result<(), GazeError>;

    /// Stop sample delivery. Blocks until the delivery thread has stopped.
    fn unsubscribe(&mut self, device: &DeviceHandle) -> Result<(), GazeError>;

    /// Destroy the device.
    fn release(&mut self, device: DeviceHandle);
}
