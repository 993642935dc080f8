//! Gaze streaming client for stream-engine eye trackers.
//!
//! A thin binding layer: the vendor engine performs all device I/O and gaze
//! estimation; this crate marshals its asynchronous callback stream into a
//! session lifecycle and converts normalized gaze coordinates into
//! window-relative pixels.
//!
//! # Architecture
//!
//! ```text
//!  engine thread         bounded queue         dispatch thread
//! ┌─────────────┐   tx   ┌───────────┐   rx   ┌──────────────────┐
//! │ GazeEngine  │ ─────▶ │   FIFO    │ ─────▶ │ latest slot +    │
//! │ delivery    │        └───────────┘        │ caller callback  │
//! └─────────────┘                             └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gaze_stream_client::{SimulatedEngine, StreamSession};
//!
//! let engine = SimulatedEngine::with_script(Vec::new());
//! let mut session = StreamSession::with_callback(Box::new(engine), |point| {
//!     println!("({:.3}, {:.3})", point.x, point.y);
//! });
//!
//! {
//!     let stream = session.stream().expect("no device found");
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//!     drop(stream); // unsubscribes and drains the queue
//! }
//! ```

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod gaze;
pub mod session;
pub mod window;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use diagnostics::{StreamStats, StreamStatsSnapshot};
pub use engine::{DeviceHandle, EngineProbe, GazeEngine, SimulatedEngine};
pub use error::GazeError;
pub use gaze::GazePoint;
pub use session::{GazeCallback, SessionConfig, SessionState, StreamGuard, StreamSession};
pub use window::{to_screen_pixels, WindowMapper};

#[cfg(feature = "tobii")]
pub use engine::TobiiEngine;

/// Library version, reported for diagnostics and compatibility checks.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_reported() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }
}
