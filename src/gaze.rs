//! Gaze sample types delivered by the engine.

use serde::{Deserialize, Serialize};

/// One gaze sample reported by the device.
///
/// Coordinates are normalized to the primary display: `(0.0, 0.0)` is the
/// top-left corner, `(1.0, 1.0)` the bottom-right. The timestamp is on the
/// device's own monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazePoint {
    /// Monotonic device time of the sample, in microseconds.
    pub timestamp_us: i64,
    /// Whether the device considered this sample usable.
    pub valid: bool,
    /// Normalized horizontal position.
    pub x: f32,
    /// Normalized vertical position.
    pub y: f32,
}

impl GazePoint {
    /// Create a usable sample.
    pub fn valid(timestamp_us: i64, x: f32, y: f32) -> Self {
        Self {
            timestamp_us,
            valid: true,
            x,
            y,
        }
    }

    /// Create a sample the device flagged as unusable (no eye detected).
    pub fn invalid(timestamp_us: i64) -> Self {
        Self {
            timestamp_us,
            valid: false,
            x: 0.0,
            y: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_validity() {
        let sample = GazePoint::valid(42, 0.25, 0.75);
        assert!(sample.valid);
        assert_eq!(sample.timestamp_us, 42);

        let sample = GazePoint::invalid(43);
        assert!(!sample.valid);
        assert_eq!(sample.timestamp_us, 43);
    }
}
