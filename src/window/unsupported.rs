//! Fallback for targets without an active-window mapping facility.
//!
//! Exists so the crate, and the streaming half of the binary, compile and
//! run everywhere; only the window mapper itself is Windows-bound.

use crate::error::GazeError;

/// Uninhabited: no window can ever be captured on this target.
pub(super) enum ActiveWindow {}

pub(super) fn active_window() -> Result<ActiveWindow, GazeError> {
    Err(GazeError::PlatformUnsupported("active window capture"))
}

pub(super) fn primary_display_size() -> Result<(i32, i32), GazeError> {
    Err(GazeError::PlatformUnsupported("display size query"))
}

pub(super) fn screen_to_window(
    window: &ActiveWindow,
    _x: i32,
    _y: i32,
) -> Result<(i32, i32), GazeError> {
    match *window {}
}
