//! Active-window coordinate mapping.
//!
//! Converts normalized gaze positions into pixel coordinates relative to
//! the window that was active when the mapper was initialized. The OS
//! queries live in a per-platform module; only the Windows backend performs
//! real work.

#[cfg(target_os = "windows")]
mod windows;

#[cfg(not(target_os = "windows"))]
mod unsupported;

#[cfg(target_os = "windows")]
use self::windows as platform;

#[cfg(not(target_os = "windows"))]
use self::unsupported as platform;

use std::marker::PhantomData;

use crate::error::GazeError;

/// Convert a normalized position into absolute pixels on a display of the
/// given size. Values outside `[0.0, 1.0]` extrapolate past the display
/// edge rather than being rejected.
pub fn to_screen_pixels(x: f32, y: f32, width: i32, height: i32) -> (i32, i32) {
    (
        (x * width as f32).round() as i32,
        (y * height as f32).round() as i32,
    )
}

/// Maps normalized gaze coordinates into the active window's pixel space.
///
/// The active-window query only answers for the thread that owns the
/// window, so the mapper is `!Send` and must be created, initialized, and
/// queried on that thread.
pub struct WindowMapper {
    window: Option<platform::ActiveWindow>,
    _thread_affine: PhantomData<*const ()>,
}

impl WindowMapper {
    /// An uninitialized mapper. Call [`WindowMapper::init_window`] once the
    /// target window exists and is current.
    pub fn new() -> Self {
        Self {
            window: None,
            _thread_affine: PhantomData,
        }
    }

    /// Capture the calling thread's active window as the mapping target.
    ///
    /// Fails with [`GazeError::PlatformUnsupported`] off Windows and with
    /// [`GazeError::WindowNotInitialized`] when the calling thread has no
    /// active window yet.
    pub fn init_window(&mut self) -> Result<(), GazeError> {
        self.window = Some(platform::active_window()?);
        Ok(())
    }

    /// Map a normalized gaze position into window-relative pixels.
    ///
    /// The primary display size is queried fresh on every call, so the
    /// mapping stays correct across resolution changes.
    pub fn map_to_window(&self, x: f32, y: f32) -> Result<(i32, i32), GazeError> {
        let window = self
            .window
            .as_ref()
            .ok_or(GazeError::WindowNotInitialized)?;
        let (width, height) = platform::primary_display_size()?;
        let (screen_x, screen_y) = to_screen_pixels(x, y, width, height);
        platform::screen_to_window(window, screen_x, screen_y)
    }
}

impl Default for WindowMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_map_to_display_corners() {
        assert_eq!(to_screen_pixels(0.0, 0.0, 1920, 1080), (0, 0));
        assert_eq!(to_screen_pixels(1.0, 1.0, 1920, 1080), (1920, 1080));
    }

    #[test]
    fn pixel_positions_round_rather_than_truncate() {
        // 0.5 × 1921 = 960.5 rounds up; int truncation would give 960.
        assert_eq!(to_screen_pixels(0.5, 0.5, 1921, 1081), (961, 541));
    }

    #[test]
    fn out_of_range_positions_extrapolate() {
        assert_eq!(to_screen_pixels(-0.5, 1.5, 1000, 1000), (-500, 1500));
    }

    #[test]
    fn mapping_before_init_is_rejected() {
        let mapper = WindowMapper::new();
        assert!(matches!(
            mapper.map_to_window(0.5, 0.5),
            Err(GazeError::WindowNotInitialized)
        ));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn init_is_unsupported_off_windows() {
        let mut mapper = WindowMapper::new();
        assert!(matches!(
            mapper.init_window(),
            Err(GazeError::PlatformUnsupported(_))
        ));
    }
}
