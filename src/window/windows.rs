//! Win32 backend for active-window coordinate mapping.

use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::Graphics::Gdi::MapWindowPoints;
use windows::Win32::UI::Input::KeyboardAndMouse::GetActiveWindow;
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

use crate::error::GazeError;

/// The window captured at init time.
pub(super) struct ActiveWindow(HWND);

pub(super) fn active_window() -> Result<ActiveWindow, GazeError> {
    // Thread-affine: returns null unless the calling thread owns the
    // active window.
    let hwnd = unsafe { GetActiveWindow() };
    if hwnd.is_invalid() {
        return Err(GazeError::WindowNotInitialized);
    }
    Ok(ActiveWindow(hwnd))
}

pub(super) fn primary_display_size() -> Result<(i32, i32), GazeError> {
    let width = unsafe { GetSystemMetrics(SM_CXSCREEN) };
    let height = unsafe { GetSystemMetrics(SM_CYSCREEN) };
    Ok((width, height))
}

pub(super) fn screen_to_window(
    window: &ActiveWindow,
    x: i32,
    y: i32,
) -> Result<(i32, i32), GazeError> {
    let mut points = [POINT { x, y }];
    // Null source window means screen coordinates.
    unsafe { MapWindowPoints(HWND::default(), window.0, &mut points) };
    Ok((points[0].x, points[0].y))
}
