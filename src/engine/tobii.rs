//! FFI backend for the vendor stream engine.
//!
//! Declares only the subset of the vendor C API this crate needs: api and
//! device lifecycle, device enumeration, gaze point subscription, and the
//! callback pump. Everything behind those calls (device I/O, filtering,
//! calibration, gaze estimation) is vendor-owned and opaque.
//!
//! Enabled with the `tobii` feature; linking requires the proprietary
//! `tobii_stream_engine` library.

use std::ffi::{c_char, c_void, CStr, CString};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;

use crate::engine::{DeviceHandle, GazeEngine};
use crate::error::GazeError;
use crate::gaze::GazePoint;

#[allow(non_camel_case_types)]
mod ffi {
    use std::ffi::{c_char, c_void};

    pub type tobii_api_t = c_void;
    pub type tobii_device_t = c_void;
    pub type tobii_error_t = i32;
    pub type tobii_log_level_t = i32;

    pub const TOBII_ERROR_NO_ERROR: tobii_error_t = 0;
    pub const TOBII_VALIDITY_VALID: i32 = 1;
    pub const TOBII_LOG_LEVEL_ERROR: tobii_log_level_t = 0;

    #[repr(C)]
    pub struct tobii_gaze_point_t {
        pub timestamp_us: i64,
        pub validity: i32,
        pub position_xy: [f32; 2],
    }

    #[repr(C)]
    pub struct tobii_custom_log_t {
        pub log_context: *mut c_void,
        pub log_func:
            Option<unsafe extern "C" fn(*mut c_void, tobii_log_level_t, *const c_char)>,
    }

    pub type tobii_gaze_point_callback_t =
        unsafe extern "C" fn(*const tobii_gaze_point_t, *mut c_void);
    pub type tobii_device_url_receiver_t = unsafe extern "C" fn(*const c_char, *mut c_void);

    #[link(name = "tobii_stream_engine")]
    extern "C" {
        pub fn tobii_api_create(
            api: *mut *mut tobii_api_t,
            custom_alloc: *const c_void,
            custom_log: *const tobii_custom_log_t,
        ) -> tobii_error_t;
        pub fn tobii_api_destroy(api: *mut tobii_api_t) -> tobii_error_t;
        pub fn tobii_enumerate_local_device_urls(
            api: *mut tobii_api_t,
            receiver: tobii_device_url_receiver_t,
            user_data: *mut c_void,
        ) -> tobii_error_t;
        pub fn tobii_device_create(
            api: *mut tobii_api_t,
            url: *const c_char,
            device: *mut *mut tobii_device_t,
        ) -> tobii_error_t;
        pub fn tobii_device_destroy(device: *mut tobii_device_t) -> tobii_error_t;
        pub fn tobii_device_process_callbacks(device: *mut tobii_device_t) -> tobii_error_t;
        pub fn tobii_update_timesync(device: *mut tobii_device_t) -> tobii_error_t;
        pub fn tobii_gaze_point_subscribe(
            device: *mut tobii_device_t,
            callback: tobii_gaze_point_callback_t,
            user_data: *mut c_void,
        ) -> tobii_error_t;
        pub fn tobii_gaze_point_unsubscribe(device: *mut tobii_device_t) -> tobii_error_t;
        pub fn tobii_error_message(error: tobii_error_t) -> *const c_char;
    }
}

/// Callback pump cadence; the engine only invokes callbacks while
/// `tobii_device_process_callbacks` runs.
const PUMP_INTERVAL: Duration = Duration::from_millis(10);

/// Engine clock synchronization cadence.
const TIMESYNC_INTERVAL: Duration = Duration::from_secs(30);

fn engine_fault(operation: &str, error: ffi::tobii_error_t) -> GazeError {
    // SAFETY: the engine returns pointers into a static message table.
    let message = unsafe {
        let text = ffi::tobii_error_message(error);
        if text.is_null() {
            format!("error code {error}")
        } else {
            CStr::from_ptr(text).to_string_lossy().into_owned()
        }
    };
    GazeError::engine_fault(operation, message)
}

/// Receives one enumerated device URL per invocation.
unsafe extern "C" fn url_receiver(url: *const c_char, user_data: *mut c_void) {
    if url.is_null() || user_data.is_null() {
        return;
    }
    let urls = &mut *(user_data as *mut Vec<String>);
    urls.push(CStr::from_ptr(url).to_string_lossy().into_owned());
}

/// Converts one engine sample and pushes it into the session's queue.
///
/// Runs on the pump thread, inside `tobii_device_process_callbacks`.
unsafe extern "C" fn gaze_dispatch(
    point: *const ffi::tobii_gaze_point_t,
    user_data: *mut c_void,
) {
    if point.is_null() || user_data.is_null() {
        return;
    }
    let tx = &*(user_data as *const Sender<GazePoint>);
    let point = &*point;
    let sample = GazePoint {
        timestamp_us: point.timestamp_us,
        valid: point.validity == ffi::TOBII_VALIDITY_VALID,
        x: point.position_xy[0],
        y: point.position_xy[1],
    };
    // A full queue drops the sample rather than stalling the engine thread.
    let _ = tx.try_send(sample);
}

/// Routes engine log lines into tracing.
unsafe extern "C" fn engine_log(
    _context: *mut c_void,
    level: ffi::tobii_log_level_t,
    text: *const c_char,
) {
    if text.is_null() {
        return;
    }
    let text = CStr::from_ptr(text).to_string_lossy();
    if level == ffi::TOBII_LOG_LEVEL_ERROR {
        tracing::error!(target: "stream_engine", "{text}");
    } else {
        tracing::debug!(target: "stream_engine", "{text}");
    }
}

/// Device pointer wrapper so the pump thread can hold it.
struct DevicePtr(*mut ffi::tobii_device_t);

// SAFETY: the engine permits cross-thread use of a device as long as calls
// are never concurrent; between subscribe and unsubscribe the pump thread is
// the only caller.
unsafe impl Send for DevicePtr {}

/// The vendor stream engine behind the [`GazeEngine`] seam.
pub struct TobiiEngine {
    api: *mut ffi::tobii_api_t,
    device: *mut ffi::tobii_device_t,
    preferred_url: Option<String>,
    sender: *mut Sender<GazePoint>,
    pump: Option<JoinHandle<()>>,
    pump_stop: Arc<AtomicBool>,
    // The api keeps a reference to the log struct for its whole lifetime.
    _log: Box<ffi::tobii_custom_log_t>,
}

// SAFETY: raw pointers are only dereferenced through &mut self, and the pump
// thread's device access is serialized against them by subscribe/unsubscribe.
unsafe impl Send for TobiiEngine {}

impl TobiiEngine {
    /// Create the engine api, routing vendor log lines into tracing.
    pub fn new() -> Result<Self, GazeError> {
        Self::with_preferred_url(None)
    }

    /// Engine that connects to `url` instead of the first device found.
    pub fn with_preferred_url(preferred_url: Option<String>) -> Result<Self, GazeError> {
        let log = Box::new(ffi::tobii_custom_log_t {
            log_context: ptr::null_mut(),
            log_func: Some(engine_log),
        });
        let mut api = ptr::null_mut();
        // SAFETY: the out-pointer is valid for the call and the log struct
        // outlives the api via the boxed field.
        let error = unsafe { ffi::tobii_api_create(&mut api, ptr::null(), &*log) };
        if error != ffi::TOBII_ERROR_NO_ERROR {
            return Err(engine_fault("tobii_api_create", error));
        }
        Ok(Self {
            api,
            device: ptr::null_mut(),
            preferred_url,
            sender: ptr::null_mut(),
            pump: None,
            pump_stop: Arc::new(AtomicBool::new(false)),
            _log: log,
        })
    }

    fn stop_pump(&mut self) {
        self.pump_stop.store(true, Ordering::SeqCst);
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }

    fn drop_sender(&mut self) {
        if !self.sender.is_null() {
            // SAFETY: set by subscribe; the pump is stopped, so the engine
            // can no longer invoke the dispatch callback.
            unsafe { drop(Box::from_raw(self.sender)) };
            self.sender = ptr::null_mut();
        }
    }
}

impl GazeEngine for TobiiEngine {
    fn device_urls(&mut self) -> Result<Vec<String>, GazeError> {
        let mut urls: Vec<String> = Vec::new();
        // SAFETY: the receiver only runs during this call, while `urls`
        // is alive and exclusively borrowed.
        let error = unsafe {
            ffi::tobii_enumerate_local_device_urls(
                self.api,
                url_receiver,
                &mut urls as *mut Vec<String> as *mut c_void,
            )
        };
        if error != ffi::TOBII_ERROR_NO_ERROR {
            return Err(engine_fault("tobii_enumerate_local_device_urls", error));
        }
        Ok(urls)
    }

    fn discover(&mut self) -> Result<DeviceHandle, GazeError> {
        if !self.device.is_null() {
            return Ok(DeviceHandle(self.device as u64));
        }

        let urls = self.device_urls()?;
        let url = match &self.preferred_url {
            Some(preferred) => urls
                .iter()
                .find(|candidate| *candidate == preferred)
                .cloned()
                .ok_or(GazeError::DeviceUnavailable)?,
            None => urls.first().cloned().ok_or(GazeError::DeviceUnavailable)?,
        };
        tracing::info!(%url, "connecting to gaze device");

        let c_url = CString::new(url).map_err(|_| GazeError::DeviceUnavailable)?;
        let mut device = ptr::null_mut();
        // SAFETY: api is live and the out-pointer is valid for the call.
        let error = unsafe { ffi::tobii_device_create(self.api, c_url.as_ptr(), &mut device) };
        if error != ffi::TOBII_ERROR_NO_ERROR {
            return Err(engine_fault("tobii_device_create", error));
        }
        self.device = device;
        Ok(DeviceHandle(device as u64))
    }

    fn subscribe(&mut self, _device: &DeviceHandle, tx: Sender<GazePoint>) -> Result<(), GazeError> {
        let sender = Box::into_raw(Box::new(tx));
        // SAFETY: the sender stays alive until unsubscribe reclaims it, and
        // the engine only uses it through the dispatch callback.
        let error =
            unsafe { ffi::tobii_gaze_point_subscribe(self.device, gaze_dispatch, sender as *mut c_void) };
        if error != ffi::TOBII_ERROR_NO_ERROR {
            // SAFETY: the engine rejected the subscription, so nothing else
            // references the sender.
            unsafe { drop(Box::from_raw(sender)) };
            return Err(engine_fault("tobii_gaze_point_subscribe", error));
        }

        self.pump_stop.store(false, Ordering::SeqCst);
        let stop = self.pump_stop.clone();
        let device = DevicePtr(self.device);
        let pump = match thread::Builder::new()
            .name("gaze-pump".into())
            .spawn(move || pump_loop(device, stop))
        {
            Ok(handle) => handle,
            Err(spawn_error) => {
                // SAFETY: no pump thread exists, so unsubscribing here is the
                // only device call in flight; afterwards the sender is unused.
                unsafe {
                    ffi::tobii_gaze_point_unsubscribe(self.device);
                    drop(Box::from_raw(sender));
                }
                return Err(GazeError::Io(spawn_error));
            }
        };

        self.sender = sender;
        self.pump = Some(pump);
        Ok(())
    }

    fn unsubscribe(&mut self, _device: &DeviceHandle) -> Result<(), GazeError> {
        self.stop_pump();
        // SAFETY: the pump has stopped, so this is the only device call.
        let error = unsafe { ffi::tobii_gaze_point_unsubscribe(self.device) };
        self.drop_sender();
        if error != ffi::TOBII_ERROR_NO_ERROR {
            return Err(engine_fault("tobii_gaze_point_unsubscribe", error));
        }
        Ok(())
    }

    fn release(&mut self, _device: DeviceHandle) {
        if self.device.is_null() {
            return;
        }
        // SAFETY: no pump thread references the device once release is
        // reachable; the session unsubscribes or drops first.
        let error = unsafe { ffi::tobii_device_destroy(self.device) };
        if error != ffi::TOBII_ERROR_NO_ERROR {
            tracing::warn!(error = %engine_fault("tobii_device_destroy", error), "device release failed");
        }
        self.device = ptr::null_mut();
    }
}

impl Drop for TobiiEngine {
    fn drop(&mut self) {
        self.stop_pump();
        self.drop_sender();
        if !self.device.is_null() {
            // SAFETY: all device users have stopped.
            let _ = unsafe { ffi::tobii_device_destroy(self.device) };
            self.device = ptr::null_mut();
        }
        if !self.api.is_null() {
            // SAFETY: the device, which the api owns resources for, is gone.
            let _ = unsafe { ffi::tobii_api_destroy(self.api) };
            self.api = ptr::null_mut();
        }
    }
}

/// Drives engine callbacks until stopped.
///
/// Also refreshes the engine's clock synchronization on a 30 s cadence, as
/// the engine requires for stable device timestamps.
fn pump_loop(device: DevicePtr, stop: Arc<AtomicBool>) {
    let mut last_timesync = Instant::now();
    while !stop.load(Ordering::SeqCst) {
        // SAFETY: the pump thread is the only device caller while running.
        let error = unsafe { ffi::tobii_device_process_callbacks(device.0) };
        if error != ffi::TOBII_ERROR_NO_ERROR {
            tracing::error!(
                fault = %engine_fault("tobii_device_process_callbacks", error),
                "engine delivery fault, stopping pump"
            );
            break;
        }

        if last_timesync.elapsed() >= TIMESYNC_INTERVAL {
            // SAFETY: same single-caller argument as above.
            let error = unsafe { ffi::tobii_update_timesync(device.0) };
            if error != ffi::TOBII_ERROR_NO_ERROR {
                tracing::warn!(fault = %engine_fault("tobii_update_timesync", error), "timesync failed");
            }
            last_timesync = Instant::now();
        }

        thread::sleep(PUMP_INTERVAL);
    }
}
