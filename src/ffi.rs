//! C FFI layer for joycon-motion.
//!
//! Session-level API for hosts that own the HID transport themselves and
//! only need decoding and orientation. The generated C header is written to
//! `include/joycon_motion.h` by cbindgen.

use crate::config::EstimatorConfig;
use crate::diff::ChangeSet;
use crate::error::LastError;
use crate::protocol;
use crate::session::Session;
use crate::types::{ButtonState, StickFrame, Transport};
use std::ffi::{c_char, c_int};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Opaque session handle for C consumers.
pub struct JcSession(Session);

/// Quaternion plus Euler angles in C-compatible layout.
#[repr(C)]
pub struct JcOrientation {
    /// Quaternion [w, x, y, z].
    pub quaternion: [f32; 4],
    /// Euler angles [roll, pitch, yaw] in degrees.
    pub euler_deg: [f32; 3],
}

/// Analog state with normalized values.
#[repr(C)]
pub struct JcAnalog {
    pub raw: StickFrame,
    /// [left_x, left_y, right_x, right_y] in roughly [-1, 1].
    pub normalized: [f32; 4],
}

/// Create a session. `transport`: 0 = Bluetooth, 1 = USB.
/// Estimator settings come from `JOYCON_*` environment variables.
#[no_mangle]
pub extern "C" fn jc_session_new(id: u32, transport: c_int) -> *mut JcSession {
    let transport = match transport {
        0 => Transport::Bluetooth,
        _ => Transport::Usb,
    };
    let session = Session::new(id, transport, EstimatorConfig::from_env());
    Box::into_raw(Box::new(JcSession(session)))
}

/// Free a session.
///
/// # Safety
/// `session` must be a pointer returned by `jc_session_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn jc_session_free(session: *mut JcSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Feed one raw input report.
///
/// Returns a change mask (bit 0 buttons, bit 1 analog, bit 2 IMU), 0 when
/// nothing changed or the report id is not decoded, or -1 on a malformed
/// report (check jc_last_error()).
///
/// # Safety
/// `session` must be a valid session pointer or null; `data` must point to
/// `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn jc_session_feed(
    session: *mut JcSession,
    data: *const u8,
    len: usize,
) -> c_int {
    if session.is_null() || (data.is_null() && len > 0) {
        return -1;
    }
    let session = &mut *session;
    let bytes: &[u8] = if len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(data, len)
    };

    match session.0.handle_report(bytes) {
        Ok(events) => {
            LAST_ERROR.clear();
            ChangeSet::from_events(&events).mask() as c_int
        }
        Err(e) => {
            LAST_ERROR.set(&e);
            -1
        }
    }
}

/// Zero the published orientation at the current pose.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn jc_session_calibrate(session: *mut JcSession) {
    if let Some(session) = session.as_mut() {
        session.0.calibrate();
    }
}

/// Write the published orientation. Returns 0 on success, -1 on null input.
///
/// # Safety
/// `session` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn jc_session_orientation(
    session: *const JcSession,
    out: *mut JcOrientation,
) -> c_int {
    if session.is_null() || out.is_null() {
        return -1;
    }
    let q = (*session).0.orientation();
    out.write(JcOrientation {
        quaternion: q.to_array(),
        euler_deg: q.to_euler_deg(),
    });
    0
}

/// Write the last decoded button state. Returns -1 if nothing was decoded yet.
///
/// # Safety
/// `session` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn jc_session_buttons(
    session: *const JcSession,
    out: *mut ButtonState,
) -> c_int {
    if session.is_null() || out.is_null() {
        return -1;
    }
    match (*session).0.buttons() {
        Some(frame) => {
            out.write(frame.state());
            0
        }
        None => -1,
    }
}

/// Write the last decoded stick state. Returns -1 if nothing was decoded yet.
///
/// # Safety
/// `session` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn jc_session_analog(
    session: *const JcSession,
    out: *mut JcAnalog,
) -> c_int {
    if session.is_null() || out.is_null() {
        return -1;
    }
    match (*session).0.sticks() {
        Some(sticks) => {
            out.write(JcAnalog {
                raw: *sticks,
                normalized: sticks.normalized(),
            });
            0
        }
        None => -1,
    }
}

/// Map a raw stick value to roughly [-1, 1].
#[no_mangle]
pub extern "C" fn jc_normalize_stick(raw: u16, stick_max: u16) -> f32 {
    protocol::normalize_stick(raw, stick_max)
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next joycon-motion API call.
#[no_mangle]
pub extern "C" fn jc_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}
