use std::fmt;

/// Errors that can occur while talking to a controller or decoding its reports.
#[derive(Debug, thiserror::Error)]
pub enum JoyconError {
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("No Nintendo controller found (VID=057E)")]
    DeviceNotFound,

    #[error("HID command failed: {0}")]
    HidCommand(String),

    /// The buffer is too short for the layout its report id declares.
    /// An empty buffer reports id 0x00 and length 0.
    #[error("Malformed report 0x{report_id:02x}: {len} bytes, need at least {min}")]
    MalformedReport {
        report_id: u8,
        len: usize,
        min: usize,
    },

    #[error("Controller stream stopped")]
    StreamStopped,

    #[error("Timeout waiting for data")]
    Timeout,

    #[error("Channel disconnected")]
    ChannelDisconnected,
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &JoyconError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut msg) = self.message.lock() {
            msg.clear();
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_report_message() {
        let err = JoyconError::MalformedReport {
            report_id: 0x30,
            len: 12,
            min: 25,
        };
        assert_eq!(
            err.to_string(),
            "Malformed report 0x30: 12 bytes, need at least 25"
        );
    }

    #[test]
    fn test_last_error_roundtrip() {
        let store = LastError::new();
        assert!(store.as_ptr().is_null());

        store.set(&JoyconError::Timeout);
        let ptr = store.as_ptr();
        assert!(!ptr.is_null());
        let msg = unsafe { std::ffi::CStr::from_ptr(ptr) };
        assert_eq!(msg.to_str().unwrap(), "Timeout waiting for data");

        store.clear();
        assert!(store.as_ptr().is_null());
    }
}
