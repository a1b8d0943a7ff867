//! # joycon-motion - Joy-Con input decoding and orientation
//!
//! Turns raw Joy-Con / Pro Controller HID input reports into de-duplicated
//! button, stick and IMU change events, and fuses the IMU samples into a
//! drift-corrected orientation. Provides:
//! - A bounds-checked decoder for simple (0x3F) and full (0x30) reports
//! - Per-controller sessions with change detection and a Madgwick AHRS
//! - hidapi device discovery and a background reader thread
//! - C FFI for hosts that own the HID transport themselves
//!
//! ## Quick Start
//! ```no_run
//! use joycon_motion::{Device, EstimatorConfig, SessionEvent, StreamConfig};
//! use std::time::Duration;
//!
//! let device = Device::open_first().unwrap();
//! let stream = device
//!     .start_stream(0, EstimatorConfig::default(), StreamConfig::default())
//!     .unwrap();
//! stream.calibrate().unwrap();
//! for _ in 0..100 {
//!     if let SessionEvent::OrientationChanged(q) =
//!         stream.recv_timeout(Duration::from_secs(1)).unwrap()
//!     {
//!         println!("euler: {:?}", q.to_euler_deg());
//!     }
//! }
//! ```
//!
//! Without hardware, feed reports to a [`Session`] directly:
//! ```
//! use joycon_motion::{EstimatorConfig, Session, Transport};
//!
//! let mut session = Session::new(0, Transport::Bluetooth, EstimatorConfig::default());
//! let report = [0x3F, 0x08, 0x00, 0x08, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80];
//! let events = session.handle_report(&report).unwrap();
//! assert_eq!(events.len(), 2);
//! assert!(session.buttons().unwrap().state().x);
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod protocol;
pub mod orientation;
pub mod diff;
pub mod session;
pub mod hid;
pub mod device;
pub mod stream;
pub mod ffi;

pub use error::JoyconError;
pub use types::*;
pub use config::{EstimatorConfig, StreamConfig};
pub use protocol::{decode, normalize_stick};
pub use orientation::{OrientationEstimator, Quaternion};
pub use diff::{ChangeSet, StateDiffer};
pub use session::Session;
pub use device::{list_devices, Device};
pub use stream::{ControllerStream, StreamCommand};

/// Result type alias for joycon-motion operations.
pub type Result<T> = std::result::Result<T, JoyconError>;
