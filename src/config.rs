use crate::types::ReportMode;
use std::time::Duration;

/// Tuning for [`OrientationEstimator`](crate::OrientationEstimator).
///
/// Defaults are tuned for a Joy-Con pushing full reports at ~60 Hz.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorConfig {
    /// Integration step in seconds. Fixed, not measured from report arrival.
    pub dt: f32,
    /// Madgwick gain.
    pub beta: f32,
    /// Raw gyro units to rad/s.
    pub gyro_scale: f32,
    /// Gyro magnitude (rad/s) below which the controller may be still.
    pub gyro_still_threshold: f32,
    /// Allowed `| |accel unit| - 1 |` while still.
    pub accel_still_threshold: f32,
    /// Bias learning rate while still.
    pub bias_alpha: f32,
    /// Fraction of yaw rate removed while still.
    pub yaw_damping: f32,
    pub enable_yaw_damping: bool,
    /// Gain on `accel x gravity_reference` added to the rate while still.
    pub gravity_correction_strength: f32,
    pub enable_gravity_correction: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            beta: 0.10,
            gyro_scale: (std::f32::consts::PI / 180.0) * 0.08,
            gyro_still_threshold: 0.01,
            accel_still_threshold: 0.02,
            bias_alpha: 0.01,
            yaw_damping: 0.1,
            enable_yaw_damping: true,
            gravity_correction_strength: 0.05,
            enable_gravity_correction: true,
        }
    }
}

impl EstimatorConfig {
    /// Defaults overridden by `JOYCON_*` environment variables.
    ///
    /// `JOYCON_RATE_HZ` sets `dt = 1 / rate`. Gains (`BETA`, `BIAS_ALPHA`,
    /// `YAW_DAMPING`, `GRAVITY_CORRECTION`) accept zero to switch them off.
    /// Unparseable values, negative gains and other non-positive values are
    /// ignored.
    pub fn from_env() -> Self {
        let d = Self::default();
        let rate_hz = read_env_f32("JOYCON_RATE_HZ", 1.0 / d.dt);
        Self {
            dt: 1.0 / rate_hz,
            beta: read_env_gain("JOYCON_BETA", d.beta),
            gyro_scale: read_env_f32("JOYCON_GYRO_SCALE", d.gyro_scale),
            gyro_still_threshold: read_env_f32("JOYCON_GYRO_STILL", d.gyro_still_threshold),
            accel_still_threshold: read_env_f32("JOYCON_ACCEL_STILL", d.accel_still_threshold),
            bias_alpha: read_env_gain("JOYCON_BIAS_ALPHA", d.bias_alpha),
            yaw_damping: read_env_gain("JOYCON_YAW_DAMPING", d.yaw_damping),
            enable_yaw_damping: read_env_bool("JOYCON_ENABLE_YAW_DAMPING", d.enable_yaw_damping),
            gravity_correction_strength: read_env_gain(
                "JOYCON_GRAVITY_CORRECTION",
                d.gravity_correction_strength,
            ),
            enable_gravity_correction: read_env_bool(
                "JOYCON_ENABLE_GRAVITY_CORRECTION",
                d.enable_gravity_correction,
            ),
        }
    }
}

/// Settings for a background [`ControllerStream`](crate::ControllerStream).
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfig {
    /// Read timeout between checks of the stop flag and command queue.
    pub poll_timeout: Duration,
    /// Capacity of the event channel. Events are dropped when it is full.
    pub event_capacity: usize,
    /// Report layout requested from the controller on start.
    pub report_mode: ReportMode,
    /// Send the IMU enable subcommand on start.
    pub enable_imu: bool,
    /// Player LED pattern set on start, if any.
    pub player_lights: Option<u8>,
    /// Send the vibration enable subcommand on start.
    pub enable_vibration: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(100),
            event_capacity: 256,
            report_mode: ReportMode::Full,
            enable_imu: true,
            player_lights: Some(0x01),
            enable_vibration: false,
        }
    }
}

impl StreamConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let report_mode = match read_env_string("JOYCON_REPORT_MODE", "full").as_str() {
            "simple" => ReportMode::Simple,
            "full" => ReportMode::Full,
            other => {
                log::warn!(
                    "Unknown JOYCON_REPORT_MODE='{}', using full (supported: full|simple)",
                    other
                );
                ReportMode::Full
            }
        };
        let lights = read_env_u8("JOYCON_PLAYER_LIGHTS", d.player_lights.unwrap_or(0));
        Self {
            poll_timeout: Duration::from_millis(read_env_u64(
                "JOYCON_POLL_MS",
                d.poll_timeout.as_millis() as u64,
            )),
            event_capacity: read_env_u64("JOYCON_EVENT_CAPACITY", d.event_capacity as u64)
                .max(1) as usize,
            report_mode,
            enable_imu: read_env_bool("JOYCON_ENABLE_IMU", d.enable_imu),
            player_lights: (lights != 0).then_some(lights),
            enable_vibration: read_env_bool("JOYCON_ENABLE_VIBRATION", d.enable_vibration),
        }
    }
}

fn read_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| {
            let v = v.trim().to_ascii_lowercase();
            match v.as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            }
        })
        .unwrap_or(default)
}

fn read_env_u8(name: &str, default: u8) -> u8 {
    std::env::var(name)
        .ok()
        .and_then(|v| {
            let v = v.trim();
            match v.strip_prefix("0x") {
                Some(hex) => u8::from_str_radix(hex, 16).ok(),
                None => v.parse::<u8>().ok(),
            }
        })
        .unwrap_or(default)
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn read_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}

/// Like `read_env_f32` but accepts zero, which switches a gain off.
fn read_env_gain(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(default)
}

fn read_env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimator_defaults() {
        let c = EstimatorConfig::default();
        assert!((c.dt - 1.0 / 60.0).abs() < 1e-9);
        assert!((c.gyro_scale - 0.001_396_263).abs() < 1e-8);
        assert_eq!(c.beta, 0.10);
        assert!(c.enable_yaw_damping && c.enable_gravity_correction);
    }

    #[test]
    fn test_env_overrides() {
        // Unique names so parallel tests do not race on the environment.
        std::env::set_var("JOYCON_TEST_F32", "0.25");
        std::env::set_var("JOYCON_TEST_F32_BAD", "-3");
        std::env::set_var("JOYCON_TEST_BOOL", "off");
        std::env::set_var("JOYCON_TEST_U8", "0x0f");
        assert_eq!(read_env_f32("JOYCON_TEST_F32", 1.0), 0.25);
        assert_eq!(read_env_f32("JOYCON_TEST_F32_BAD", 1.0), 1.0);
        assert!(!read_env_bool("JOYCON_TEST_BOOL", true));
        assert_eq!(read_env_u8("JOYCON_TEST_U8", 0), 0x0F);
        assert_eq!(read_env_u64("JOYCON_TEST_MISSING", 7), 7);
    }

    #[test]
    fn test_gains_accept_zero() {
        std::env::set_var("JOYCON_TEST_GAIN_ZERO", "0");
        std::env::set_var("JOYCON_TEST_GAIN_NEG", "-0.5");
        std::env::set_var("JOYCON_TEST_GAIN_NAN", "NaN");
        assert_eq!(read_env_gain("JOYCON_TEST_GAIN_ZERO", 0.1), 0.0);
        assert_eq!(read_env_gain("JOYCON_TEST_GAIN_NEG", 0.1), 0.1);
        assert_eq!(read_env_gain("JOYCON_TEST_GAIN_NAN", 0.1), 0.1);
        // Rates and scales still need a positive value.
        assert_eq!(read_env_f32("JOYCON_TEST_GAIN_ZERO", 60.0), 60.0);
        assert_eq!(read_env_string("JOYCON_TEST_MISSING", "full"), "full");
    }

    #[test]
    fn test_stream_defaults() {
        let c = StreamConfig::default();
        assert_eq!(c.report_mode, ReportMode::Full);
        assert!(c.enable_imu);
        assert_eq!(c.event_capacity, 256);
        assert!(!c.enable_vibration);
    }
}
