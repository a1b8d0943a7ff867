//! Drift-corrected orientation from raw Joy-Con IMU samples.
//!
//! A Madgwick gradient-descent AHRS (gyro + accelerometer, no magnetometer)
//! with three additions on top:
//! - gyro bias learned while the controller is still
//! - yaw damping and gravity-reference correction while still
//! - a calibration reference that the published orientation is relative to

use crate::config::EstimatorConfig;
use crate::types::ImuSample;

/// Unit quaternion, scalar first.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn norm(&self) -> f32 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Scale to unit length. A zero quaternion becomes the identity.
    pub fn normalized(&self) -> Self {
        let n = self.norm();
        if n <= f32::EPSILON || !n.is_finite() {
            return Self::IDENTITY;
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    pub fn inverse(&self) -> Self {
        let n2 = self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z;
        if n2 <= f32::EPSILON {
            return Self::IDENTITY;
        }
        let c = self.conjugate();
        Self::new(c.w / n2, c.x / n2, c.y / n2, c.z / n2)
    }

    /// Hamilton product `self * rhs`.
    pub fn mul(&self, rhs: &Quaternion) -> Self {
        let (a, b) = (self, rhs);
        Self::new(
            a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
            a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
        )
    }

    /// Rotation angle in radians, in [0, π].
    pub fn angle(&self) -> f32 {
        let q = self.normalized();
        2.0 * length([q.x, q.y, q.z]).atan2(q.w.abs())
    }

    /// `[roll, pitch, yaw]` in degrees (ZYX convention).
    pub fn to_euler_deg(&self) -> [f32; 3] {
        let Quaternion { w, x, y, z } = self.normalized();
        let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
        [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()]
    }

    /// `[w, x, y, z]`
    pub fn to_array(&self) -> [f32; 4] {
        [self.w, self.x, self.y, self.z]
    }
}

fn length(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Unit vector along `v`, or `None` when `|v|` is at or below `ACCEL_MIN_NORM`.
fn unit(v: [f32; 3]) -> Option<[f32; 3]> {
    let len = length(v);
    if len > ACCEL_MIN_NORM && len.is_finite() {
        Some([v[0] / len, v[1] / len, v[2] / len])
    } else {
        None
    }
}

const ACCEL_MIN_NORM: f32 = 1e-6;

/// Madgwick IMU update without magnetometer.
#[derive(Debug, Clone, Copy)]
struct Madgwick {
    q0: f32,
    q1: f32,
    q2: f32,
    q3: f32,
    beta: f32,
}

impl Madgwick {
    fn new(beta: f32) -> Self {
        Self {
            q0: 1.0,
            q1: 0.0,
            q2: 0.0,
            q3: 0.0,
            beta,
        }
    }

    /// `g` in rad/s, `a` a unit vector or zero for a gyro-only step.
    fn update(&mut self, g: [f32; 3], a: [f32; 3], dt: f32) {
        let (q0, q1, q2, q3) = (self.q0, self.q1, self.q2, self.q3);
        let [gx, gy, gz] = g;
        let [ax, ay, az] = a;

        // Rate of change from gyro
        let q_dot0 = 0.5 * (-q1 * gx - q2 * gy - q3 * gz);
        let q_dot1 = 0.5 * (q0 * gx + q2 * gz - q3 * gy);
        let q_dot2 = 0.5 * (q0 * gy - q1 * gz + q3 * gx);
        let q_dot3 = 0.5 * (q0 * gz + q1 * gy - q2 * gx);

        let (mut s0, mut s1, mut s2, mut s3) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);

        if ax * ax + ay * ay + az * az > 1e-12 {
            let _2q0 = 2.0 * q0;
            let _2q1 = 2.0 * q1;
            let _2q2 = 2.0 * q2;
            let _2q3 = 2.0 * q3;
            let _4q1 = 4.0 * q1;
            let _4q2 = 4.0 * q2;

            // Objective: estimated gravity minus measured direction
            let f1 = _2q1 * q3 - _2q0 * q2 - ax;
            let f2 = _2q0 * q1 + _2q2 * q3 - ay;
            let f3 = 1.0 - _2q1 * q1 - _2q2 * q2 - az;

            s0 = -_2q2 * f1 + _2q1 * f2;
            s1 = _2q3 * f1 + _2q0 * f2 - _4q1 * f3;
            s2 = -_2q0 * f1 + _2q3 * f2 - _4q2 * f3;
            s3 = _2q1 * f1 + _2q2 * f2;

            let norm_s = (s0 * s0 + s1 * s1 + s2 * s2 + s3 * s3).sqrt();
            if norm_s > 1e-12 {
                s0 /= norm_s;
                s1 /= norm_s;
                s2 /= norm_s;
                s3 /= norm_s;
            } else {
                (s0, s1, s2, s3) = (0.0, 0.0, 0.0, 0.0);
            }
        }

        let next = Quaternion::new(
            q0 + (q_dot0 - self.beta * s0) * dt,
            q1 + (q_dot1 - self.beta * s1) * dt,
            q2 + (q_dot2 - self.beta * s2) * dt,
            q3 + (q_dot3 - self.beta * s3) * dt,
        );
        self.set(next.normalized());
    }

    fn set(&mut self, q: Quaternion) {
        self.q0 = q.w;
        self.q1 = q.x;
        self.q2 = q.y;
        self.q3 = q.z;
    }

    fn quaternion(&self) -> Quaternion {
        Quaternion::new(self.q0, self.q1, self.q2, self.q3)
    }
}

/// Per-session orientation filter.
///
/// Every [`update`](Self::update) integrates one sample, so samples must be
/// fed in order, one at a time. The published orientation is relative to the
/// reference captured by the last [`calibrate`](Self::calibrate).
#[derive(Debug, Clone)]
pub struct OrientationEstimator {
    config: EstimatorConfig,
    filter: Madgwick,
    gyro_bias: [f32; 3],
    gravity_reference: [f32; 3],
    reference: Option<Quaternion>,
    published: Quaternion,
    last_sample: Option<ImuSample>,
    still: bool,
}

impl Default for OrientationEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl OrientationEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            filter: Madgwick::new(config.beta),
            config,
            gyro_bias: [0.0; 3],
            gravity_reference: [0.0, 0.0, 1.0],
            reference: None,
            published: Quaternion::IDENTITY,
            last_sample: None,
            still: false,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Integrate one sample over the configured fixed timestep.
    pub fn update(&mut self, sample: &ImuSample) -> Quaternion {
        self.update_with_dt(sample, self.config.dt)
    }

    /// Integrate one sample over `dt` seconds and return the published orientation.
    pub fn update_with_dt(&mut self, sample: &ImuSample, dt: f32) -> Quaternion {
        self.last_sample = Some(*sample);
        let cfg = &self.config;

        // Sensor axes to filter axes
        let g = [
            -(sample.gyro_yaw as f32) * cfg.gyro_scale,
            sample.gyro_pitch as f32 * cfg.gyro_scale,
            sample.gyro_roll as f32 * cfg.gyro_scale,
        ];

        // Degenerate accel leaves a zero vector: not still, gyro-only step.
        let a = unit(sample.accel()).unwrap_or([0.0; 3]);

        let accel_norm_delta = (length(a) - 1.0).abs();
        let still = length(g) < cfg.gyro_still_threshold
            && accel_norm_delta < cfg.accel_still_threshold;

        if still {
            for (b, gi) in self.gyro_bias.iter_mut().zip(g) {
                *b += cfg.bias_alpha * (gi - *b);
            }
        }

        let mut rate = [
            g[0] - self.gyro_bias[0],
            g[1] - self.gyro_bias[1],
            g[2] - self.gyro_bias[2],
        ];

        if still {
            if cfg.enable_yaw_damping {
                rate[2] *= 1.0 - cfg.yaw_damping;
            }
            if cfg.enable_gravity_correction {
                let correction = cross(a, self.gravity_reference);
                for (r, c) in rate.iter_mut().zip(correction) {
                    *r += c * cfg.gravity_correction_strength;
                }
            }
        }

        self.still = still;
        self.filter.beta = cfg.beta;
        self.filter.update(rate, a, dt);
        self.publish()
    }

    /// Make the current raw orientation the zero point and forget the learned bias.
    pub fn calibrate(&mut self) -> Quaternion {
        self.gyro_bias = [0.0; 3];
        self.reference = Some(self.filter.quaternion());

        if let Some(a) = self.last_sample.and_then(|s| unit(s.accel())) {
            self.gravity_reference = a;
        }

        log::info!(
            "Orientation calibrated: reference={:?} gravity={:?}",
            self.reference,
            self.gravity_reference
        );
        self.publish()
    }

    fn publish(&mut self) -> Quaternion {
        let raw = self.filter.quaternion();
        self.published = match &self.reference {
            Some(reference) => reference.inverse().mul(&raw).normalized(),
            None => raw,
        };
        self.published
    }

    /// Calibration-relative orientation.
    pub fn orientation(&self) -> Quaternion {
        self.published
    }

    /// Absolute filter orientation.
    pub fn raw_orientation(&self) -> Quaternion {
        self.filter.quaternion()
    }

    /// Learned gyro bias in rad/s, filter axes.
    pub fn gyro_bias(&self) -> [f32; 3] {
        self.gyro_bias
    }

    pub fn gravity_reference(&self) -> [f32; 3] {
        self.gravity_reference
    }

    pub fn reference(&self) -> Option<Quaternion> {
        self.reference
    }

    pub fn is_calibrated(&self) -> bool {
        self.reference.is_some()
    }

    /// Whether the last sample was classified as still.
    pub fn is_still(&self) -> bool {
        self.still
    }

    pub fn last_sample(&self) -> Option<ImuSample> {
        self.last_sample
    }
}
