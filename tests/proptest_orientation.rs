//! Property-based tests for the orientation estimator.

use joycon_motion::{EstimatorConfig, ImuSample, OrientationEstimator};
use proptest::prelude::*;

fn arb_sample() -> impl Strategy<Value = ImuSample> {
    let axis = || i16::MIN as i32..=i16::MAX as i32;
    (axis(), axis(), axis(), axis(), axis(), axis()).prop_map(
        |(gyro_pitch, gyro_yaw, gyro_roll, accel_x, accel_y, accel_z)| ImuSample {
            gyro_pitch,
            gyro_yaw,
            gyro_roll,
            accel_x,
            accel_y,
            accel_z,
        },
    )
}

/// A non-zero accelerometer reading.
fn arb_gravity() -> impl Strategy<Value = [i32; 3]> {
    any::<[i16; 3]>()
        .prop_filter("zero accel", |a| a.iter().any(|v| *v != 0))
        .prop_map(|a| a.map(i32::from))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The published and raw orientations stay unit quaternions.
    #[test]
    fn prop_orientation_stays_unit(samples in proptest::collection::vec(arb_sample(), 1..200)) {
        let mut estimator = OrientationEstimator::new(EstimatorConfig::default());
        for sample in &samples {
            let q = estimator.update(sample);
            prop_assert!(q.w.is_finite() && q.x.is_finite() && q.y.is_finite() && q.z.is_finite());
            prop_assert!((q.norm() - 1.0).abs() < 1e-4, "norm {}", q.norm());
            prop_assert!((estimator.raw_orientation().norm() - 1.0).abs() < 1e-4);
        }
    }

    /// Calibrating anywhere zeroes the published orientation.
    #[test]
    fn prop_calibrate_zeroes(samples in proptest::collection::vec(arb_sample(), 1..100)) {
        let mut estimator = OrientationEstimator::new(EstimatorConfig::default());
        for sample in &samples {
            estimator.update(sample);
        }
        let q = estimator.calibrate();
        prop_assert!(q.angle() < 1e-3, "angle after calibrate {}", q.angle());
        prop_assert_eq!(estimator.gyro_bias(), [0.0; 3]);
        prop_assert!(estimator.is_calibrated());
    }

    /// A small constant gyro offset held still is learned as bias.
    #[test]
    fn prop_bias_converges_when_still(
        offset in any::<[i8; 3]>().prop_map(|o| o.map(|v| i32::from(v.clamp(-4, 4)))),
        accel in arb_gravity(),
    ) {
        let config = EstimatorConfig::default();
        let scale = config.gyro_scale;
        let mut estimator = OrientationEstimator::new(config);
        let sample = ImuSample {
            gyro_pitch: offset[0],
            gyro_yaw: offset[1],
            gyro_roll: offset[2],
            accel_x: accel[0],
            accel_y: accel[1],
            accel_z: accel[2],
        };
        for _ in 0..400 {
            estimator.update(&sample);
        }
        prop_assert!(estimator.is_still());

        // Filter axes: [-yaw, pitch, roll].
        let expected = [
            -(offset[1] as f32) * scale,
            offset[0] as f32 * scale,
            offset[2] as f32 * scale,
        ];
        for (learned, want) in estimator.gyro_bias().iter().zip(expected) {
            prop_assert!((learned - want).abs() < 1e-3, "bias {learned} want {want}");
        }
    }
}
