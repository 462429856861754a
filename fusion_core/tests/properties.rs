//! Property tests for the covariance invariants and the angle wrap.

use fusion_core::{
    normalize_angle, FusionConfig, FusionEkf, MeasurementPackage,
};
use nalgebra::DMatrix;
use proptest::prelude::*;
use std::f64::consts::{PI, TAU};

fn assert_symmetric_psd(p: &DMatrix<f64>) -> Result<(), TestCaseError> {
    let asymmetry = (p - p.transpose()).abs().max();
    prop_assert!(asymmetry < 1e-9, "asymmetry {}", asymmetry);

    let eigen = p.clone().symmetric_eigen().eigenvalues;
    let scale = eigen.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    for v in eigen.iter() {
        prop_assert!(*v >= -1e-9 * scale, "negative eigenvalue {} (scale {})", v, scale);
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct Step {
    radar: bool,
    dt_us: i64,
    noise: [f64; 3],
}

fn step() -> impl Strategy<Value = Step> {
    (any::<bool>(), 0i64..500_000, prop::array::uniform3(-1.0f64..1.0))
        .prop_map(|(radar, dt_us, noise)| Step { radar, dt_us, noise })
}

proptest! {
    #[test]
    fn covariance_stays_symmetric_psd(
        range in 1.0f64..60.0,
        bearing in -PI..PI,
        steps in prop::collection::vec(step(), 1..40),
    ) {
        let (px, py) = (range * bearing.cos(), range * bearing.sin());
        let mut ekf = FusionEkf::new(FusionConfig::default()).unwrap();
        ekf.process_measurement(&MeasurementPackage::laser(px, py, 0)).unwrap();
        assert_symmetric_psd(ekf.covariance())?;

        let mut ts = 0;
        for s in steps {
            ts += s.dt_us;
            let [a, b, c] = s.noise;
            let pkg = if s.radar {
                // Near ±π the noisy bearing lands on either side of the seam.
                MeasurementPackage::radar(range + a, normalize_angle(bearing + 0.05 * b), c, ts)
            } else {
                MeasurementPackage::laser(px + a, py + b, ts)
            };
            ekf.process_measurement(&pkg).unwrap();
            assert_symmetric_psd(ekf.covariance())?;
        }
    }

    #[test]
    fn normalized_angle_is_in_range(angle in -1.0e4f64..1.0e4) {
        let wrapped = normalize_angle(angle);
        prop_assert!(wrapped > -PI && wrapped <= PI);

        let turns = (angle - wrapped) / TAU;
        prop_assert!((turns - turns.round()).abs() < 1e-9);
    }
}
