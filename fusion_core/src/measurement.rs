//! Observation models for the two sensors.
//!
//! The laser observes position directly and is linear. The radar observes
//! the object in polar form,
//!
//! ```text
//! rho     = sqrt(px² + py²)
//! phi     = atan2(py, px)
//! rho_dot = (px·vx + py·vy) / rho
//! ```
//!
//! which the EKF linearizes through the analytic Jacobian at the current
//! estimate. Near the sensor origin every division by the range uses
//! `max(rho, range_epsilon)` instead, so the model never produces NaN/Inf.

use nalgebra::{DMatrix, DVector};
use std::f64::consts::{PI, TAU};

use crate::config::FusionConfig;
use crate::package::SensorKind;

/// Wraps an angle into (-π, π].
///
/// Non-finite input is returned unchanged.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let mut a = angle;
    if a.abs() > 2.0 * TAU {
        a = a.rem_euclid(TAU);
    }
    while a > PI {
        a -= TAU;
    }
    while a <= -PI {
        a += TAU;
    }
    a
}

/// Linear position sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct LaserModel {
    noise: DMatrix<f64>,
}

impl LaserModel {
    pub fn new(noise: DMatrix<f64>) -> Self {
        Self { noise }
    }

    fn predict_measurement(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_vec(vec![x[0], x[1]])
    }

    fn jacobian(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 4, &[
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        ])
    }
}

/// Range-bearing-range-rate sensor at the frame origin.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarModel {
    noise: DMatrix<f64>,
    range_epsilon: f64,
}

impl RadarModel {
    /// Index of the bearing inside a radar measurement.
    pub const BEARING: usize = 1;

    pub fn new(noise: DMatrix<f64>, range_epsilon: f64) -> Self {
        Self {
            noise,
            range_epsilon,
        }
    }

    fn predict_measurement(&self, x: &DVector<f64>) -> DVector<f64> {
        let (px, py, vx, vy) = (x[0], x[1], x[2], x[3]);
        let rho = px.hypot(py);
        let phi = py.atan2(px);
        let rho_dot = (px * vx + py * vy) / rho.max(self.range_epsilon);
        DVector::from_vec(vec![rho, phi, rho_dot])
    }

    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let (px, py, vx, vy) = (x[0], x[1], x[2], x[3]);

        let c1 = (px * px + py * py).max(self.range_epsilon * self.range_epsilon);
        let c2 = c1.sqrt();
        let c3 = c1 * c2;

        DMatrix::from_row_slice(3, 4, &[
            px / c2, py / c2, 0.0, 0.0,
            -py / c1, px / c1, 0.0, 0.0,
            py * (vx * py - vy * px) / c3, px * (vy * px - vx * py) / c3, px / c2, py / c2,
        ])
    }
}

/// A sensor's observation model, selected by [`SensorKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementModel {
    Laser(LaserModel),
    Radar(RadarModel),
}

impl MeasurementModel {
    /// Laser model with R_laser from the config.
    pub fn laser(config: &FusionConfig) -> Self {
        Self::Laser(LaserModel::new(config.laser_noise_covariance()))
    }

    /// Radar model with R_radar and the range floor from the config.
    pub fn radar(config: &FusionConfig) -> Self {
        Self::Radar(RadarModel::new(
            config.radar_noise_covariance(),
            config.range_epsilon,
        ))
    }

    pub fn sensor_kind(&self) -> SensorKind {
        match self {
            Self::Laser(_) => SensorKind::Laser,
            Self::Radar(_) => SensorKind::Radar,
        }
    }

    /// Dimension of the measurement space.
    pub fn measurement_dim(&self) -> usize {
        self.sensor_kind().measurement_dim()
    }

    /// Predicted measurement h(x).
    pub fn predict_measurement(&self, x: &DVector<f64>) -> DVector<f64> {
        match self {
            Self::Laser(m) => m.predict_measurement(x),
            Self::Radar(m) => m.predict_measurement(x),
        }
    }

    /// Linearization H of h at `x`.
    pub fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        match self {
            Self::Laser(m) => m.jacobian(),
            Self::Radar(m) => m.jacobian(x),
        }
    }

    /// Measurement noise covariance R.
    pub fn noise_covariance(&self) -> &DMatrix<f64> {
        match self {
            Self::Laser(m) => &m.noise,
            Self::Radar(m) => &m.noise,
        }
    }

    /// Innovation y = z - ẑ with the bearing wrapped into (-π, π].
    pub fn residual(&self, z: &DVector<f64>, z_pred: &DVector<f64>) -> DVector<f64> {
        let mut y = z - z_pred;
        if let Self::Radar(_) = self {
            y[RadarModel::BEARING] = normalize_angle(y[RadarModel::BEARING]);
        }
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn radar() -> MeasurementModel {
        MeasurementModel::radar(&FusionConfig::default())
    }

    #[test]
    fn test_normalize_angle() {
        assert_relative_eq!(normalize_angle(0.5), 0.5);
        assert_relative_eq!(normalize_angle(PI), PI);
        assert_relative_eq!(normalize_angle(-PI), PI);
        assert_relative_eq!(normalize_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(-7.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(normalize_angle(1.0e6), 1.0e6_f64.sin().atan2(1.0e6_f64.cos()), epsilon = 1e-6);
        assert!(normalize_angle(f64::NAN).is_nan());
    }

    #[test]
    fn test_bearing_residual_wraps_across_seam() {
        let model = radar();
        let z = DVector::from_vec(vec![10.0, 3.0, 0.0]);
        let z_pred = DVector::from_vec(vec![10.0, -3.0, 0.0]);
        let y = model.residual(&z, &z_pred);
        assert_abs_diff_eq!(y[1], 6.0 - TAU, epsilon = 1e-12);
        assert_abs_diff_eq!(y[1].abs(), TAU - 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_laser_residual_is_plain_difference() {
        let model = MeasurementModel::laser(&FusionConfig::default());
        let y = model.residual(
            &DVector::from_vec(vec![4.0, 4.0]),
            &DVector::from_vec(vec![-3.0, 0.0]),
        );
        assert_relative_eq!(y[0], 7.0);
        assert_relative_eq!(y[1], 4.0);
    }

    #[test]
    fn test_radar_prediction() {
        let x = DVector::from_vec(vec![3.0, 4.0, 1.0, 2.0]);
        let z = radar().predict_measurement(&x);
        assert_relative_eq!(z[0], 5.0);
        assert_relative_eq!(z[1], 4.0_f64.atan2(3.0));
        assert_relative_eq!(z[2], (3.0 + 8.0) / 5.0);
    }

    #[test]
    fn test_radar_at_origin_stays_finite() {
        let model = radar();
        let x = DVector::from_vec(vec![0.0, 0.0, 1.0, 1.0]);
        assert!(model.predict_measurement(&x).iter().all(|v| v.is_finite()));
        assert!(model.jacobian(&x).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_laser_jacobian_selects_position() {
        let model = MeasurementModel::laser(&FusionConfig::default());
        let h = model.jacobian(&DVector::zeros(4));
        assert_eq!(h.shape(), (2, 4));
        assert_eq!(h[(0, 0)], 1.0);
        assert_eq!(h[(1, 1)], 1.0);
        assert_eq!(h.sum(), 2.0);
        assert_eq!(model.noise_covariance().shape(), (2, 2));
    }
}
