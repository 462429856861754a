//! Filter configuration.
//!
//! Every tuning constant of the tracker lives here and is handed to
//! [`FusionEkf::new`](crate::FusionEkf::new) at construction time. The
//! defaults are the values the filter was tuned with.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};
use crate::STATE_DIM;

/// Conversion factor from package timestamps (µs) to seconds.
pub const MICROSECONDS_TO_SECONDS: f64 = 1.0e-6;

/// How the covariance is corrected in the update step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CovarianceUpdate {
    /// P = (I - KH)P(I - KH)^T + KRK^T, stays PSD under rounding.
    #[default]
    Joseph,
    /// P = (I - KH)P
    Standard,
}

/// Configuration for the fusion EKF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Initial variance of px and py (default: 1.0 m²)
    pub initial_position_variance: f64,

    /// Initial variance of vx and vy (default: 1000.0 m²/s²)
    pub initial_velocity_variance: f64,

    /// Process acceleration noise variance along x (default: 9.0 m²/s⁴)
    pub noise_ax: f64,

    /// Process acceleration noise variance along y (default: 9.0 m²/s⁴)
    pub noise_ay: f64,

    /// Laser noise variances [px, py] (default: 0.15 m std dev)
    pub laser_noise: [f64; 2],

    /// Radar noise variances [rho, phi, rho_dot]
    pub radar_noise: [f64; 3],

    /// Floor applied to the radar range before dividing by it (default: 1e-5 m)
    pub range_epsilon: f64,

    /// First diagonal load tried when S fails to factorize (default: 1e-9)
    pub innovation_regularization: f64,

    /// Covariance correction form (default: Joseph)
    pub covariance_update: CovarianceUpdate,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            initial_position_variance: 1.0,
            initial_velocity_variance: 1000.0,
            noise_ax: 9.0,
            noise_ay: 9.0,
            laser_noise: [0.0225, 0.0225],
            radar_noise: [0.09, 0.0009, 0.09],
            range_epsilon: 1.0e-5,
            innovation_regularization: 1.0e-9,
            covariance_update: CovarianceUpdate::Joseph,
        }
    }
}

impl FusionConfig {
    /// Checks that every variance is finite and strictly positive.
    pub fn validate(&self) -> Result<()> {
        let scalars = [
            ("initial_position_variance", self.initial_position_variance),
            ("initial_velocity_variance", self.initial_velocity_variance),
            ("range_epsilon", self.range_epsilon),
            ("innovation_regularization", self.innovation_regularization),
        ];
        for (name, value) in scalars {
            check_positive(name, value)?;
        }

        // Zero acceleration noise is a legitimate (if brittle) choice.
        for (name, value) in [("noise_ax", self.noise_ax), ("noise_ay", self.noise_ay)] {
            if !value.is_finite() || value < 0.0 {
                return Err(FusionError::invalid(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        for value in self.laser_noise {
            check_positive("laser_noise", value)?;
        }
        for value in self.radar_noise {
            check_positive("radar_noise", value)?;
        }
        Ok(())
    }

    /// Initial state covariance P0 = diag(pos, pos, vel, vel).
    pub fn initial_covariance(&self) -> DMatrix<f64> {
        let p = self.initial_position_variance;
        let v = self.initial_velocity_variance;
        let diag = DVector::from_vec(vec![p, p, v, v]);
        debug_assert_eq!(diag.len(), STATE_DIM);
        DMatrix::from_diagonal(&diag)
    }

    /// Laser measurement noise R_laser.
    pub fn laser_noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_row_slice(&self.laser_noise))
    }

    /// Radar measurement noise R_radar.
    pub fn radar_noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_row_slice(&self.radar_noise))
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FusionError::invalid(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid() {
        assert!(FusionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_initial_covariance_layout() {
        let p0 = FusionConfig::default().initial_covariance();
        assert_eq!(p0.shape(), (4, 4));
        assert_relative_eq!(p0[(0, 0)], 1.0);
        assert_relative_eq!(p0[(1, 1)], 1.0);
        assert_relative_eq!(p0[(2, 2)], 1000.0);
        assert_relative_eq!(p0[(3, 3)], 1000.0);
        assert_relative_eq!(p0[(0, 2)], 0.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = FusionConfig {
            range_epsilon: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(FusionError::InvalidInput(_))));

        let config = FusionConfig {
            radar_noise: [0.09, f64::NAN, 0.09],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FusionConfig {
            noise_ax: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: FusionConfig =
            serde_json::from_str(r#"{ "noise_ax": 4.0, "covariance_update": "Standard" }"#).unwrap();
        assert_relative_eq!(config.noise_ax, 4.0);
        assert_relative_eq!(config.noise_ay, 9.0);
        assert_eq!(config.covariance_update, CovarianceUpdate::Standard);
    }
}
