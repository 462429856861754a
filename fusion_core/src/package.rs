//! Raw sensor input.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result};

/// Which sensor produced a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    /// Range-bearing sensor: [rho, phi, rho_dot]
    Radar,
    /// Cartesian position sensor: [px, py]
    Laser,
}

impl SensorKind {
    /// Number of components in a raw measurement of this kind.
    pub fn measurement_dim(&self) -> usize {
        match self {
            SensorKind::Radar => 3,
            SensorKind::Laser => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SensorKind::Radar => "radar",
            SensorKind::Laser => "laser",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single timestamped measurement, consumed once by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPackage {
    /// Sensor that produced the reading
    pub sensor_kind: SensorKind,

    /// Raw reading, laid out as described on [`SensorKind`]
    pub raw_measurement: DVector<f64>,

    /// Capture time in microseconds
    pub timestamp: i64,
}

impl MeasurementPackage {
    pub fn new(sensor_kind: SensorKind, raw_measurement: DVector<f64>, timestamp: i64) -> Self {
        Self {
            sensor_kind,
            raw_measurement,
            timestamp,
        }
    }

    /// Laser fix at (px, py).
    pub fn laser(px: f64, py: f64, timestamp: i64) -> Self {
        Self::new(
            SensorKind::Laser,
            DVector::from_vec(vec![px, py]),
            timestamp,
        )
    }

    /// Radar return at range `rho`, bearing `phi` and range rate `rho_dot`.
    pub fn radar(rho: f64, phi: f64, rho_dot: f64, timestamp: i64) -> Self {
        Self::new(
            SensorKind::Radar,
            DVector::from_vec(vec![rho, phi, rho_dot]),
            timestamp,
        )
    }

    /// Checks dimension against the sensor kind and that every component is finite.
    pub fn validate(&self) -> Result<()> {
        let expected = self.sensor_kind.measurement_dim();
        if self.raw_measurement.len() != expected {
            return Err(FusionError::invalid(format!(
                "{} measurement must have {} components, got {}",
                self.sensor_kind,
                expected,
                self.raw_measurement.len()
            )));
        }
        FusionError::ensure_finite(
            &format!("{} measurement", self.sensor_kind),
            self.raw_measurement.iter(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_validate() {
        assert!(MeasurementPackage::laser(1.0, 2.0, 0).validate().is_ok());
        assert!(MeasurementPackage::radar(5.0, 0.3, -1.0, 10).validate().is_ok());
    }

    #[test]
    fn test_wrong_dimension_rejected() {
        let pkg = MeasurementPackage::new(SensorKind::Radar, DVector::from_vec(vec![1.0, 0.0]), 0);
        let err = pkg.validate().unwrap_err();
        assert_eq!(
            err,
            FusionError::invalid("radar measurement must have 3 components, got 2")
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let pkg = MeasurementPackage::laser(f64::INFINITY, 0.0, 0);
        assert!(matches!(pkg.validate(), Err(FusionError::InvalidInput(_))));
    }
}
