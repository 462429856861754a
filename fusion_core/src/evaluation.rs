//! Evaluation Module - Estimator Accuracy and Consistency
//! ======================================================
//!
//! Tools for scoring the fusion output against ground truth:
//! - **RMSE**: per-component root mean square error (batch and streaming)
//! - **NIS**: fraction of updates whose normalized innovation squared exceeds
//!   the 95% χ² bound, per sensor
//! - **Entropy**: differential entropy of a covariance (uncertainty health)

use nalgebra::{DMatrix, DVector};
use std::f64::consts::{E, PI};

use crate::error::{FusionError, Result};
use crate::package::SensorKind;

// =============================================================================
// RMSE
// =============================================================================

/// Per-component RMSE between estimates and ground truth.
///
/// Both slices must be non-empty, of equal length, and hold vectors of one
/// common dimension.
pub fn calculate_rmse(
    estimations: &[DVector<f64>],
    ground_truth: &[DVector<f64>],
) -> Result<DVector<f64>> {
    if estimations.is_empty() {
        return Err(FusionError::invalid("no estimations to evaluate"));
    }
    if estimations.len() != ground_truth.len() {
        return Err(FusionError::invalid(format!(
            "{} estimations but {} ground truth entries",
            estimations.len(),
            ground_truth.len()
        )));
    }

    let mut acc = RmseAccumulator::new(estimations[0].len());
    for (est, truth) in estimations.iter().zip(ground_truth) {
        acc.push(est, truth)?;
    }
    acc.rmse()
}

/// Streaming RMSE, one (estimate, truth) pair at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct RmseAccumulator {
    squared_error_sum: DVector<f64>,
    count: usize,
}

impl RmseAccumulator {
    pub fn new(dim: usize) -> Self {
        Self {
            squared_error_sum: DVector::zeros(dim),
            count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Adds one pair. Both vectors must match the accumulator dimension.
    pub fn push(&mut self, estimate: &DVector<f64>, truth: &DVector<f64>) -> Result<()> {
        let dim = self.squared_error_sum.len();
        if estimate.len() != dim || truth.len() != dim {
            return Err(FusionError::invalid(format!(
                "expected {dim}-dimensional vectors, got {} and {}",
                estimate.len(),
                truth.len()
            )));
        }
        let residual = estimate - truth;
        self.squared_error_sum += residual.component_mul(&residual);
        self.count += 1;
        Ok(())
    }

    /// RMSE of everything pushed so far.
    pub fn rmse(&self) -> Result<DVector<f64>> {
        if self.count == 0 {
            return Err(FusionError::invalid("no samples accumulated"));
        }
        Ok((&self.squared_error_sum / self.count as f64).map(f64::sqrt))
    }
}

// =============================================================================
// NIS CONSISTENCY
// =============================================================================

/// 95% χ² bound for 2 degrees of freedom (laser).
pub const CHI2_95_2DOF: f64 = 5.991;

/// 95% χ² bound for 3 degrees of freedom (radar).
pub const CHI2_95_3DOF: f64 = 7.815;

/// Counts NIS samples above the 95% bound for each sensor.
///
/// A consistent filter exceeds the bound on roughly 5% of updates; much more
/// means it is overconfident, much less that it is too conservative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NisMonitor {
    laser: NisCounts,
    radar: NisCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct NisCounts {
    total: usize,
    exceeded: usize,
}

impl NisMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threshold(sensor: SensorKind) -> f64 {
        match sensor {
            SensorKind::Laser => CHI2_95_2DOF,
            SensorKind::Radar => CHI2_95_3DOF,
        }
    }

    pub fn record(&mut self, sensor: SensorKind, nis: f64) {
        let counts = match sensor {
            SensorKind::Laser => &mut self.laser,
            SensorKind::Radar => &mut self.radar,
        };
        counts.total += 1;
        if nis > Self::threshold(sensor) {
            counts.exceeded += 1;
        }
    }

    /// Number of recorded samples for `sensor`.
    pub fn samples(&self, sensor: SensorKind) -> usize {
        match sensor {
            SensorKind::Laser => self.laser.total,
            SensorKind::Radar => self.radar.total,
        }
    }

    /// Fraction of samples above the bound, `None` before the first sample.
    pub fn exceed_fraction(&self, sensor: SensorKind) -> Option<f64> {
        let counts = match sensor {
            SensorKind::Laser => self.laser,
            SensorKind::Radar => self.radar,
        };
        (counts.total > 0).then(|| counts.exceeded as f64 / counts.total as f64)
    }
}

// =============================================================================
// ENTROPY
// =============================================================================

/// Differential entropy of a Gaussian with covariance `p` (nats).
///
/// # Formula
/// ```text
/// H = 0.5 * (d * ln(2πe) + ln(det P))
/// ```
///
/// Returns `f64::INFINITY` when `p` is not positive definite.
pub fn covariance_entropy(p: &DMatrix<f64>) -> f64 {
    let d = p.nrows() as f64;
    let det = p.determinant();
    if det.is_nan() || det <= 0.0 {
        return f64::INFINITY;
    }
    0.5 * (d * (2.0 * PI * E).ln() + det.ln())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rmse() {
        let est = vec![
            DVector::from_vec(vec![1.0, 1.0]),
            DVector::from_vec(vec![2.0, 2.0]),
        ];
        let truth = vec![
            DVector::from_vec(vec![2.0, 1.0]),
            DVector::from_vec(vec![3.0, 2.0]),
        ];
        let rmse = calculate_rmse(&est, &truth).unwrap();
        assert_relative_eq!(rmse[0], 1.0);
        assert_relative_eq!(rmse[1], 0.0);
    }

    #[test]
    fn test_rmse_rejects_mismatched_input() {
        let one = vec![DVector::from_vec(vec![1.0, 1.0])];
        assert!(calculate_rmse(&[], &[]).is_err());
        assert!(calculate_rmse(&one, &[]).is_err());
        assert!(calculate_rmse(&one, &[DVector::from_vec(vec![1.0])]).is_err());
    }

    #[test]
    fn test_accumulator_streams() {
        let mut acc = RmseAccumulator::new(1);
        assert!(acc.rmse().is_err());
        acc.push(&DVector::from_vec(vec![3.0]), &DVector::from_vec(vec![0.0])).unwrap();
        acc.push(&DVector::from_vec(vec![0.0]), &DVector::from_vec(vec![4.0])).unwrap();
        assert_eq!(acc.count(), 2);
        assert_relative_eq!(acc.rmse().unwrap()[0], (12.5_f64).sqrt());
    }

    #[test]
    fn test_nis_monitor() {
        let mut monitor = NisMonitor::new();
        assert_eq!(monitor.exceed_fraction(SensorKind::Radar), None);

        monitor.record(SensorKind::Radar, 1.0);
        monitor.record(SensorKind::Radar, 9.0);
        monitor.record(SensorKind::Laser, 6.5);

        assert_eq!(monitor.samples(SensorKind::Radar), 2);
        assert_relative_eq!(monitor.exceed_fraction(SensorKind::Radar).unwrap(), 0.5);
        assert_relative_eq!(monitor.exceed_fraction(SensorKind::Laser).unwrap(), 1.0);
    }

    #[test]
    fn test_entropy_decreases_with_certainty() {
        let wide = DMatrix::<f64>::identity(4, 4) * 10.0;
        let tight = DMatrix::<f64>::identity(4, 4);
        assert!(covariance_entropy(&tight) < covariance_entropy(&wide));
        assert_eq!(covariance_entropy(&DMatrix::zeros(4, 4)), f64::INFINITY);
    }
}
