//! The estimation engine - Extended Kalman Filter
//!
//! Owns the state estimate `x` and its covariance `P` and applies the two
//! canonical steps against a [`MotionModel`] and a [`MeasurementModel`].
//! Sequencing (which step, when, with which sensor) lives in
//! [`FusionEkf`](crate::FusionEkf).

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::CovarianceUpdate;
use crate::error::{FusionError, Result};
use crate::measurement::MeasurementModel;
use crate::motion::MotionModel;
use crate::STATE_DIM;

/// Number of times the innovation covariance is re-loaded before giving up.
const MAX_REGULARIZATION_ATTEMPTS: usize = 4;

/// Diagnostics of a single update step.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// Innovation y = z - h(x), bearing wrapped
    pub innovation: DVector<f64>,

    /// Innovation covariance S = H·P·Hᵀ + R (after any regularization)
    pub innovation_covariance: DMatrix<f64>,

    /// Normalized innovation squared yᵀ·S⁻¹·y
    pub nis: f64,

    /// True when S had to be diagonally loaded to factorize
    pub regularized: bool,
}

/// Extended Kalman Filter over a state of fixed dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KalmanFilter {
    /// State estimate x
    x: DVector<f64>,

    /// State covariance P
    p: DMatrix<f64>,

    /// Identity of the state dimension, used by the covariance correction
    identity: DMatrix<f64>,

    /// Covariance correction form
    covariance_update: CovarianceUpdate,

    /// First diagonal load tried on a singular S
    regularization: f64,
}

impl KalmanFilter {
    /// Creates a filter with a zero state and the given initial covariance.
    ///
    /// # Arguments
    /// * `state_dim` - Dimension N of the state vector
    /// * `initial_covariance` - P0, N×N
    pub fn new(state_dim: usize, initial_covariance: DMatrix<f64>) -> Result<Self> {
        if initial_covariance.shape() != (state_dim, state_dim) {
            return Err(FusionError::invalid(format!(
                "initial covariance must be {state_dim}x{state_dim}, got {:?}",
                initial_covariance.shape()
            )));
        }
        FusionError::ensure_finite("initial covariance", initial_covariance.iter())?;

        Ok(Self {
            x: DVector::zeros(state_dim),
            p: initial_covariance,
            identity: DMatrix::identity(state_dim, state_dim),
            covariance_update: CovarianceUpdate::default(),
            regularization: 1.0e-9,
        })
    }

    /// Selects the covariance correction form.
    pub fn with_covariance_update(mut self, form: CovarianceUpdate) -> Self {
        self.covariance_update = form;
        self
    }

    /// Sets the first diagonal load used when S fails to factorize.
    pub fn with_regularization(mut self, epsilon: f64) -> Self {
        self.regularization = epsilon;
        self
    }

    pub fn state_dim(&self) -> usize {
        self.x.len()
    }

    /// Current state estimate.
    pub fn state(&self) -> &DVector<f64> {
        &self.x
    }

    /// Current state covariance.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.p
    }

    /// Replaces the state vector. The covariance is left alone.
    pub fn set_state(&mut self, x: DVector<f64>) -> Result<()> {
        if x.len() != self.state_dim() {
            return Err(FusionError::invalid(format!(
                "state must have {} components, got {}",
                self.state_dim(),
                x.len()
            )));
        }
        FusionError::ensure_finite("state", x.iter())?;
        self.x = x;
        Ok(())
    }

    /// Replaces the covariance. Used when the owner re-seeds the filter.
    pub(crate) fn set_covariance(&mut self, p: DMatrix<f64>) {
        debug_assert_eq!(p.shape(), self.p.shape());
        self.p = p;
    }

    /// Zeroes the state and installs a fresh covariance.
    pub(crate) fn reset(&mut self, p: DMatrix<f64>) {
        self.x.fill(0.0);
        self.set_covariance(p);
    }

    /// Prediction step: advance the estimate by `dt` seconds.
    ///
    /// x = F·x, P = F·P·Fᵀ + Q
    pub fn predict<M: MotionModel + ?Sized>(&mut self, model: &M, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(FusionError::invalid(format!(
                "elapsed time must be finite and non-negative, got {dt}"
            )));
        }
        if model.state_dim() != self.state_dim() {
            return Err(FusionError::invalid(format!(
                "motion model propagates {} states, filter holds {}",
                model.state_dim(),
                self.state_dim()
            )));
        }

        let f = model.transition_matrix(dt);
        let q = model.process_noise(dt);

        self.x = &f * &self.x;
        self.p = &f * &self.p * f.transpose() + q;
        symmetrize(&mut self.p);

        trace!(dt, "predicted");
        Ok(())
    }

    /// Update step: correct the estimate with measurement `z`.
    ///
    /// Validation happens before any mutation, so an error leaves x and P as
    /// they were.
    pub fn update(&mut self, model: &MeasurementModel, z: &DVector<f64>) -> Result<UpdateReport> {
        if self.state_dim() != STATE_DIM {
            return Err(FusionError::invalid(format!(
                "sensor models observe a {STATE_DIM}-dimensional state, filter holds {}",
                self.state_dim()
            )));
        }
        if z.len() != model.measurement_dim() {
            return Err(FusionError::invalid(format!(
                "{} measurement must have {} components, got {}",
                model.sensor_kind(),
                model.measurement_dim(),
                z.len()
            )));
        }
        FusionError::ensure_finite("measurement", z.iter())?;

        // y = z - h(x)
        let z_pred = model.predict_measurement(&self.x);
        let y = model.residual(z, &z_pred);

        // S = H·P·Hᵀ + R
        let h = model.jacobian(&self.x);
        let r = model.noise_covariance();
        let ht = h.transpose();
        let pht = &self.p * &ht;
        let mut s = &h * &pht + r;
        symmetrize(&mut s);

        let (s, s_inv, regularized) = self.invert_innovation(s)?;

        // K = P·Hᵀ·S⁻¹
        let k = &pht * &s_inv;
        let nis = (y.transpose() * &s_inv * &y)[(0, 0)];

        self.x += &k * &y;

        let i_kh = &self.identity - &k * &h;
        self.p = match self.covariance_update {
            CovarianceUpdate::Joseph => {
                &i_kh * &self.p * i_kh.transpose() + &k * r * k.transpose()
            }
            CovarianceUpdate::Standard => &i_kh * &self.p,
        };
        symmetrize(&mut self.p);

        trace!(sensor = %model.sensor_kind(), nis, "updated");
        Ok(UpdateReport {
            innovation: y,
            innovation_covariance: s,
            nis,
            regularized,
        })
    }

    /// Inverts S through Cholesky, diagonally loading it when it is not
    /// positive definite.
    fn invert_innovation(
        &self,
        s: DMatrix<f64>,
    ) -> Result<(DMatrix<f64>, DMatrix<f64>, bool)> {
        if let Some(chol) = s.clone().cholesky() {
            return Ok((s, chol.inverse(), false));
        }

        let dim = s.nrows();
        let mut epsilon = self.regularization;
        for attempt in 1..=MAX_REGULARIZATION_ATTEMPTS {
            let loaded = &s + DMatrix::<f64>::identity(dim, dim) * epsilon;
            if let Some(chol) = loaded.clone().cholesky() {
                warn!(attempt, epsilon, "innovation covariance regularized");
                return Ok((loaded, chol.inverse(), true));
            }
            epsilon *= 10.0;
        }

        Err(FusionError::SingularInnovation {
            attempts: MAX_REGULARIZATION_ATTEMPTS,
        })
    }
}

/// P = (P + Pᵀ) / 2
fn symmetrize(p: &mut DMatrix<f64>) {
    let pt = p.transpose();
    *p += pt;
    *p *= 0.5;
}
