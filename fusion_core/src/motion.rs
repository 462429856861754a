//! Process models.
//!
//! ## State vector
//! x = [px, py, vx, vy]ᵀ
//!
//! ## Constant-velocity transition
//! F(dt) = I₄ with F[0,2] = F[1,3] = dt, i.e. position += velocity * dt
//!
//! ## Process noise (discrete white-noise acceleration)
//! Q(dt) = G · diag(σx², σy²) · Gᵀ with
//! G = [[dt²/2, 0], [0, dt²/2], [dt, 0], [0, dt]]

use nalgebra::DMatrix;

use crate::STATE_DIM;

/// How the state evolves over an elapsed interval.
pub trait MotionModel {
    /// Dimension of the state this model propagates.
    fn state_dim(&self) -> usize;

    /// State transition matrix F for a step of `dt` seconds.
    fn transition_matrix(&self, dt: f64) -> DMatrix<f64>;

    /// Process noise covariance Q for a step of `dt` seconds. Must be PSD.
    fn process_noise(&self, dt: f64) -> DMatrix<f64>;
}

/// Constant-velocity model driven by white acceleration noise.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantVelocity {
    /// Acceleration variance along x (m²/s⁴)
    pub noise_ax: f64,
    /// Acceleration variance along y (m²/s⁴)
    pub noise_ay: f64,
}

impl ConstantVelocity {
    pub fn new(noise_ax: f64, noise_ay: f64) -> Self {
        Self { noise_ax, noise_ay }
    }
}

impl MotionModel for ConstantVelocity {
    fn state_dim(&self) -> usize {
        STATE_DIM
    }

    fn transition_matrix(&self, dt: f64) -> DMatrix<f64> {
        let mut f = DMatrix::identity(STATE_DIM, STATE_DIM);
        f[(0, 2)] = dt; // px += vx * dt
        f[(1, 3)] = dt; // py += vy * dt
        f
    }

    fn process_noise(&self, dt: f64) -> DMatrix<f64> {
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;

        let mut q = DMatrix::zeros(STATE_DIM, STATE_DIM);
        for (pos, noise) in [(0usize, self.noise_ax), (1usize, self.noise_ay)] {
            let vel = pos + 2;
            q[(pos, pos)] = dt4 / 4.0 * noise;
            q[(pos, vel)] = dt3 / 2.0 * noise;
            q[(vel, pos)] = dt3 / 2.0 * noise;
            q[(vel, vel)] = dt2 * noise;
        }
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DVector, Matrix4x2};

    #[test]
    fn test_transition_moves_position() {
        let model = ConstantVelocity::new(9.0, 9.0);
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0, -4.0]);
        let moved = model.transition_matrix(0.5) * x;
        assert_relative_eq!(moved[0], 2.5);
        assert_relative_eq!(moved[1], 0.0);
        assert_relative_eq!(moved[2], 3.0);
        assert_relative_eq!(moved[3], -4.0);
    }

    #[test]
    fn test_zero_dt() {
        let model = ConstantVelocity::new(9.0, 4.0);
        assert_eq!(model.transition_matrix(0.0), DMatrix::identity(4, 4));
        assert_eq!(model.process_noise(0.0), DMatrix::zeros(4, 4));
    }

    #[test]
    fn test_process_noise_matches_factored_form() {
        let (ax, ay, dt) = (9.0, 4.0, 0.1);
        let model = ConstantVelocity::new(ax, ay);
        let h = dt * dt / 2.0;
        let g = Matrix4x2::new(
            h, 0.0,
            0.0, h,
            dt, 0.0,
            0.0, dt,
        );
        let expected = g * nalgebra::Matrix2::new(ax, 0.0, 0.0, ay) * g.transpose();
        let q = model.process_noise(dt);
        for r in 0..4 {
            for c in 0..4 {
                assert_relative_eq!(q[(r, c)], expected[(r, c)], epsilon = 1e-15);
            }
        }
    }
}
