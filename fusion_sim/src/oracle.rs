//! Ground truth oracle for simulation.
//!
//! The Oracle owns the "God's eye view" of the tracked object:
//! - The true trajectory, evaluated analytically at the current time
//! - Sensor reading generation (Gaussian noise from the filter's own R)
//! - Alternating laser / radar packages with integer microsecond timestamps

use fusion_core::{normalize_angle, FusionConfig, MeasurementPackage, SensorKind};
use nalgebra::{Vector2, Vector4};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Analytic ground-truth motion of the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Trajectory {
    /// Constant velocity from `start`
    Straight {
        start: Vector2<f64>,
        velocity: Vector2<f64>,
    },
    /// Uniform circular motion around `center`
    Circle {
        center: Vector2<f64>,
        radius: f64,
        /// Signed angular rate (rad/s)
        angular_rate: f64,
        /// Angle at t = 0 (rad)
        phase: f64,
    },
}

impl Trajectory {
    /// True state [px, py, vx, vy] at time `t` seconds.
    pub fn state_at(&self, t: f64) -> Vector4<f64> {
        match *self {
            Trajectory::Straight { start, velocity } => {
                let p = start + velocity * t;
                Vector4::new(p.x, p.y, velocity.x, velocity.y)
            }
            Trajectory::Circle {
                center,
                radius,
                angular_rate,
                phase,
            } => {
                let theta = phase + angular_rate * t;
                let (s, c) = theta.sin_cos();
                let speed = radius * angular_rate;
                Vector4::new(
                    center.x + radius * c,
                    center.y + radius * s,
                    -speed * s,
                    speed * c,
                )
            }
        }
    }
}

/// The Oracle - ground truth plus noisy sensors.
pub struct Oracle {
    /// RNG for measurement noise
    rng: ChaCha8Rng,

    trajectory: Trajectory,

    /// Current simulation time (seconds)
    current_time: f64,

    /// Packages generated so far; even ones come from the laser
    emitted: u64,

    laser_noise: [Normal<f64>; 2],
    radar_noise: [Normal<f64>; 3],
}

impl Oracle {
    /// Creates an oracle whose sensor noise matches `config`.
    pub fn new(seed: u64, trajectory: Trajectory, config: &FusionConfig) -> Result<Self, SimError> {
        let [lx, ly] = config.laser_noise;
        let [rr, rb, rd] = config.radar_noise;

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            trajectory,
            current_time: 0.0,
            emitted: 0,
            laser_noise: [normal(lx)?, normal(ly)?],
            radar_noise: [normal(rr)?, normal(rb)?, normal(rd)?],
        })
    }

    /// Advances time by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.current_time += dt;
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.current_time
    }

    /// Current timestamp in microseconds.
    pub fn timestamp(&self) -> i64 {
        (self.current_time * 1.0e6).round() as i64
    }

    pub fn ground_truth(&self) -> Vector4<f64> {
        self.trajectory.state_at(self.current_time)
    }

    /// Which sensor reports next.
    pub fn next_sensor(&self) -> SensorKind {
        if self.emitted % 2 == 0 {
            SensorKind::Laser
        } else {
            SensorKind::Radar
        }
    }

    /// Generates a noisy reading of the current truth from `sensor`.
    pub fn measure(&mut self, sensor: SensorKind) -> MeasurementPackage {
        let truth = self.ground_truth();
        let (px, py, vx, vy) = (truth[0], truth[1], truth[2], truth[3]);
        let timestamp = self.timestamp();

        match sensor {
            SensorKind::Laser => {
                let [nx, ny] = &self.laser_noise;
                MeasurementPackage::laser(
                    px + nx.sample(&mut self.rng),
                    py + ny.sample(&mut self.rng),
                    timestamp,
                )
            }
            SensorKind::Radar => {
                let rho = px.hypot(py);
                let phi = py.atan2(px);
                let rho_dot = if rho > 0.0 { (px * vx + py * vy) / rho } else { 0.0 };

                let [nr, nb, nd] = &self.radar_noise;
                MeasurementPackage::radar(
                    (rho + nr.sample(&mut self.rng)).max(0.0),
                    normalize_angle(phi + nb.sample(&mut self.rng)),
                    rho_dot + nd.sample(&mut self.rng),
                    timestamp,
                )
            }
        }
    }

    /// Emits the next package in the laser/radar alternation.
    pub fn next_package(&mut self) -> MeasurementPackage {
        let sensor = self.next_sensor();
        self.emitted += 1;
        self.measure(sensor)
    }
}

fn normal(variance: f64) -> Result<Normal<f64>, SimError> {
    Normal::new(0.0, variance.sqrt()).map_err(|e| SimError::Noise(e.to_string()))
}
