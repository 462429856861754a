//! Fusion Core - Radar/Laser Extended Kalman Filter
//!
//! Estimates the position and velocity of one moving object from two
//! heterogeneous sensors:
//! - a **laser** reporting Cartesian position `[px, py]`
//! - a **radar** reporting range, bearing and range rate `[rho, phi, rho_dot]`
//!
//! Components, leaves first:
//! 1. [`motion`]: constant-velocity transition and process noise
//! 2. [`measurement`]: laser (linear) and radar (linearized) observation models
//! 3. [`kalman`]: the predict/update engine owning `(x, P)`
//! 4. [`fusion`]: the orchestrator that seeds the filter and sequences packages
//!
//! # Example
//!
//! ```
//! use fusion_core::{FusionConfig, FusionEkf, MeasurementPackage};
//!
//! let mut ekf = FusionEkf::new(FusionConfig::default()).unwrap();
//! ekf.process_measurement(&MeasurementPackage::laser(1.0, 1.0, 0)).unwrap();
//! ekf.process_measurement(&MeasurementPackage::radar(2.0_f64.sqrt(), std::f64::consts::FRAC_PI_4, 0.0, 100_000)).unwrap();
//! assert!((ekf.state()[0] - 1.0).abs() < 1e-3);
//! ```

pub mod config;
pub mod error;
pub mod evaluation;
pub mod fusion;
pub mod kalman;
pub mod measurement;
pub mod motion;
pub mod package;

/// Dimension of the state vector [px, py, vx, vy].
pub const STATE_DIM: usize = 4;

// Re-export key types for convenience
pub use config::{CovarianceUpdate, FusionConfig, MICROSECONDS_TO_SECONDS};
pub use error::FusionError;
pub use fusion::{FusionEkf, ProcessOutcome, TrackingPhase};
pub use kalman::{KalmanFilter, UpdateReport};
pub use measurement::{normalize_angle, MeasurementModel};
pub use motion::{ConstantVelocity, MotionModel};
pub use package::{MeasurementPackage, SensorKind};
