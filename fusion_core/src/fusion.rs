//! The fusion orchestrator.
//!
//! Turns a stream of timestamped radar/laser packages into filter calls:
//! the first usable package seeds the state, every later one runs one
//! predict over the elapsed interval followed by one update with the
//! matching sensor model.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::config::{FusionConfig, MICROSECONDS_TO_SECONDS};
use crate::error::{FusionError, Result};
use crate::kalman::{KalmanFilter, UpdateReport};
use crate::measurement::MeasurementModel;
use crate::motion::ConstantVelocity;
use crate::package::{MeasurementPackage, SensorKind};
use crate::STATE_DIM;

/// Where the orchestrator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingPhase {
    /// No usable fix seen yet
    Uninitialized,
    /// Seeded; `last_timestamp` is the time of the last processed package (µs)
    Tracking { last_timestamp: i64 },
}

/// What a call to [`FusionEkf::process_measurement`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// First fix sat exactly on the origin; still waiting for a usable one
    Deferred,
    /// Filter was seeded from this package
    Initialized,
    /// Predict + update ran
    Updated(UpdateReport),
}

/// Radar/laser sensor fusion EKF for a single object.
#[derive(Debug, Clone)]
pub struct FusionEkf {
    config: FusionConfig,
    phase: TrackingPhase,
    filter: KalmanFilter,
    motion_model: ConstantVelocity,
    laser_model: MeasurementModel,
    radar_model: MeasurementModel,
}

impl FusionEkf {
    /// Creates an uninitialized orchestrator.
    pub fn new(config: FusionConfig) -> Result<Self> {
        config.validate()?;

        let filter = KalmanFilter::new(STATE_DIM, config.initial_covariance())?
            .with_covariance_update(config.covariance_update)
            .with_regularization(config.innovation_regularization);

        Ok(Self {
            motion_model: ConstantVelocity::new(config.noise_ax, config.noise_ay),
            laser_model: MeasurementModel::laser(&config),
            radar_model: MeasurementModel::radar(&config),
            phase: TrackingPhase::Uninitialized,
            filter,
            config,
        })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn phase(&self) -> TrackingPhase {
        self.phase
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.phase, TrackingPhase::Tracking { .. })
    }

    /// Timestamp (µs) of the last package that reached the filter.
    pub fn last_timestamp(&self) -> Option<i64> {
        match self.phase {
            TrackingPhase::Uninitialized => None,
            TrackingPhase::Tracking { last_timestamp } => Some(last_timestamp),
        }
    }

    /// Current estimate [px, py, vx, vy].
    pub fn state(&self) -> &DVector<f64> {
        self.filter.state()
    }

    /// Current 4×4 covariance.
    pub fn covariance(&self) -> &DMatrix<f64> {
        self.filter.covariance()
    }

    /// Drops the track and waits for a fresh first fix.
    pub fn reset(&mut self) {
        self.filter.reset(self.config.initial_covariance());
        self.phase = TrackingPhase::Uninitialized;
    }

    /// Tries to seed the filter from `pkg`.
    ///
    /// Velocity always starts at zero. A fix whose position is exactly the
    /// origin is not trusted: the orchestrator stays uninitialized and
    /// returns `Ok(false)`. Calling this while tracking re-seeds the filter.
    pub fn initialize(&mut self, pkg: &MeasurementPackage) -> Result<bool> {
        pkg.validate()?;

        let z = &pkg.raw_measurement;
        let (px, py) = match pkg.sensor_kind {
            SensorKind::Radar => {
                let (rho, phi) = (z[0], z[1]);
                (rho * phi.cos(), rho * phi.sin())
            }
            SensorKind::Laser => (z[0], z[1]),
        };

        if px == 0.0 && py == 0.0 {
            debug!(sensor = %pkg.sensor_kind, timestamp = pkg.timestamp, "first fix at origin, deferring initialization");
            return Ok(false);
        }

        self.filter.set_state(DVector::from_vec(vec![px, py, 0.0, 0.0]))?;
        self.filter.set_covariance(self.config.initial_covariance());
        self.phase = TrackingPhase::Tracking {
            last_timestamp: pkg.timestamp,
        };

        debug!(sensor = %pkg.sensor_kind, px, py, timestamp = pkg.timestamp, "track initialized");
        Ok(true)
    }

    /// Feeds one package through the filter.
    ///
    /// Packages must arrive in non-decreasing timestamp order. On error the
    /// estimate and the last timestamp are unchanged.
    pub fn process_measurement(&mut self, pkg: &MeasurementPackage) -> Result<ProcessOutcome> {
        let last_timestamp = match self.phase {
            TrackingPhase::Uninitialized => {
                return Ok(if self.initialize(pkg)? {
                    ProcessOutcome::Initialized
                } else {
                    ProcessOutcome::Deferred
                });
            }
            TrackingPhase::Tracking { last_timestamp } => last_timestamp,
        };

        pkg.validate()?;
        if pkg.timestamp < last_timestamp {
            return Err(FusionError::invalid(format!(
                "package at {}us is older than the last processed one at {}us",
                pkg.timestamp, last_timestamp
            )));
        }
        let elapsed_us = pkg.timestamp.checked_sub(last_timestamp).ok_or_else(|| {
            FusionError::invalid(format!(
                "elapsed time from {}us to {}us overflows",
                last_timestamp, pkg.timestamp
            ))
        })?;
        let dt = elapsed_us as f64 * MICROSECONDS_TO_SECONDS;

        let model = match pkg.sensor_kind {
            SensorKind::Radar => &self.radar_model,
            SensorKind::Laser => &self.laser_model,
        };

        // Commit only once both steps succeeded.
        let mut next = self.filter.clone();
        next.predict(&self.motion_model, dt)?;
        let report = next.update(model, &pkg.raw_measurement)?;

        self.filter = next;
        self.phase = TrackingPhase::Tracking {
            last_timestamp: pkg.timestamp,
        };
        Ok(ProcessOutcome::Updated(report))
    }
}
