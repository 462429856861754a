//! Error types for the scenario harness.

use fusion_core::FusionError;
use thiserror::Error;

/// Errors raised while building or running a scenario.
#[derive(Debug, Error)]
pub enum SimError {
    /// The filter rejected a package or its configuration
    #[error(transparent)]
    Fusion(#[from] FusionError),

    /// A noise distribution could not be built from the configured variances
    #[error("Noise model error: {0}")]
    Noise(String),

    /// Runner parameters make no sense (zero rate, negative duration, ...)
    #[error("Invalid scenario parameters: {0}")]
    InvalidParameters(String),
}
