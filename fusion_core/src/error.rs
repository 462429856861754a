//! Error types for the fusion core.

use thiserror::Error;

/// Errors surfaced by the filter and the fusion orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FusionError {
    /// Caller broke an input contract (bad Δt, wrong dimension, NaN, ...).
    /// The filter state is untouched when this is returned.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Innovation covariance could not be factorized, even after regularization.
    #[error("Innovation covariance is singular after {attempts} regularization attempts")]
    SingularInnovation { attempts: usize },
}

impl FusionError {
    /// Creates an invalid input error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Fails with `InvalidInput` unless every value is finite.
    pub(crate) fn ensure_finite<'a>(
        what: &str,
        values: impl IntoIterator<Item = &'a f64>,
    ) -> Result<()> {
        match values.into_iter().position(|v| !v.is_finite()) {
            Some(idx) => Err(Self::invalid(format!(
                "{what} has a non-finite component at index {idx}"
            ))),
            None => Ok(()),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FusionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_finite_reports_index() {
        let values = [1.0, 2.0, f64::NAN];
        let err = FusionError::ensure_finite("measurement", values.iter()).unwrap_err();
        assert_eq!(
            err,
            FusionError::invalid("measurement has a non-finite component at index 2")
        );
        assert!(FusionError::ensure_finite("measurement", [0.0, -1.0].iter()).is_ok());
    }

    #[test]
    fn test_display() {
        let err = FusionError::SingularInnovation { attempts: 4 };
        assert_eq!(
            err.to_string(),
            "Innovation covariance is singular after 4 regularization attempts"
        );
    }
}
