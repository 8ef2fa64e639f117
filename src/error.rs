//! Error types for the wavecast library.

use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors that can occur while fitting, training or forecasting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// A required input series or artifact is missing.
    #[error("data not found: {0}")]
    DataNotFound(String),

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Caller supplied mismatched lengths.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        got: usize,
    },

    /// Numerical failure while fitting a linear or residual model.
    #[error("fit failed ({context}): {reason}")]
    FitFailed { context: String, reason: String },

    /// A series is empty after trimming.
    #[error("empty data: {0}")]
    EmptyData(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The caller cancelled a long-running operation.
    #[error("cancelled during {0}")]
    Cancelled(String),

    /// A persisted model could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),
}

impl ForecastError {
    /// Build a [`ForecastError::FitFailed`] from a context and reason.
    pub fn fit(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FitFailed {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`ForecastError::ShapeMismatch`].
    pub fn shape(context: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            got,
        }
    }

    /// Whether a search loop may skip this failure and try the next candidate.
    ///
    /// Only numerical failures qualify. Shape, missing-data and cancellation
    /// errors cannot be fixed by retrying with another seed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FitFailed { .. } | Self::ComputationError(_))
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
