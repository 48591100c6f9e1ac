//! Crate-wide error type.

use chrono::NaiveDate;
use thiserror::Error;

use crate::features::schema::FeatureRow;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Errors raised by the feature builder, the simulator, and their adapters.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A historical value or request parameter is non-finite or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A district has no (or too little) history to seed a run.
    #[error("insufficient history for district \"{district}\": {reason}")]
    InsufficientHistory { district: String, reason: String },

    /// The model expects a column the feature builder cannot derive.
    #[error("model expects feature \"{feature}\" which cannot be derived")]
    SchemaMismatch { feature: String },

    /// The model call failed or returned a non-finite value.
    #[error("prediction failed at {date}: {reason}")]
    PredictionFailure {
        date: NaiveDate,
        reason: String,
        /// Feature row that was handed to the model.
        row: Box<FeatureRow>,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ForecastError {
    /// Shorthand for [`ForecastError::InsufficientHistory`].
    pub fn insufficient(district: &str, reason: impl Into<String>) -> Self {
        Self::InsufficientHistory {
            district: district.to_string(),
            reason: reason.into(),
        }
    }
}
