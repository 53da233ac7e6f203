//! Error handling for sensor dataset operations.
//!
//! Provides error types with context for catalog access, column
//! validation, sample conversion and batch stacking failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SensorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Dataset '{name}' not found in catalog at path: {path}")]
    DatasetNotFound { name: String, path: PathBuf },

    #[error("Unsupported sensor type: {sensor}")]
    UnsupportedSensor { sensor: String },

    #[error("The dataset must include a '{column}' column")]
    MissingColumn { column: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cannot stack an empty batch")]
    EmptyBatch,

    #[error(
        "Inconsistent batch: sample {index} has {found} metadata values, expected {expected}"
    )]
    InconsistentBatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid timestamp column '{column}': {reason}")]
    InvalidTimestamp { column: String, reason: String },
}

impl SensorError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error was raised while validating construction inputs
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedSensor { .. } | Self::MissingColumn { .. } | Self::Configuration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SensorError>;
