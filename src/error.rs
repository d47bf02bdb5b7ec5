//! Error types for the CardioLens service

use thiserror::Error;

/// Result type alias for CardioLens operations
pub type Result<T> = std::result::Result<T, CardioError>;

/// Main error type for the prediction pipeline
#[derive(Error, Debug)]
pub enum CardioError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Explainer unavailable: {0}")]
    ExplainerUnavailable(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Narrative service error: {0}")]
    NarrativeError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for CardioError {
    fn from(err: polars::error::PolarsError) -> Self {
        CardioError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CardioError {
    fn from(err: serde_json::Error) -> Self {
        CardioError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CardioError {
    fn from(err: ndarray::ShapeError) -> Self {
        CardioError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for CardioError {
    fn from(err: reqwest::Error) -> Self {
        CardioError::NarrativeError(err.to_string())
    }
}
