//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::CardioError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A capability failed to initialize at startup
    #[error("{0}")]
    Unavailable(&'static str),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Plotting failed: {0}")]
    Plotting(String),

    #[error("Narrative service failed: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) | ServerError::Prediction(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Unavailable(_)
            | ServerError::Plotting(_)
            | ServerError::Upstream(_)
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors raised while handling a prediction request
impl From<CardioError> for ServerError {
    fn from(err: CardioError) -> Self {
        match err {
            CardioError::InvalidInput(msg) => ServerError::BadRequest(msg),
            other => ServerError::Prediction(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::BadRequest(msg) | ServerError::NotFound(msg) => msg.clone(),
            ServerError::Unavailable(msg) => {
                tracing::warn!(reason = %msg, "Request rejected, capability unavailable");
                msg.to_string()
            }
            ServerError::Prediction(msg) => {
                tracing::error!(detail = %msg, "Prediction error");
                format!("An error occurred during prediction: {}", msg)
            }
            ServerError::Plotting(msg) => {
                tracing::error!(detail = %msg, "Plot data error");
                format!("An error occurred generating plot data: {}", msg)
            }
            ServerError::Upstream(msg) => {
                tracing::error!(detail = %msg, "Narrative service error");
                format!("An error occurred calling the narrative service: {}", msg)
            }
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                "An internal error occurred".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
