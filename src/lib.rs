//! CardioLens - heart-disease risk prediction with local explanations
//!
//! Turns a sparse patient record into a risk prediction and a per-feature
//! attribution of that prediction, and serves both over HTTP.
//!
//! # Modules
//!
//! ## Core pipeline
//! - [`preprocessing`] - Feature schema and record normalization (one-hot expansion)
//! - [`inference`] - Class label and probability pair from the loaded classifier
//! - [`explainability`] - Shapley attributions against a background sample
//! - [`assembler`] - Response formatting and significant-factor ranking
//!
//! ## Data and models
//! - [`dataset`] - Population CSV, schema derivation, background sampling
//! - [`model`] - Classifier trait and the JSON model artifact
//!
//! ## Collaborators
//! - [`narrative`] - Prompt assembly and the generative-text client
//! - [`plotting`] - Kernel density curves of the population
//!
//! ## Services
//! - [`server`] - HTTP server
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core pipeline
pub mod preprocessing;
pub mod inference;
pub mod explainability;
pub mod assembler;

// Data and models
pub mod dataset;
pub mod model;

// Collaborators
pub mod narrative;
pub mod plotting;

// Services
pub mod server;
pub mod cli;

pub use error::{CardioError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{CardioError, Result};

    // Preprocessing
    pub use crate::preprocessing::{FeatureSchema, FeatureVector, FieldValue, RawInput, RecordNormalizer};

    // Data and models
    pub use crate::dataset::{BackgroundSample, PopulationDataset};
    pub use crate::model::{Classifier, ModelArtifact, ModelFile};

    // Prediction and attribution
    pub use crate::inference::{PredictionResult, PredictionService};
    pub use crate::explainability::{AttributionResult, AttributionService};
    pub use crate::assembler::{PredictionResponse, ResultAssembler, SignificantFactor};

    // Server
    pub use crate::server::{create_router, AppState, ServerConfig};
}
