//! Serialized classifier artifacts
//!
//! The classifier is trained elsewhere and shipped as a JSON file:
//!
//! ```json
//! {
//!   "feature_names": ["Age", "RestingBP", "..."],
//!   "model": { "model_type": "logistic_regression", "coefficients": [0.03, 0.01], "intercept": -4.2 }
//! }
//! ```
//!
//! `model_type` is one of `logistic_regression`, `decision_tree`,
//! `random_forest` or `gradient_boosting`.

mod linear;
mod tree;

pub use linear::LogisticRegression;
pub use tree::{DecisionTree, GradientBoostingClassifier, RandomForest, TreeNode};

use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A fitted binary classifier.
///
/// Inference is read-only; implementations are shared across request threads.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    /// Number of input columns the model was fitted on
    fn n_features(&self) -> usize;

    /// P(positive class) for every row of `x`
    fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

pub(crate) fn check_width(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(CardioError::ShapeError {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

/// Supported model families
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "model_type", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingClassifier),
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::LogisticRegression(_) => "logistic_regression",
            ModelArtifact::DecisionTree(_) => "decision_tree",
            ModelArtifact::RandomForest(_) => "random_forest",
            ModelArtifact::GradientBoosting(_) => "gradient_boosting",
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            ModelArtifact::LogisticRegression(m) => m.validate(),
            ModelArtifact::DecisionTree(m) => m.validate(),
            ModelArtifact::RandomForest(m) => m.validate(),
            ModelArtifact::GradientBoosting(m) => m.validate(),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            ModelArtifact::LogisticRegression(m) => m,
            ModelArtifact::DecisionTree(m) => m,
            ModelArtifact::RandomForest(m) => m,
            ModelArtifact::GradientBoosting(m) => m,
        }
    }
}

impl Classifier for ModelArtifact {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict_positive(x)
    }
}

/// On-disk layout of a model file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    /// Training column order; checked against the feature schema when present
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub model: ModelArtifact,
}

impl ModelFile {
    pub fn new(model: ModelArtifact) -> Self {
        Self {
            feature_names: None,
            model,
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Parse and validate a model file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CardioError::ModelUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let file: Self = serde_json::from_str(&json)?;
        file.validate()?;
        Ok(file)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.model.validate()?;
        if let Some(names) = &self.feature_names {
            if names.len() != self.model.n_features() {
                return Err(CardioError::ModelUnavailable(format!(
                    "model lists {} feature names but expects {} features",
                    names.len(),
                    self.model.n_features()
                )));
            }
        }
        Ok(())
    }

    pub fn into_classifier(self) -> Arc<dyn Classifier> {
        Arc::new(self.model)
    }
}
