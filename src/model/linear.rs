//! Logistic regression classifier

use super::{check_width, sigmoid, Classifier};
use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Fitted binary logistic regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// One weight per feature, in schema order
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.coefficients.is_empty() {
            return Err(CardioError::ModelUnavailable(
                "logistic regression has no coefficients".to_string(),
            ));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(CardioError::ModelUnavailable(
                "logistic regression has non-finite parameters".to_string(),
            ));
        }
        Ok(())
    }
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(x, self.n_features())?;
        let weights = ArrayView1::from(self.coefficients.as_slice());
        let linear = x.dot(&weights) + self.intercept;
        Ok(linear.mapv(sigmoid))
    }
}
