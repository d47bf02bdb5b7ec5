//! Prediction service
//!
//! Wraps a loaded [`Classifier`] and turns one [`FeatureVector`] into a class
//! label plus the `{no-disease, disease}` probability pair.

use crate::error::{CardioError, Result};
use crate::model::Classifier;
use crate::preprocessing::{FeatureSchema, FeatureVector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default decision threshold on P(disease). Only values strictly above it
/// are labelled positive.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Outcome of a single classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 1 = heart disease, 0 = no heart disease
    pub label: u8,
    /// `[P(no disease), P(disease)]`, sums to 1
    pub probabilities: [f64; 2],
}

impl PredictionResult {
    pub fn positive_probability(&self) -> f64 {
        self.probabilities[1]
    }
}

/// Stateless inference over a shared, immutable classifier
#[derive(Debug, Clone)]
pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
    n_features: usize,
    threshold: f64,
}

impl PredictionService {
    /// Bind a classifier to the schema it will be fed with
    pub fn new(classifier: Arc<dyn Classifier>, schema: &FeatureSchema) -> Result<Self> {
        if classifier.n_features() != schema.len() {
            return Err(CardioError::ModelUnavailable(format!(
                "classifier expects {} features, schema has {}",
                classifier.n_features(),
                schema.len()
            )));
        }
        Ok(Self {
            classifier,
            n_features: schema.len(),
            threshold: DEFAULT_THRESHOLD,
        })
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict(&self, vector: &FeatureVector) -> Result<PredictionResult> {
        if vector.len() != self.n_features {
            return Err(CardioError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", vector.len()),
            });
        }

        let proba = self.classifier.predict_positive(&vector.to_row())?;
        let p = proba
            .first()
            .copied()
            .ok_or_else(|| CardioError::InferenceError("classifier returned no output".to_string()))?;
        if !p.is_finite() {
            return Err(CardioError::InferenceError(format!(
                "classifier returned a non-finite probability: {}",
                p
            )));
        }

        let p = p.clamp(0.0, 1.0);
        Ok(PredictionResult {
            label: u8::from(p > self.threshold),
            probabilities: [1.0 - p, p],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LogisticRegression, TreeNode, DecisionTree};
    use crate::preprocessing::heart_columns;
    use ndarray::{Array1, Array2};

    fn schema() -> FeatureSchema {
        FeatureSchema::new(heart_columns()).unwrap()
    }

    fn logistic(schema: &FeatureSchema) -> Arc<dyn Classifier> {
        let mut coefficients = vec![0.0; schema.len()];
        coefficients[schema.index_of("Age").unwrap()] = 0.04;
        coefficients[schema.index_of("ST_Slope_Flat").unwrap()] = 1.5;
        coefficients[schema.index_of("ST_Slope_Up").unwrap()] = -1.2;
        Arc::new(LogisticRegression::new(coefficients, -2.0))
    }

    #[test]
    fn test_all_zero_vector_predicts() {
        let schema = schema();
        let service = PredictionService::new(logistic(&schema), &schema).unwrap();
        let result = service.predict(&FeatureVector::zeros(schema.len())).unwrap();
        assert_eq!(result.label, 0);
        assert!((result.probabilities[0] + result.probabilities[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let schema = schema();
        let service = PredictionService::new(logistic(&schema), &schema).unwrap();
        for age in [20.0, 45.0, 70.0, 95.0] {
            let mut values = vec![0.0; schema.len()];
            values[0] = age;
            values[schema.index_of("ST_Slope_Flat").unwrap()] = 1.0;
            let r = service.predict(&FeatureVector::new(values)).unwrap();
            assert!((r.probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-6);
            assert_eq!(r.label, u8::from(r.positive_probability() > 0.5));
        }
    }

    #[test]
    fn test_threshold() {
        let schema = FeatureSchema::new(vec!["x".to_string()]).unwrap();
        let tree: Arc<dyn Classifier> = Arc::new(DecisionTree {
            n_features: 1,
            root: TreeNode::Leaf { value: 0.4 },
        });
        let service = PredictionService::new(tree, &schema).unwrap();
        assert_eq!(service.predict(&FeatureVector::zeros(1)).unwrap().label, 0);
        let service = service.with_threshold(0.3);
        assert_eq!(service.predict(&FeatureVector::zeros(1)).unwrap().label, 1);
    }

    #[test]
    fn test_exact_half_is_negative() {
        let schema = FeatureSchema::new(vec!["x".to_string()]).unwrap();
        let model: Arc<dyn Classifier> = Arc::new(LogisticRegression::new(vec![1.0], 0.0));
        let service = PredictionService::new(model, &schema).unwrap();
        let result = service.predict(&FeatureVector::zeros(1)).unwrap();
        assert_eq!(result.probabilities, [0.5, 0.5]);
        assert_eq!(result.label, 0);

        let tree: Arc<dyn Classifier> = Arc::new(DecisionTree {
            n_features: 1,
            root: TreeNode::Leaf { value: 0.3 },
        });
        let service = PredictionService::new(tree, &schema).unwrap().with_threshold(0.3);
        assert_eq!(service.predict(&FeatureVector::zeros(1)).unwrap().label, 0);
    }

    #[test]
    fn test_width_mismatch_at_construction() {
        let schema = schema();
        let small: Arc<dyn Classifier> = Arc::new(LogisticRegression::new(vec![1.0, 2.0], 0.0));
        assert!(matches!(
            PredictionService::new(small, &schema),
            Err(CardioError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_vector_length_checked() {
        let schema = schema();
        let service = PredictionService::new(logistic(&schema), &schema).unwrap();
        assert!(matches!(
            service.predict(&FeatureVector::zeros(3)),
            Err(CardioError::ShapeError { .. })
        ));
    }

    #[derive(Debug)]
    struct Broken;

    impl Classifier for Broken {
        fn n_features(&self) -> usize {
            1
        }

        fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(Array1::from_elem(x.nrows(), f64::NAN))
        }
    }

    #[test]
    fn test_non_finite_output_is_an_inference_error() {
        let schema = FeatureSchema::new(vec!["x".to_string()]).unwrap();
        let service = PredictionService::new(Arc::new(Broken), &schema).unwrap();
        assert!(matches!(
            service.predict(&FeatureVector::zeros(1)),
            Err(CardioError::InferenceError(_))
        ));
    }
}
