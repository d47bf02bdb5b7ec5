//! Sampling-based Shapley attributions against a background sample

use crate::dataset::BackgroundSample;
use crate::error::{CardioError, Result};
use crate::model::Classifier;
use crate::preprocessing::{FeatureSchema, FeatureVector};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Random feature orderings walked per background row
pub const DEFAULT_PERMUTATIONS: usize = 2;

/// Per-feature contributions to P(disease) for one instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionResult {
    /// Mean P(disease) over the background sample
    base_value: f64,
    /// P(disease) for the explained instance
    prediction: f64,
    /// `(feature, contribution)` in schema order
    contributions: Vec<(String, f64)>,
}

impl AttributionResult {
    pub fn new(base_value: f64, prediction: f64, contributions: Vec<(String, f64)>) -> Self {
        Self {
            base_value,
            prediction,
            contributions,
        }
    }

    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    pub fn prediction(&self) -> f64 {
        self.prediction
    }

    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    /// Contributions in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.contributions.iter().map(|(name, v)| (name.as_str(), *v))
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.iter().find(|(name, _)| *name == feature).map(|(_, v)| v)
    }

    pub fn sum_contributions(&self) -> f64 {
        self.contributions.iter().map(|(_, v)| v).sum()
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.contributions.iter().cloned().collect()
    }
}

/// Explains the positive-class output of a classifier.
///
/// For each background row and each of `permutations` random feature orders,
/// features are switched one at a time from the background value to the
/// instance value; the change in P(disease) is credited to the switched
/// feature. Every walk telescopes to `f(x) - f(background row)`, so the
/// contributions always sum to `prediction - base_value`.
///
/// Results are deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct AttributionService {
    classifier: Arc<dyn Classifier>,
    schema: Arc<FeatureSchema>,
    background: Arc<BackgroundSample>,
    base_value: f64,
    permutations: usize,
    seed: u64,
}

impl AttributionService {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        schema: Arc<FeatureSchema>,
        background: Arc<BackgroundSample>,
    ) -> Result<Self> {
        if background.n_features() != schema.len() || classifier.n_features() != schema.len() {
            return Err(CardioError::ExplainerUnavailable(format!(
                "width mismatch: schema {}, background {}, classifier {}",
                schema.len(),
                background.n_features(),
                classifier.n_features()
            )));
        }

        let bg_preds = classifier
            .predict_positive(background.rows())
            .map_err(|e| CardioError::ExplainerUnavailable(e.to_string()))?;
        let base_value = bg_preds.mean().unwrap_or(0.0);
        if !base_value.is_finite() {
            return Err(CardioError::ExplainerUnavailable(
                "classifier output on the background sample is not finite".to_string(),
            ));
        }

        Ok(Self {
            classifier,
            schema,
            background,
            base_value,
            permutations: DEFAULT_PERMUTATIONS,
            seed: 0,
        })
    }

    pub fn with_permutations(mut self, n: usize) -> Self {
        self.permutations = n.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    pub fn background(&self) -> &BackgroundSample {
        &self.background
    }

    pub fn explain(&self, vector: &FeatureVector) -> Result<AttributionResult> {
        let n_features = self.schema.len();
        if vector.len() != n_features {
            return Err(CardioError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", vector.len()),
            });
        }

        let instance = vector.to_array();
        let prediction = self
            .classifier
            .predict_positive(&vector.to_row())?
            .first()
            .copied()
            .ok_or_else(|| CardioError::InferenceError("classifier returned no output".to_string()))?;

        let rows = self.background.rows();
        let per_row: Vec<Vec<f64>> = (0..rows.nrows())
            .into_par_iter()
            .map(|r| self.walk_row(&instance, rows.row(r), r as u64))
            .collect::<Result<Vec<_>>>()?;

        let n_walks = (rows.nrows() * self.permutations) as f64;
        let mut totals = vec![0.0; n_features];
        for row in &per_row {
            for (t, v) in totals.iter_mut().zip(row) {
                *t += v;
            }
        }

        let contributions = self
            .schema
            .ordered_feature_names()
            .iter()
            .cloned()
            .zip(totals.into_iter().map(|t| t / n_walks))
            .collect();

        Ok(AttributionResult::new(self.base_value, prediction, contributions))
    }

    /// Summed marginal contributions of all permutation walks from one background row
    fn walk_row(&self, instance: &Array1<f64>, bg_row: ArrayView1<f64>, row_index: u64) -> Result<Vec<f64>> {
        let n_features = instance.len();
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(row_index));
        let mut sums = vec![0.0; n_features];

        // Features equal in both rows contribute nothing on any path
        let differing: Vec<usize> = (0..n_features).filter(|&j| instance[j] != bg_row[j]).collect();
        if differing.is_empty() {
            return Ok(sums);
        }

        for _ in 0..self.permutations {
            let mut order = differing.clone();
            order.shuffle(&mut rng);

            let mut path = Array2::<f64>::zeros((order.len() + 1, n_features));
            let mut current = bg_row.to_owned();
            path.row_mut(0).assign(&current);
            for (step, &j) in order.iter().enumerate() {
                current[j] = instance[j];
                path.row_mut(step + 1).assign(&current);
            }

            let preds = self.classifier.predict_positive(&path)?;
            if preds.iter().any(|p| !p.is_finite()) {
                return Err(CardioError::InferenceError(
                    "classifier returned a non-finite probability during attribution".to_string(),
                ));
            }
            for (step, &j) in order.iter().enumerate() {
                sums[j] += preds[step + 1] - preds[step];
            }
        }

        Ok(sums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DecisionTree, LogisticRegression, TreeNode};
    use crate::preprocessing::heart_columns;
    use ndarray::array;

    #[derive(Debug)]
    struct Additive {
        weights: Vec<f64>,
    }

    impl Classifier for Additive {
        fn n_features(&self) -> usize {
            self.weights.len()
        }

        fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(x.rows()
                .into_iter()
                .map(|row| row.iter().zip(&self.weights).map(|(v, w)| v * w).sum::<f64>())
                .collect())
        }
    }

    fn small_schema() -> Arc<FeatureSchema> {
        Arc::new(FeatureSchema::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]).unwrap())
    }

    fn background() -> Arc<BackgroundSample> {
        Arc::new(
            BackgroundSample::new(array![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]])
                .unwrap(),
        )
    }

    #[test]
    fn test_additive_model_exact() {
        let model = Arc::new(Additive { weights: vec![1.0, 2.0, 3.0] });
        let service = AttributionService::new(model, small_schema(), background()).unwrap();
        let result = service.explain(&FeatureVector::new(vec![1.0, 2.0, 3.0])).unwrap();

        // For an additive model every ordering gives w_j * (x_j - mean(bg_j)), mean(bg_j) = 1.5
        assert!((result.get("a").unwrap() - (-0.5)).abs() < 1e-9);
        assert!((result.get("b").unwrap() - 1.0).abs() < 1e-9);
        assert!((result.get("c").unwrap() - 4.5).abs() < 1e-9);
        assert!((result.base_value() - 9.0).abs() < 1e-9);
        assert!((result.prediction() - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_contributions_sum_to_prediction_minus_base() {
        let tree = Arc::new(DecisionTree {
            n_features: 3,
            root: TreeNode::Split {
                feature_idx: 0,
                threshold: 1.5,
                left: Box::new(TreeNode::Leaf { value: 0.2 }),
                right: Box::new(TreeNode::Split {
                    feature_idx: 2,
                    threshold: 0.5,
                    left: Box::new(TreeNode::Leaf { value: 0.5 }),
                    right: Box::new(TreeNode::Leaf { value: 0.9 }),
                }),
            },
        });
        let service = AttributionService::new(tree, small_schema(), background())
            .unwrap()
            .with_permutations(5)
            .with_seed(11);
        let result = service.explain(&FeatureVector::new(vec![2.0, 0.0, 1.0])).unwrap();
        assert!((result.sum_contributions() - (result.prediction() - result.base_value())).abs() < 1e-9);
        assert_eq!(result.get("b").unwrap(), 0.0);
    }

    #[test]
    fn test_keys_match_schema_order() {
        let schema = Arc::new(FeatureSchema::new(heart_columns()).unwrap());
        let model = Arc::new(LogisticRegression::new(vec![0.1; schema.len()], -1.0));
        let bg = Arc::new(BackgroundSample::new(Array2::from_elem((5, schema.len()), 0.5)).unwrap());
        let service = AttributionService::new(model, schema.clone(), bg).unwrap();

        let result = service.explain(&FeatureVector::zeros(schema.len())).unwrap();
        let names: Vec<&str> = result.iter().map(|(n, _)| n).collect();
        let expected: Vec<&str> = schema.ordered_feature_names().iter().map(String::as_str).collect();
        assert_eq!(names, expected);
        assert_eq!(result.to_map().len(), schema.len());
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let model = Arc::new(LogisticRegression::new(vec![0.7, -1.3, 0.4], 0.2));
        let service = AttributionService::new(model, small_schema(), background())
            .unwrap()
            .with_seed(3);
        let x = FeatureVector::new(vec![2.5, 0.5, 1.0]);
        assert_eq!(service.explain(&x).unwrap(), service.explain(&x).unwrap());
    }

    #[test]
    fn test_identical_instance_has_zero_attributions() {
        let model = Arc::new(LogisticRegression::new(vec![0.7, -1.3, 0.4], 0.2));
        let bg = Arc::new(BackgroundSample::new(array![[1.0, 1.0, 1.0]]).unwrap());
        let service = AttributionService::new(model, small_schema(), bg).unwrap();
        let result = service.explain(&FeatureVector::new(vec![1.0, 1.0, 1.0])).unwrap();
        assert!(result.iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_width_mismatch() {
        let model = Arc::new(LogisticRegression::new(vec![1.0, 1.0], 0.0));
        let err = AttributionService::new(model, small_schema(), background()).unwrap_err();
        assert!(matches!(err, CardioError::ExplainerUnavailable(_)));
    }
}
