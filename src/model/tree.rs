//! Tree-based classifiers: single tree, random forest, gradient boosting

use super::{check_width, sigmoid, Classifier};
use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Decision tree node.
///
/// Samples with `x[feature_idx] <= threshold` go left.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn evaluate(&self, sample: &ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature_idx] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    fn validate(&self, n_features: usize) -> Result<()> {
        match self {
            TreeNode::Leaf { value } if value.is_finite() => Ok(()),
            TreeNode::Leaf { .. } => Err(CardioError::ModelUnavailable(
                "tree leaf holds a non-finite value".to_string(),
            )),
            TreeNode::Split {
                feature_idx,
                left,
                right,
                ..
            } => {
                if *feature_idx >= n_features {
                    return Err(CardioError::ModelUnavailable(format!(
                        "tree splits on feature {} but the model has {} features",
                        feature_idx, n_features
                    )));
                }
                left.validate(n_features)?;
                right.validate(n_features)
            }
        }
    }
}

/// Single tree whose leaves hold P(positive class)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub n_features: usize,
    pub root: TreeNode,
}

impl DecisionTree {
    fn raw_predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.root.evaluate(&row)).collect()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.root.validate(self.n_features)
    }
}

impl Classifier for DecisionTree {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(x, self.n_features)?;
        Ok(self.raw_predict(x))
    }
}

/// Forest of probability trees; the output is the mean over trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<TreeNode>,
}

impl RandomForest {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(CardioError::ModelUnavailable("random forest has no trees".to_string()));
        }
        self.trees.iter().try_for_each(|t| t.validate(self.n_features))
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(x, self.n_features)?;
        let n_trees = self.trees.len() as f64;
        Ok(x.rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.evaluate(&row)).sum::<f64>() / n_trees)
            .collect())
    }
}

/// Boosted regression trees on the log-odds scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    pub n_features: usize,
    pub initial_log_odds: f64,
    pub learning_rate: f64,
    pub trees: Vec<TreeNode>,
}

impl GradientBoostingClassifier {
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.initial_log_odds.is_finite() || !self.learning_rate.is_finite() {
            return Err(CardioError::ModelUnavailable(
                "gradient boosting has non-finite parameters".to_string(),
            ));
        }
        self.trees.iter().try_for_each(|t| t.validate(self.n_features))
    }
}

impl Classifier for GradientBoostingClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(x, self.n_features)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let log_odds = self.trees.iter().fold(self.initial_log_odds, |acc, t| {
                    acc + self.learning_rate * t.evaluate(&row)
                });
                sigmoid(log_odds)
            })
            .collect())
    }
}
