//! Result assembly
//!
//! Merges the classification and the attribution into the response returned
//! to clients, and ranks attributions into the short list of significant
//! factors used for narrative summaries.

use crate::explainability::AttributionResult;
use crate::inference::PredictionResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decimal places kept for attribution values
pub const ATTRIBUTION_DECIMALS: i32 = 4;

/// Attributions with magnitude at or below this are not significant
pub const SIGNIFICANCE_THRESHOLD: f64 = 0.01;

/// Number of significant factors exposed
pub const TOP_K_FACTORS: usize = 5;

/// JSON body of a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: u8,
    /// P(no disease) as a percentage string, e.g. `"85.23%"`
    pub confidence_low_risk: String,
    /// P(disease) as a percentage string
    pub confidence_high_risk: String,
    pub shap_data: BTreeMap<String, f64>,
}

/// One ranked attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantFactor {
    pub feature: String,
    pub value: f64,
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// `0.8523` -> `"85.23%"`
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Keep factors with `|value| > threshold`, order by magnitude (descending)
/// and return the first `k`.
///
/// Ties keep their input order, so callers pass factors in schema order.
pub fn rank_factors<'a, I>(factors: I, threshold: f64, k: usize) -> Vec<SignificantFactor>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut kept: Vec<(usize, &str, f64)> = factors
        .into_iter()
        .enumerate()
        .filter(|(_, (_, v))| v.abs() > threshold)
        .map(|(i, (name, v))| (i, name, v))
        .collect();

    kept.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()).then_with(|| a.0.cmp(&b.0)));

    kept.into_iter()
        .take(k)
        .map(|(_, name, value)| SignificantFactor {
            feature: name.to_string(),
            value,
        })
        .collect()
}

/// Response formatting and factor ranking settings
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    decimals: i32,
    threshold: f64,
    top_k: usize,
}

impl Default for ResultAssembler {
    fn default() -> Self {
        Self {
            decimals: ATTRIBUTION_DECIMALS,
            threshold: SIGNIFICANCE_THRESHOLD,
            top_k: TOP_K_FACTORS,
        }
    }
}

impl ResultAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decimals(mut self, decimals: i32) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn decimals(&self) -> i32 {
        self.decimals
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn assemble(&self, prediction: &PredictionResult, attribution: &AttributionResult) -> PredictionResponse {
        PredictionResponse {
            prediction: prediction.label,
            confidence_low_risk: format_percent(prediction.probabilities[0]),
            confidence_high_risk: format_percent(prediction.probabilities[1]),
            shap_data: attribution
                .iter()
                .map(|(name, v)| (name.to_string(), round_to(v, self.decimals)))
                .collect(),
        }
    }

    /// Ranked factors of an attribution, computed on the rounded values
    pub fn significant_factors(&self, attribution: &AttributionResult) -> Vec<SignificantFactor> {
        rank_factors(
            attribution.iter().map(|(name, v)| (name, round_to(v, self.decimals))),
            self.threshold,
            self.top_k,
        )
    }
}
