//! Population density curves
//!
//! Gaussian kernel density estimates of selected features, split by outcome
//! label, for overlaying a patient's values on the population distribution.

use crate::dataset::PopulationDataset;
use crate::error::{CardioError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::warn;

/// Features plotted by default
pub const DEFAULT_PLOT_FEATURES: [&str; 5] = ["RestingBP", "Cholesterol", "RestingHR", "MaxHR", "Oldpeak"];

/// KDE configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdeConfig {
    /// Number of evaluation points between the sample min and max
    pub grid_points: usize,
}

impl Default for KdeConfig {
    fn default() -> Self {
        Self { grid_points: 200 }
    }
}

/// Density curves of one feature for both outcome groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDensity {
    pub no_disease_x: Vec<f64>,
    pub no_disease_y: Vec<f64>,
    pub heart_disease_x: Vec<f64>,
    pub heart_disease_y: Vec<f64>,
}

/// Gaussian KDE with Scott's rule bandwidth
#[derive(Debug, Clone)]
pub struct GaussianKde {
    samples: Vec<f64>,
    bandwidth: f64,
}

impl GaussianKde {
    pub fn new(samples: Vec<f64>) -> Result<Self> {
        let n = samples.len();
        if n < 2 {
            return Err(CardioError::DataError(format!(
                "density estimate needs at least 2 points, got {}",
                n
            )));
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let std = var.sqrt();
        if !std.is_finite() || std == 0.0 {
            return Err(CardioError::DataError(
                "density estimate needs non-zero variance".to_string(),
            ));
        }
        let bandwidth = std * (n as f64).powf(-0.2);
        Ok(Self { samples, bandwidth })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let norm = 1.0 / (self.samples.len() as f64 * self.bandwidth * (2.0 * PI).sqrt());
        let sum: f64 = self
            .samples
            .iter()
            .map(|s| {
                let z = (x - s) / self.bandwidth;
                (-0.5 * z * z).exp()
            })
            .sum();
        sum * norm
    }

    /// Evaluate on `points` evenly spaced values between the sample min and max
    pub fn curve(&self, points: usize) -> (Vec<f64>, Vec<f64>) {
        let min = self.samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let xs = linspace(min, max, points);
        let ys = xs.iter().map(|&x| self.evaluate(x)).collect();
        (xs, ys)
    }
}

fn linspace(start: f64, end: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (points - 1) as f64;
            (0..points)
                .map(|i| if i == points - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Builds density curves from the population dataset
#[derive(Debug, Clone, Default)]
pub struct DensityPlotter {
    config: KdeConfig,
}

impl DensityPlotter {
    pub fn new(config: KdeConfig) -> Self {
        Self { config }
    }

    /// Curves for each requested feature present in the dataset
    pub fn plot_data(&self, dataset: &PopulationDataset, features: &[&str]) -> Result<BTreeMap<String, FeatureDensity>> {
        let present: Vec<&str> = features
            .iter()
            .copied()
            .filter(|name| {
                let found = dataset.has_column(name);
                if !found {
                    warn!(feature = %name, "Plot feature not found in population dataset");
                }
                found
            })
            .collect();

        present
            .par_iter()
            .map(|name| Ok((name.to_string(), self.feature_density(dataset, name)?)))
            .collect()
    }

    fn feature_density(&self, dataset: &PopulationDataset, name: &str) -> Result<FeatureDensity> {
        let group = |label: f64| -> Result<(Vec<f64>, Vec<f64>)> {
            let values = dataset
                .column_by_label(name, label)
                .ok_or_else(|| CardioError::FeatureNotFound(name.to_string()))?;
            let kde = GaussianKde::new(values)
                .map_err(|e| CardioError::DataError(format!("{} (label {}): {}", name, label, e)))?;
            Ok(kde.curve(self.config.grid_points))
        };
        let (no_disease_x, no_disease_y) = group(0.0)?;
        let (heart_disease_x, heart_disease_y) = group(1.0)?;
        Ok(FeatureDensity {
            no_disease_x,
            no_disease_y,
            heart_disease_x,
            heart_disease_y,
        })
    }
}

/// Density curves for `features` using the default grid
pub fn plot_data(dataset: &PopulationDataset, features: &[&str]) -> Result<BTreeMap<String, FeatureDensity>> {
    DensityPlotter::default().plot_data(dataset, features)
}
