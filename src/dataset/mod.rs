//! Population dataset
//!
//! The reference table the classifier was trained on. It fixes the
//! [`FeatureSchema`], supplies the attribution background and feeds the
//! population density plots.

mod background;

pub use background::BackgroundSample;

use crate::error::{CardioError, Result};
use crate::preprocessing::FeatureSchema;
use ndarray::{Array2, Axis};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Default name of the outcome column
pub const DEFAULT_LABEL_COLUMN: &str = "HeartDisease";

/// Feature matrix and labels of the population table
#[derive(Debug, Clone)]
pub struct PopulationDataset {
    schema: Arc<FeatureSchema>,
    label_column: String,
    /// rows x schema columns; missing cells are NaN
    features: Array2<f64>,
    labels: Vec<f64>,
}

impl PopulationDataset {
    pub fn new(
        schema: Arc<FeatureSchema>,
        label_column: impl Into<String>,
        features: Array2<f64>,
        labels: Vec<f64>,
    ) -> Result<Self> {
        if features.ncols() != schema.len() {
            return Err(CardioError::ShapeError {
                expected: format!("{} feature columns", schema.len()),
                actual: format!("{} feature columns", features.ncols()),
            });
        }
        if features.nrows() != labels.len() {
            return Err(CardioError::ShapeError {
                expected: format!("{} labels", features.nrows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        Ok(Self {
            schema,
            label_column: label_column.into(),
            features,
            labels,
        })
    }

    /// Load a CSV file with a header row
    pub fn load_csv(path: impl AsRef<Path>, label_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path)
            .map_err(|e| CardioError::DataError(format!("{}: {}", path.display(), e)))?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .into_reader_with_file_handle(file)
            .finish()?;

        let dataset = Self::from_dataframe(&df, label_column)?;
        debug!(
            path = %path.display(),
            rows = dataset.n_rows(),
            columns = dataset.schema.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Population CSV parsed"
        );
        Ok(dataset)
    }

    /// Build from an in-memory frame; every column except the label becomes a feature
    pub fn from_dataframe(df: &DataFrame, label_column: &str) -> Result<Self> {
        let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        let schema = FeatureSchema::from_columns(columns, label_column)?;

        let mut features = Array2::<f64>::zeros((df.height(), schema.len()));
        for (j, name) in schema.ordered_feature_names().iter().enumerate() {
            let values = numeric_column(df, name)?;
            features.column_mut(j).assign(&ndarray::Array1::from(values));
        }
        let labels = numeric_column(df, label_column)?;

        Self::new(Arc::new(schema), label_column, features, labels)
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_some()
    }

    /// Finite values of a feature column restricted to rows with the given label
    pub fn column_by_label(&self, name: &str, label: f64) -> Option<Vec<f64>> {
        let idx = self.schema.index_of(name)?;
        Some(
            self.features
                .column(idx)
                .iter()
                .zip(&self.labels)
                .filter(|(v, l)| **l == label && v.is_finite())
                .map(|(v, _)| *v)
                .collect(),
        )
    }

    /// Indices of rows without missing feature values
    fn complete_rows(&self) -> Vec<usize> {
        self.features
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, row)| row.iter().all(|v| v.is_finite()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Draw up to `size` distinct complete rows with a seeded RNG
    pub fn background_sample(&self, size: usize, seed: u64) -> Result<BackgroundSample> {
        BackgroundSample::draw(&self.features, &self.complete_rows(), size, seed)
    }
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| CardioError::FeatureNotFound(name.to_string()))?;
    if matches!(column.dtype(), DataType::String) {
        return Err(CardioError::DataError(format!(
            "column '{}' is not numeric; categorical fields must be one-hot encoded",
            name
        )));
    }
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    let ca = series.f64()?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}
