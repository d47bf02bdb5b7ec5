//! Record normalization: sparse client input to a dense feature vector

use super::record::{FeatureVector, RawInput};
use super::schema::FeatureSchema;
use crate::error::{CardioError, Result};
use serde::Serialize;
use std::sync::Arc;

/// A categorical value that matched no column in its group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IgnoredCategory {
    pub field: String,
    pub value: String,
}

/// Normalizer output
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    pub vector: FeatureVector,
    /// Unknown category values; their groups were left all-zero
    pub ignored_categories: Vec<IgnoredCategory>,
}

/// Turns a [`RawInput`] into a [`FeatureVector`] aligned with the schema.
///
/// Missing numeric fields default to 0, absent or unrecognized categorical
/// values leave the whole one-hot group at 0, and fields unknown to the
/// schema are dropped.
#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    schema: Arc<FeatureSchema>,
}

impl RecordNormalizer {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn normalize(&self, raw: &RawInput) -> Result<NormalizedRecord> {
        let mut vector = FeatureVector::zeros(self.schema.len());
        let mut ignored_categories = Vec::new();

        for group in self.schema.categorical_groups() {
            let Some(category) = raw.get(group.field()).and_then(|v| v.as_category()) else {
                continue;
            };
            match group.column_for(&category).and_then(|c| self.schema.index_of(c)) {
                Some(idx) => vector.set(idx, 1.0),
                None => ignored_categories.push(IgnoredCategory {
                    field: group.field().to_string(),
                    value: category,
                }),
            }
        }

        for (idx, name) in self.schema.numeric_features() {
            let Some(value) = raw.get(name) else {
                continue;
            };
            let numeric = value.to_numeric().map_err(|_| {
                CardioError::InvalidInput(format!("field '{}' expects a number, got {:?}", name, value.to_string()))
            })?;
            if let Some(v) = numeric {
                vector.set(idx, v);
            }
        }

        Ok(NormalizedRecord {
            vector,
            ignored_categories,
        })
    }
}
