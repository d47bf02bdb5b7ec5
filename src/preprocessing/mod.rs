//! Request preprocessing
//!
//! Turns a sparse, partly categorical client record into the dense feature
//! vector the classifier expects:
//! - [`FeatureSchema`]: ordered training columns and one-hot groups
//! - [`RawInput`] / [`FieldValue`]: what a client may send
//! - [`RecordNormalizer`]: the deterministic `RawInput -> FeatureVector` step

mod normalizer;
mod record;
mod schema;

pub use normalizer::{IgnoredCategory, NormalizedRecord, RecordNormalizer};
pub use record::{FeatureVector, FieldValue, RawInput};
pub use schema::{CategoricalGroup, FeatureSchema, DEFAULT_CATEGORICAL_FIELDS};

#[cfg(test)]
pub(crate) use schema::heart_columns;
