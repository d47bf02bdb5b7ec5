//! Feature schema: the fixed column order the classifier was trained on

use crate::error::{CardioError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Logical fields that were one-hot expanded when the training table was built.
pub const DEFAULT_CATEGORICAL_FIELDS: [&str; 5] = [
    "Sex",
    "ChestPainType",
    "RestingECG",
    "ExerciseAngina",
    "ST_Slope",
];

/// A categorical field and its mutually exclusive one-hot columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoricalGroup {
    field: String,
    /// Full column names in schema order, e.g. `Sex_F`, `Sex_M`
    columns: Vec<String>,
}

impl CategoricalGroup {
    fn prefix_len(&self) -> usize {
        self.field.len() + 1
    }

    /// Logical field name, e.g. `ChestPainType`
    pub fn field(&self) -> &str {
        &self.field
    }

    /// One-hot column names belonging to this group
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Category values this group understands (`ATA`, `NAP`, ...)
    pub fn categories(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(move |c| &c[self.prefix_len()..])
    }

    /// Column that encodes `category`, if the category is known
    pub fn column_for(&self, category: &str) -> Option<&str> {
        let prefix_len = self.prefix_len();
        self.columns
            .iter()
            .find(|c| &c[prefix_len..] == category)
            .map(String::as_str)
    }
}

/// Ordered model input columns plus the categorical expansion rules.
///
/// Built once at startup and shared read-only for the lifetime of the process.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSchema {
    names: Vec<String>,
    groups: Vec<CategoricalGroup>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    categorical: Vec<bool>,
}

impl FeatureSchema {
    /// Build a schema using [`DEFAULT_CATEGORICAL_FIELDS`]
    pub fn new(names: Vec<String>) -> Result<Self> {
        Self::with_categorical_fields(names, &DEFAULT_CATEGORICAL_FIELDS)
    }

    /// Build a schema, grouping every column named `<field>_<category>` under `field`
    pub fn with_categorical_fields(names: Vec<String>, fields: &[&str]) -> Result<Self> {
        if names.is_empty() {
            return Err(CardioError::DataError(
                "feature schema must contain at least one column".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(CardioError::DataError(format!("duplicate feature column: {}", name)));
            }
        }

        let mut categorical = vec![false; names.len()];
        let mut groups = Vec::new();
        for field in fields {
            let prefix = format!("{}_", field);
            let columns: Vec<String> = names
                .iter()
                .enumerate()
                .filter(|(i, name)| !categorical[*i] && name.len() > prefix.len() && name.starts_with(&prefix))
                .map(|(_, name)| name.clone())
                .collect();
            if columns.is_empty() {
                continue;
            }
            for column in &columns {
                categorical[index[column]] = true;
            }
            groups.push(CategoricalGroup {
                field: (*field).to_string(),
                columns,
            });
        }

        Ok(Self {
            names,
            groups,
            index,
            categorical,
        })
    }

    /// Derive the schema from a dataset's header by dropping the label column.
    ///
    /// Column order is preserved. Fails if the label column is not present.
    pub fn from_columns<I, S>(columns: I, label_column: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut found_label = false;
        let names: Vec<String> = columns
            .into_iter()
            .map(Into::into)
            .filter(|name| {
                if name == label_column {
                    found_label = true;
                    false
                } else {
                    true
                }
            })
            .collect();

        if !found_label {
            return Err(CardioError::FeatureNotFound(label_column.to_string()));
        }
        Self::new(names)
    }

    pub fn ordered_feature_names(&self) -> &[String] {
        &self.names
    }

    pub fn categorical_groups(&self) -> &[CategoricalGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Whether the column at `idx` is a one-hot column
    pub fn is_categorical(&self, idx: usize) -> bool {
        self.categorical.get(idx).copied().unwrap_or(false)
    }

    pub fn group(&self, field: &str) -> Option<&CategoricalGroup> {
        self.groups.iter().find(|g| g.field == field)
    }

    /// Plain numeric columns with their positions
    pub fn numeric_features(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .filter(move |(i, _)| !self.categorical[*i])
            .map(|(i, name)| (i, name.as_str()))
    }
}

impl PartialEq for FeatureSchema {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names && self.groups == other.groups
    }
}

#[cfg(test)]
pub(crate) fn heart_columns() -> Vec<String> {
    [
        "Age",
        "RestingBP",
        "Cholesterol",
        "FastingBS",
        "MaxHR",
        "Oldpeak",
        "Sex_F",
        "Sex_M",
        "ChestPainType_ASY",
        "ChestPainType_ATA",
        "ChestPainType_NAP",
        "ChestPainType_TA",
        "RestingECG_LVH",
        "RestingECG_Normal",
        "RestingECG_ST",
        "ExerciseAngina_N",
        "ExerciseAngina_Y",
        "ST_Slope_Down",
        "ST_Slope_Flat",
        "ST_Slope_Up",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
