//! Application state
//!
//! Built once at startup and shared read-only by every request. Each
//! capability is optional: a failed load is logged and the dependent
//! endpoints answer with an "unavailable" error instead of crashing.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::assembler::{PredictionResponse, ResultAssembler};
use crate::dataset::PopulationDataset;
use crate::error::{CardioError, Result as CardioResult};
use crate::explainability::AttributionService;
use crate::inference::PredictionService;
use crate::model::{Classifier, ModelFile};
use crate::narrative::{GeminiClient, GeminiConfig, NarrativeService};
use crate::plotting::DensityPlotter;
use crate::preprocessing::{FeatureSchema, RawInput, RecordNormalizer};

use super::error::{Result, ServerError};
use super::ServerConfig;

pub(crate) const PREDICTION_UNAVAILABLE: &str =
    "Model, reference data, or attribution explainer not loaded. Check server logs.";
pub(crate) const DATASET_UNAVAILABLE: &str = "Population data not loaded on server.";
pub(crate) const NARRATIVE_UNAVAILABLE: &str = "Google API Key not configured on server. Set GOOGLE_API_KEY.";

/// Which capabilities initialized successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub dataset: bool,
    pub model: bool,
    pub explainer: bool,
    pub narrative: bool,
    /// Normalizer, model and explainer all present
    pub prediction: bool,
}

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub dataset: Option<Arc<PopulationDataset>>,
    pub normalizer: Option<RecordNormalizer>,
    pub predictor: Option<PredictionService>,
    pub explainer: Option<AttributionService>,
    pub narrative: Option<NarrativeService>,
    pub assembler: ResultAssembler,
    pub plotter: DensityPlotter,
}

/// Load the model file and check it against the dataset schema
fn load_classifier(path: &Path, schema: &FeatureSchema) -> CardioResult<Arc<dyn Classifier>> {
    let file = ModelFile::load(path)?;
    if let Some(names) = &file.feature_names {
        if names.as_slice() != schema.ordered_feature_names() {
            return Err(CardioError::ModelUnavailable(
                "model feature names do not match the population dataset columns".to_string(),
            ));
        }
    }
    info!(path = %path.display(), model_type = file.model.kind(), "Model loaded");
    Ok(file.into_classifier())
}

impl AppState {
    /// Load every capability named by `config`, logging each outcome
    pub fn initialize(config: &ServerConfig) -> Self {
        let dataset = match PopulationDataset::load_csv(&config.dataset_path, &config.label_column) {
            Ok(ds) => {
                info!(
                    path = %config.dataset_path.display(),
                    rows = ds.n_rows(),
                    "Population dataset loaded"
                );
                Some(Arc::new(ds))
            }
            Err(e) => {
                error!(path = %config.dataset_path.display(), error = %e, "Failed to load population dataset");
                None
            }
        };

        let schema = dataset.as_ref().map(|ds| Arc::clone(ds.schema()));
        if let Some(schema) = &schema {
            info!(
                features = schema.len(),
                categorical_groups = schema.categorical_groups().len(),
                "Feature schema derived"
            );
        }

        let classifier = match &schema {
            Some(schema) => match load_classifier(&config.model_path, schema) {
                Ok(c) => Some(c),
                Err(e) => {
                    error!(path = %config.model_path.display(), error = %e, "Failed to load model");
                    None
                }
            },
            None => {
                warn!("Skipping model load: no feature schema without the population dataset");
                None
            }
        };

        let predictor = match (&classifier, &schema) {
            (Some(c), Some(schema)) => match PredictionService::new(Arc::clone(c), schema) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!(error = %e, "Model does not fit the feature schema");
                    None
                }
            },
            _ => None,
        };

        let explainer = match (&dataset, &predictor) {
            (Some(ds), Some(p)) => Self::build_explainer(config, ds, p.classifier()),
            _ => None,
        };

        let assembler = config.assembler();
        info!(
            decimals = assembler.decimals(),
            threshold = assembler.threshold(),
            top_k = assembler.top_k(),
            "Result assembler configured"
        );

        let narrative = match &config.google_api_key {
            Some(key) => {
                let gemini = GeminiConfig::new(key.clone())
                    .with_model(config.gemini_model.clone())
                    .with_base_url(config.gemini_base_url.clone())
                    .with_timeout(config.llm_timeout);
                match GeminiClient::new(gemini) {
                    Ok(client) => {
                        info!(model = %config.gemini_model, "Narrative client configured");
                        Some(NarrativeService::new(client).with_assembler(assembler.clone()))
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to configure narrative client");
                        None
                    }
                }
            }
            None => {
                warn!("GOOGLE_API_KEY not set, narrative analysis disabled");
                None
            }
        };

        Self {
            config: config.clone(),
            normalizer: schema.map(RecordNormalizer::new),
            dataset,
            predictor,
            explainer,
            narrative,
            assembler,
            plotter: DensityPlotter::default(),
        }
    }

    fn build_explainer(
        config: &ServerConfig,
        dataset: &PopulationDataset,
        classifier: &Arc<dyn Classifier>,
    ) -> Option<AttributionService> {
        let built = dataset
            .background_sample(config.background_size, config.background_seed)
            .and_then(|bg| {
                let rows = bg.len();
                AttributionService::new(Arc::clone(classifier), Arc::clone(dataset.schema()), Arc::new(bg))
                    .map(|svc| (svc, rows))
            });
        match built {
            Ok((svc, rows)) => {
                let svc = svc
                    .with_permutations(config.explainer_permutations)
                    .with_seed(config.background_seed);
                info!(
                    background_rows = rows,
                    permutations = config.explainer_permutations,
                    base_value = svc.base_value(),
                    "Attribution explainer initialised"
                );
                Some(svc)
            }
            Err(e) => {
                error!(error = %e, "Failed to initialise attribution explainer");
                None
            }
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            dataset: self.dataset.is_some(),
            model: self.predictor.is_some(),
            explainer: self.explainer.is_some(),
            narrative: self.narrative.is_some(),
            prediction: self.normalizer.is_some() && self.predictor.is_some() && self.explainer.is_some(),
        }
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.dataset.as_ref().map(|ds| ds.schema().as_ref())
    }

    /// Fails fast when any part of the prediction path is missing
    pub fn require_prediction(&self) -> Result<()> {
        if self.capabilities().prediction {
            Ok(())
        } else {
            Err(ServerError::Unavailable(PREDICTION_UNAVAILABLE))
        }
    }

    /// Normalize, classify, explain and assemble one record.
    ///
    /// Synchronous; the attribution step dominates the cost.
    pub fn predict_record(&self, raw: &RawInput) -> Result<PredictionResponse> {
        let (Some(normalizer), Some(predictor), Some(explainer)) =
            (&self.normalizer, &self.predictor, &self.explainer)
        else {
            return Err(ServerError::Unavailable(PREDICTION_UNAVAILABLE));
        };

        let record = normalizer.normalize(raw)?;
        for ignored in &record.ignored_categories {
            warn!(field = %ignored.field, value = %ignored.value, "Unrecognized category value ignored");
        }

        let prediction = predictor.predict(&record.vector)?;
        let attribution = explainer.explain(&record.vector)?;
        Ok(self.assembler.assemble(&prediction, &attribution))
    }
}
