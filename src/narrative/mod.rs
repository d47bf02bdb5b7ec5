//! Natural-language risk summaries
//!
//! Builds the analyst prompt from a patient record and its ranked
//! attributions, and forwards it to a generative-text API. The returned text
//! is passed through untouched.

mod client;
mod prompt;

pub use client::{GeminiClient, GeminiConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use prompt::{build_user_prompt, factors_section, NarrativeRequest, SYSTEM_PROMPT};

use crate::assembler::{rank_factors, ResultAssembler, SignificantFactor};
use crate::error::Result;
use crate::preprocessing::FeatureSchema;

/// Order client-supplied attributions by schema position so ties rank the
/// same way as on the prediction path. Names unknown to the schema go last.
pub fn schema_ordered<'a>(
    shap_data: impl IntoIterator<Item = (&'a String, &'a f64)>,
    schema: Option<&FeatureSchema>,
) -> Vec<(&'a str, f64)> {
    let mut entries: Vec<(&str, f64)> = shap_data.into_iter().map(|(k, v)| (k.as_str(), *v)).collect();
    if let Some(schema) = schema {
        entries.sort_by_key(|(name, _)| schema.index_of(name).unwrap_or(usize::MAX));
    }
    entries
}

/// Prompt assembly plus the text-generation client
#[derive(Debug, Clone)]
pub struct NarrativeService {
    client: GeminiClient,
    assembler: ResultAssembler,
}

impl NarrativeService {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client,
            assembler: ResultAssembler::default(),
        }
    }

    pub fn with_assembler(mut self, assembler: ResultAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    /// Ranked factors for a request's attribution values
    pub fn factors(&self, request: &NarrativeRequest, schema: Option<&FeatureSchema>) -> Vec<SignificantFactor> {
        rank_factors(
            schema_ordered(&request.shap_data, schema),
            self.assembler.threshold(),
            self.assembler.top_k(),
        )
    }

    pub fn user_prompt(&self, request: &NarrativeRequest, schema: Option<&FeatureSchema>) -> String {
        build_user_prompt(request, &self.factors(request, schema))
    }

    pub async fn summarize(&self, request: &NarrativeRequest, schema: Option<&FeatureSchema>) -> Result<String> {
        let user_text = self.user_prompt(request, schema);
        self.client.generate(SYSTEM_PROMPT, &user_text).await
    }
}
