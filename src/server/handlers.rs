//! Request handlers

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Html,
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::assembler::PredictionResponse;
use crate::narrative::NarrativeRequest;
use crate::plotting::{FeatureDensity, DEFAULT_PLOT_FEATURES};
use crate::preprocessing::RawInput;

use super::error::{Result, ServerError};
use super::state::{AppState, DATASET_UNAVAILABLE, NARRATIVE_UNAVAILABLE};

// ============================================================================
// Pages
// ============================================================================

async fn render_template(state: &AppState, name: &str) -> Result<Html<String>> {
    let path = state.config.templates_dir.join(name);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Template not readable");
            Err(ServerError::NotFound(format!("Page template '{}' not found", name)))
        }
    }
}

pub async fn serve_index(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    render_template(&state, "index.html").await
}

pub async fn serve_predictor(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    render_template(&state, "predictor.html").await
}

pub async fn serve_analysis(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    render_template(&state, "analysis.html").await
}

// ============================================================================
// Prediction
// ============================================================================

pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<RawInput>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    // Degraded mode answers before looking at the body
    state.require_prediction()?;

    let Json(raw) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    debug!(fields = raw.len(), "Prediction request received");

    let worker_state = Arc::clone(&state);
    let response = tokio::task::spawn_blocking(move || worker_state.predict_record(&raw))
        .await
        .map_err(|e| ServerError::Internal(format!("prediction task failed: {}", e)))??;

    info!(
        prediction = response.prediction,
        confidence_high_risk = %response.confidence_high_risk,
        "Prediction served"
    );
    Ok(Json(response))
}

// ============================================================================
// Population plots
// ============================================================================

pub async fn plot_data(State(state): State<Arc<AppState>>) -> Result<Json<BTreeMap<String, FeatureDensity>>> {
    let dataset = state
        .dataset
        .as_ref()
        .ok_or(ServerError::Unavailable(DATASET_UNAVAILABLE))?;
    let plots = state
        .plotter
        .plot_data(dataset, &DEFAULT_PLOT_FEATURES)
        .map_err(|e| ServerError::Plotting(e.to_string()))?;
    Ok(Json(plots))
}

// ============================================================================
// Narrative analysis
// ============================================================================

pub async fn ai_analysis(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<NarrativeRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let narrative = state
        .narrative
        .as_ref()
        .ok_or(ServerError::Unavailable(NARRATIVE_UNAVAILABLE))?;
    let Json(request) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let text = narrative
        .summarize(&request, state.schema())
        .await
        .map_err(|e| ServerError::Upstream(e.to_string()))?;

    info!(model = %narrative.model(), chars = text.len(), "Narrative analysis served");
    Ok(Json(json!({ "text": text })))
}

// ============================================================================
// Health
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let caps = state.capabilities();
    Json(json!({
        "status": if caps.prediction { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "capabilities": caps,
    }))
}
