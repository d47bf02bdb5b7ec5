//! CardioLens HTTP server
//!
//! Serves the prediction API, the population density data, the narrative
//! analysis endpoint and the web pages.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::{AppState, Capabilities};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::assembler::{ResultAssembler, ATTRIBUTION_DECIMALS, SIGNIFICANCE_THRESHOLD, TOP_K_FACTORS};
use crate::dataset::DEFAULT_LABEL_COLUMN;
use crate::explainability::DEFAULT_PERMUTATIONS;
use crate::narrative::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub dataset_path: PathBuf,
    pub label_column: String,
    pub templates_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub background_size: usize,
    pub background_seed: u64,
    pub explainer_permutations: usize,
    /// Decimal places kept in `shap_data`
    pub attribution_decimals: i32,
    /// Minimum magnitude of a significant factor (exclusive)
    pub significance_threshold: f64,
    /// Significant factors passed to the narrative
    pub top_k_factors: usize,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub llm_timeout: Duration,
    /// `None` or `"*"` allows any origin
    pub cors_origin: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env_or("API_HOST", "0.0.0.0"),
            port: env_parse("API_PORT", 5000),
            model_path: env_or("MODEL_PATH", "heart_disease_model.json").into(),
            dataset_path: env_or("DATASET_PATH", "heart_fully_cleaned_and_engineered.csv").into(),
            label_column: env_or("LABEL_COLUMN", DEFAULT_LABEL_COLUMN),
            templates_dir: env_or("TEMPLATES_DIR", "templates").into(),
            static_dir: Some(env_or("STATIC_DIR", "static").into()),
            background_size: env_parse("BACKGROUND_SIZE", 50),
            background_seed: env_parse("BACKGROUND_SEED", 0),
            explainer_permutations: env_parse("EXPLAINER_PERMUTATIONS", DEFAULT_PERMUTATIONS),
            attribution_decimals: env_parse("ATTRIBUTION_DECIMALS", ATTRIBUTION_DECIMALS),
            significance_threshold: env_parse("SIGNIFICANCE_THRESHOLD", SIGNIFICANCE_THRESHOLD),
            top_k_factors: env_parse("TOP_K_FACTORS", TOP_K_FACTORS),
            google_api_key: env_non_empty("GOOGLE_API_KEY"),
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            gemini_base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            llm_timeout: Duration::from_secs(env_parse("LLM_TIMEOUT_SECS", 60)),
            cors_origin: env_non_empty("CORS_ORIGIN"),
        }
    }
}

impl ServerConfig {
    /// Response rounding and factor ranking settings
    pub fn assembler(&self) -> ResultAssembler {
        ResultAssembler::new()
            .with_decimals(self.attribution_decimals)
            .with_threshold(self.significance_threshold)
            .with_top_k(self.top_k_factors)
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("model_path", &self.model_path)
            .field("dataset_path", &self.dataset_path)
            .field("label_column", &self.label_column)
            .field("templates_dir", &self.templates_dir)
            .field("static_dir", &self.static_dir)
            .field("background_size", &self.background_size)
            .field("background_seed", &self.background_seed)
            .field("explainer_permutations", &self.explainer_permutations)
            .field("attribution_decimals", &self.attribution_decimals)
            .field("significance_threshold", &self.significance_threshold)
            .field("top_k_factors", &self.top_k_factors)
            .field("google_api_key", &self.google_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_model", &self.gemini_model)
            .field("llm_timeout", &self.llm_timeout)
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        model_path = %config.model_path.display(),
        dataset_path = %config.dataset_path.display(),
        started_at = %start_time.to_rfc3339(),
        "Initializing CardioLens"
    );

    let state = Arc::new(AppState::initialize(&config));
    let caps = state.capabilities();
    if !caps.prediction {
        warn!("Starting in degraded mode: /predict will return errors until the model and dataset load");
    }

    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        address = %addr,
        dataset = caps.dataset,
        model = caps.model,
        explainer = caps.explainer,
        narrative = caps.narrative,
        "CardioLens server starting"
    );
    info!(url = %format!("http://{}", addr), "Web UI available");
    info!(url = %format!("http://{}/api/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
