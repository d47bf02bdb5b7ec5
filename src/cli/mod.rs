//! CardioLens CLI
//!
//! Runs the server, or answers one-off questions against the configured
//! model and population dataset.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::assembler::rank_factors;
use crate::dataset::PopulationDataset;
use crate::narrative::schema_ordered;
use crate::preprocessing::RawInput;
use crate::server::{run_server, AppState, ServerConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn warn(s: &str) -> ColoredString   { s.truecolor(240, 190, 90) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn flag(on: bool) -> ColoredString {
    if on { ok("available") } else { warn("unavailable") }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "cardiolens")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Heart-disease risk prediction with per-prediction feature attributions")]
#[command(long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub paths: PathArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Overrides for the environment configuration
#[derive(Args, Debug, Default)]
pub struct PathArgs {
    /// Model file (JSON)
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Population dataset (CSV)
    #[arg(long, global = true)]
    pub dataset: Option<PathBuf>,

    /// Outcome column in the dataset
    #[arg(long, global = true)]
    pub label_column: Option<String>,
}

impl PathArgs {
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(dataset) = &self.dataset {
            config.dataset_path = dataset.clone();
        }
        if let Some(label) = &self.label_column {
            config.label_column = label.clone();
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    Serve {
        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Server host
        #[arg(long)]
        host: Option<String>,

        /// Directory holding the page templates
        #[arg(long)]
        templates_dir: Option<PathBuf>,
    },

    /// Score one record and print the response JSON
    Predict {
        /// JSON object of field values, or @path to a JSON file
        #[arg(short, long)]
        input: String,
    },

    /// Print the feature schema derived from the dataset
    Schema,
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_serve(
    config: ServerConfig,
    host: Option<String>,
    port: Option<u16>,
    templates_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = config;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = templates_dir {
        config.templates_dir = dir;
    }

    let base = format!("http://{}:{}", config.host, config.port);
    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "CardioLens".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Web UI ", &base));
    line_box(&kv("Predict", &format!("{}/predict", base)));
    line_box(&kv("Health ", &format!("{}/api/health", base)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

fn read_input(input: &str) -> anyhow::Result<RawInput> {
    let json = match input.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => input.to_string(),
    };
    Ok(serde_json::from_str(&json)?)
}

pub fn cmd_predict(config: ServerConfig, input: &str) -> anyhow::Result<()> {
    let raw = read_input(input)?;

    let start = Instant::now();
    let state = AppState::initialize(&ServerConfig {
        google_api_key: None,
        ..config
    });
    let caps = state.capabilities();
    if !caps.prediction {
        section("Predict");
        println!("  {:<12} {}", muted("Dataset"), flag(caps.dataset));
        println!("  {:<12} {}", muted("Model"), flag(caps.model));
        println!("  {:<12} {}", muted("Explainer"), flag(caps.explainer));
        println!();
        anyhow::bail!("prediction is unavailable, see the log output above");
    }

    let response = state.predict_record(&raw)?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    let factors = rank_factors(
        schema_ordered(&response.shap_data, state.schema()),
        state.assembler.threshold(),
        state.assembler.top_k(),
    );
    eprintln!();
    eprintln!(
        "  {:<14} {}",
        muted("Risk"),
        if response.prediction == 1 { "high".red().bold() } else { "low".green().bold() }
    );
    eprintln!("  {:<14} {}", muted("P(disease)"), response.confidence_high_risk.as_str().white());
    for f in &factors {
        let value = format!("{:+.4}", f.value);
        let value = if f.value > 0.0 { value.as_str().red() } else { value.as_str().green() };
        eprintln!("  {:<14} {}", muted(&f.feature), value);
    }
    eprintln!("  {:<14} {}", muted("Time"), dim(&format!("{:?}", start.elapsed())));
    Ok(())
}

pub fn cmd_schema(config: &ServerConfig) -> anyhow::Result<()> {
    section("Feature Schema");

    let dataset = PopulationDataset::load_csv(&config.dataset_path, &config.label_column)?;
    let schema = dataset.schema();

    println!("  {:<12} {}", muted("File"), config.dataset_path.display());
    println!("  {:<12} {}", muted("Rows"), dataset.n_rows());
    println!("  {:<12} {}", muted("Label"), dataset.label_column());
    println!("  {:<12} {}", muted("Features"), schema.len());
    println!();

    println!("  {:<4} {:<24} {}", muted("#"), muted("Column"), muted("Kind"));
    println!("  {}", dim(&"─".repeat(50)));
    for (i, name) in schema.ordered_feature_names().iter().enumerate() {
        let kind = if schema.is_categorical(i) { "one-hot".cyan() } else { "numeric".white() };
        println!("  {:<4} {:<24} {}", i, name, kind);
    }

    if !schema.categorical_groups().is_empty() {
        section("Categorical Fields");
        for group in schema.categorical_groups() {
            let categories: Vec<&str> = group.categories().collect();
            println!("  {:<16} {}", group.field().white(), dim(&categories.join(", ")));
        }
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inline_input() {
        let raw = read_input(r#"{"Age": 40, "Sex": "M"}"#).unwrap();
        assert_eq!(raw.len(), 2);
        assert!(read_input("[1, 2]").is_err());
    }

    #[test]
    fn test_path_overrides() {
        let args = PathArgs {
            model: Some("m.json".into()),
            dataset: None,
            label_column: Some("Target".to_string()),
        };
        let config = args.apply(ServerConfig::default());
        assert_eq!(config.model_path, PathBuf::from("m.json"));
        assert_eq!(config.label_column, "Target");
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["cardiolens", "predict", "--input", "{}", "--model", "x.json"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Predict { .. })));
        assert_eq!(cli.paths.model, Some(PathBuf::from("x.json")));
        let cli = Cli::try_parse_from(["cardiolens"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1mbold\x1b[0m"), "bold");
    }
}
