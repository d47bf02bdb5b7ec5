//! Shared fixtures: a small population CSV and a matching model file

#![allow(dead_code)]

use cardiolens::model::{LogisticRegression, ModelArtifact, ModelFile};
use cardiolens::server::ServerConfig;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const FEATURES: [&str; 21] = [
    "Age",
    "RestingBP",
    "Cholesterol",
    "FastingBS",
    "RestingHR",
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
];

fn one_hot(width: usize, hot: usize) -> Vec<String> {
    (0..width).map(|k| if k == hot { "1".to_string() } else { "0".to_string() }).collect()
}

fn population_csv(rows: usize) -> String {
    let mut csv = FEATURES.join(",");
    csv.push_str(",HeartDisease\n");
    for i in 0..rows {
        let mut cells = vec![
            (40 + (i * 7) % 30).to_string(),
            (120 + (i * 11) % 40).to_string(),
            (180 + (i * 13) % 120).to_string(),
            u8::from(i % 3 == 0).to_string(),
            (60 + (i * 5) % 30).to_string(),
            (120 + (i * 17) % 60).to_string(),
            format!("{:.1}", (i % 5) as f64 * 0.5),
        ];
        cells.extend(one_hot(2, i % 2));
        cells.extend(one_hot(4, i % 4));
        cells.extend(one_hot(3, (i / 2) % 3));
        cells.extend(one_hot(2, (i / 3) % 2));
        cells.extend(one_hot(3, (i / 5) % 3));
        cells.push((i % 2).to_string());
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }
    csv
}

pub fn coefficients() -> Vec<f64> {
    FEATURES
        .iter()
        .map(|name| match *name {
            "Age" => 0.04,
            "RestingBP" => 0.01,
            "Cholesterol" => 0.004,
            "FastingBS" => 0.6,
            "MaxHR" => -0.03,
            "Oldpeak" => 0.7,
            "Sex_M" => 0.5,
            "ChestPainType_ASY" => 0.9,
            "ExerciseAngina_Y" => 0.8,
            "ST_Slope_Flat" => 1.1,
            "ST_Slope_Up" => -1.2,
            _ => 0.0,
        })
        .collect()
}

/// Temporary directory holding `heart.csv` and `model.json`
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("heart.csv"), population_csv(60)).unwrap();
        ModelFile::new(ModelArtifact::LogisticRegression(LogisticRegression::new(coefficients(), -2.0)))
            .with_feature_names(FEATURES.iter().map(|s| s.to_string()).collect())
            .save(dir.path().join("model.json"))
            .unwrap();
        Self { dir }
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.dir.path().join("heart.csv")
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.path().join("model.json")
    }

    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            model_path: self.model_path(),
            dataset_path: self.dataset_path(),
            label_column: "HeartDisease".to_string(),
            templates_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("templates"),
            static_dir: None,
            background_size: 20,
            background_seed: 7,
            explainer_permutations: 2,
            google_api_key: None,
            cors_origin: None,
            ..ServerConfig::default()
        }
    }
}

/// Config pointing at files that do not exist
pub fn degraded_config() -> ServerConfig {
    ServerConfig {
        model_path: "/nonexistent/model.json".into(),
        dataset_path: "/nonexistent/heart.csv".into(),
        templates_dir: "/nonexistent/templates".into(),
        static_dir: None,
        google_api_key: None,
        cors_origin: None,
        ..ServerConfig::default()
    }
}

pub fn scenario_record() -> serde_json::Value {
    serde_json::json!({
        "Sex": "M",
        "ChestPainType": "ATA",
        "RestingBP": 140,
        "Cholesterol": 289,
        "FastingBS": "0",
        "RestingECG": "Normal",
        "MaxHR": 172,
        "ExerciseAngina": "N",
        "Oldpeak": 0,
        "ST_Slope": "Up",
        "Age": 40
    })
}
