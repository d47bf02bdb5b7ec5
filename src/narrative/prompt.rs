//! Prompt construction for the narrative summary

use crate::assembler::SignificantFactor;
use crate::preprocessing::FieldValue;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Instruction sent as the model's system prompt
pub const SYSTEM_PROMPT: &str = "You are a compassionate health analyst and cardiologist. \
Your job is to explain a person's heart disease risk using their data and their personal SHAP \
(SHapley Additive exPlanations) values. Do not give medical advice or a diagnosis. Your response must be in Markdown.\n\
**Key Concepts to Use:**\
1.  **SHAP Values:** The user will provide SHAP values. A **positive SHAP value** means that feature \
**pushed the prediction towards 'Heart Disease'**. A **negative SHAP value** means it **pushed the prediction \
towards 'No Heart Disease'**. The *magnitude* shows its importance.\
2.  **Population Comparison (Like the plots):** The user will provide their personal values (e.g., 'Cholesterol: 270'). \
You must compare this to general health ranges to give context. For example, 'Your Cholesterol of 270 is high. \
This is a level more commonly seen in populations with heart disease.'\n\
**Your Response Structure:**\
1.  **Summary:** Start with a brief, clear summary of their AI-predicted result.\
2.  **Key Factors (Based on SHAP):** Create a bulleted list of the *most significant factors* from their SHAP list. \
For each factor, explain **what their value was** (e.g., 'ST_Slope: Up') and **how it influenced the result** \
using the SHAP value (e.g., 'This was the *strongest factor* pushing your risk *higher*...').\
3.  **Context (Based on Population Plots):** Weave in explanations for *why* their personal values matter \
(e.g., 'Your Resting Blood Pressure of 148 is elevated...').\
4.  **Conclusion:** End with a friendly, encouraging general wellness statement.";

/// Body of an analysis request: the patient record as entered, the
/// prediction shown to the user and the attribution values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NarrativeRequest {
    #[serde(rename = "Age")]
    pub age: Option<FieldValue>,
    #[serde(rename = "Sex")]
    pub sex: Option<FieldValue>,
    #[serde(rename = "ChestPainType")]
    pub chest_pain_type: Option<FieldValue>,
    #[serde(rename = "RestingBP")]
    pub resting_bp: Option<FieldValue>,
    #[serde(rename = "Cholesterol")]
    pub cholesterol: Option<FieldValue>,
    #[serde(rename = "FastingBS")]
    pub fasting_bs: Option<FieldValue>,
    #[serde(rename = "RestingECG")]
    pub resting_ecg: Option<FieldValue>,
    #[serde(rename = "MaxHR")]
    pub max_hr: Option<FieldValue>,
    #[serde(rename = "ExerciseAngina")]
    pub exercise_angina: Option<FieldValue>,
    #[serde(rename = "Oldpeak")]
    pub oldpeak: Option<FieldValue>,
    #[serde(rename = "ST_Slope")]
    pub st_slope: Option<FieldValue>,
    #[serde(rename = "RestingHR")]
    pub resting_hr: Option<FieldValue>,
    #[serde(rename = "HRV")]
    pub hrv: Option<FieldValue>,
    pub prediction: Option<FieldValue>,
    pub confidence: Option<FieldValue>,
    #[serde(default)]
    pub shap_data: BTreeMap<String, f64>,
}

fn show(value: &Option<FieldValue>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "N/A".to_string(),
    }
}

fn yes_no(value: &Option<FieldValue>, yes: &str) -> &'static str {
    match value {
        Some(v) if v.as_category().as_deref() == Some(yes) => "Yes",
        _ => "No",
    }
}

/// The factor list block appended to the user message
pub fn factors_section(factors: &[SignificantFactor]) -> String {
    if factors.is_empty() {
        return "\nNo single factor strongly influenced this prediction.\n".to_string();
    }
    let mut out = String::from("\nHere are the top factors that influenced your specific prediction:\n");
    for factor in factors {
        let _ = writeln!(out, "- {} (SHAP Value: {:.4})", factor.feature, factor.value);
    }
    out
}

/// User message: record lines, then the ranked factors
pub fn build_user_prompt(request: &NarrativeRequest, factors: &[SignificantFactor]) -> String {
    let r = request;
    let mut out = String::from("Here is my data:\n");
    let _ = writeln!(out, "- My AI-predicted risk: {} (Confidence: {})", show(&r.prediction), show(&r.confidence));
    let _ = writeln!(out, "- Age: {}", show(&r.age));
    let _ = writeln!(out, "- Sex: {}", show(&r.sex));
    let _ = writeln!(out, "- Chest Pain Type: {}", show(&r.chest_pain_type));
    let _ = writeln!(out, "- Resting Blood Pressure: {} mm Hg", show(&r.resting_bp));
    let _ = writeln!(out, "- Cholesterol: {} mg/dl", show(&r.cholesterol));
    let _ = writeln!(out, "- Fasting Blood Sugar > 120 mg/dl: {}", yes_no(&r.fasting_bs, "1"));
    let _ = writeln!(out, "- Resting ECG: {}", show(&r.resting_ecg));
    let _ = writeln!(out, "- Max Heart Rate: {} bpm", show(&r.max_hr));
    let _ = writeln!(out, "- Exercise-Induced Angina: {}", yes_no(&r.exercise_angina, "Y"));
    let _ = writeln!(out, "- Oldpeak (ST Depression): {}", show(&r.oldpeak));
    let _ = writeln!(out, "- ST Slope: {}", show(&r.st_slope));
    let _ = writeln!(out, "- My Measured Resting Heart Rate: {} bpm", show(&r.resting_hr));
    let _ = writeln!(out, "- My Measured HRV: {} ms", show(&r.hrv));
    out.push_str(&factors_section(factors));
    out.push_str("\nPlease provide a complete analysis based on all this information.");
    out
}
