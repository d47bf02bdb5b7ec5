//! Model explainability
//!
//! Local, per-prediction feature attributions (SHAP-style) for the
//! positive-class probability.

mod attribution;

pub use attribution::{AttributionResult, AttributionService, DEFAULT_PERMUTATIONS};
