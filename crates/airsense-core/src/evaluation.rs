//! Per-use-case evaluation types and the final bundle.
//!
//! One `EvaluationBundle` per device per cycle is the sole externally
//! visible artifact of the engine. Its shape is identical whether a use
//! case was served by the remote inference service or by a local heuristic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The three independent classification tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UseCase {
    #[serde(rename = "occupancy")]
    Occupancy,
    #[serde(rename = "healthIndex")]
    HealthIndex,
    #[serde(rename = "smokeDetection")]
    SmokeDetection,
}

impl UseCase {
    /// All use cases in bundle order.
    pub const ALL: [UseCase; 3] = [UseCase::Occupancy, UseCase::HealthIndex, UseCase::SmokeDetection];

    /// Stable key used in the serialized evaluation.
    pub fn key(&self) -> &'static str {
        match self {
            UseCase::Occupancy => "occupancy",
            UseCase::HealthIndex => "healthIndex",
            UseCase::SmokeDetection => "smokeDetection",
        }
    }

    /// Default human-readable title (overrides may replace it).
    pub fn title(&self) -> &'static str {
        match self {
            UseCase::Occupancy => "Occupancy",
            UseCase::HealthIndex => "Health Index",
            UseCase::SmokeDetection => "Smoke Detection",
        }
    }
}

impl std::fmt::Display for UseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Issue severity. Critical thresholds are checked before warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// Advisory record for a single metric crossing a threshold.
///
/// Issues never alter scores or statuses; they only feed the `details`
/// section of an evaluation. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub metric: String,
    pub unit: String,
    pub value: f64,
    pub severity: Severity,
    pub advice: String,
    pub message: String,
    /// Use cases this issue is relevant to.
    pub use_cases: Vec<UseCase>,
}

/// Advisory detail block attached to each evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationDetails {
    pub issues: Vec<Issue>,
    pub recommendation: Option<String>,
    pub tooltip: Option<String>,
}

/// Which strategy produced the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Heuristic,
    MlService,
}

/// One classified decision for one use case.
///
/// Invariant: `score == None` exactly when `status == "Unknown"` exactly
/// when `features_used` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseCaseEvaluation {
    pub key: UseCase,
    pub title: String,
    pub status: String,
    pub score: Option<f64>,
    pub confidence: f64,
    /// The canonical inputs the evaluation saw, serialized for consumers.
    pub inputs: Value,
    pub features_used: Vec<String>,
    pub details: EvaluationDetails,
    /// Strategy-specific raw output (remote response or heuristic signals).
    pub raw: Value,
    /// Occupant count bucket, occupancy only, remote estimates only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count_range: Option<String>,
}

impl UseCaseEvaluation {
    /// The terminal Unknown evaluation for a use case with no usable input.
    pub fn unknown(use_case: UseCase, inputs: Value) -> Self {
        Self {
            key: use_case,
            title: use_case.title().to_string(),
            status: "Unknown".to_string(),
            score: None,
            confidence: 0.0,
            inputs,
            features_used: Vec::new(),
            details: EvaluationDetails::default(),
            raw: Value::Null,
            count_range: None,
        }
    }

    /// True when the evaluation carried no usable input.
    pub fn is_unknown(&self) -> bool {
        self.status == "Unknown"
    }
}

/// The per-device result bundle handed to transport and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationBundle {
    pub device_id: String,
    pub generated_at: DateTime<Utc>,
    pub evaluations: Vec<UseCaseEvaluation>,
    pub model: ModelSource,
    /// True when any applicable remote call was substituted by a heuristic.
    pub fallback: bool,
    /// Canonical reading the bundle was derived from.
    pub inputs: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn use_case_keys_are_stable() {
        assert_eq!(UseCase::Occupancy.key(), "occupancy");
        assert_eq!(UseCase::HealthIndex.key(), "healthIndex");
        assert_eq!(UseCase::SmokeDetection.key(), "smokeDetection");
        assert_eq!(
            serde_json::to_value(UseCase::SmokeDetection).unwrap(),
            json!("smokeDetection")
        );
    }

    #[test]
    fn unknown_evaluation_upholds_invariant() {
        let eval = UseCaseEvaluation::unknown(UseCase::Occupancy, Value::Null);
        assert!(eval.is_unknown());
        assert_eq!(eval.score, None);
        assert_eq!(eval.confidence, 0.0);
        assert!(eval.features_used.is_empty());
    }

    #[test]
    fn severity_orders_warning_below_critical() {
        assert!(Severity::Warning < Severity::Critical);
    }
}
