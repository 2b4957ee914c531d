//! Deterministic local scorers.
//!
//! One scorer per use case, all tolerating partial input: missing metrics
//! are omitted from the combination, never substituted with defaults. A
//! scorer needs at least one valid input to leave Unknown. Scores and
//! statuses are reproducible functions of the reading alone, with no
//! history and no randomness, which is what makes them a safe stand-in when the
//! remote service is unreachable.

pub mod health;
pub mod occupancy;
pub mod smoke;

use serde_json::Value;

use airsense_core::{CanonicalReading, UseCase};

/// Output of one heuristic scorer, shaped to slot into a
/// `UseCaseEvaluation` unchanged.
#[derive(Debug, Clone)]
pub struct HeuristicVerdict {
    pub status: String,
    pub score: Option<f64>,
    pub confidence: f64,
    pub features_used: Vec<&'static str>,
    /// The individual signals/penalties that fed the combination.
    pub signals: Value,
}

impl HeuristicVerdict {
    fn unknown() -> Self {
        Self {
            status: "Unknown".to_string(),
            score: None,
            confidence: 0.0,
            features_used: Vec::new(),
            signals: Value::Null,
        }
    }
}

/// Run the scorer for a use case.
pub fn score(use_case: UseCase, reading: &CanonicalReading) -> HeuristicVerdict {
    match use_case {
        UseCase::Occupancy => occupancy::score(reading),
        UseCase::HealthIndex => health::score(reading),
        UseCase::SmokeDetection => smoke::score(reading),
    }
}

/// Linear ramp: 0 at or below `lo`, 1 at or above `hi`.
pub(crate) fn ramp(value: f64, lo: f64, hi: f64) -> f64 {
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Confidence grows with input coverage: 0.5 base plus 0.1 per signal.
pub(crate) fn coverage_confidence(signal_count: usize) -> f64 {
    (0.5 + 0.1 * signal_count as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn empty_reading_is_unknown_for_every_scorer() {
        let reading = CanonicalReading::empty("dev-1", Utc::now());
        for use_case in UseCase::ALL {
            let verdict = score(use_case, &reading);
            assert_eq!(verdict.status, "Unknown", "{use_case}");
            assert_eq!(verdict.score, None, "{use_case}");
            assert_eq!(verdict.confidence, 0.0, "{use_case}");
            assert!(verdict.features_used.is_empty(), "{use_case}");
        }
    }

    #[test]
    fn ramp_clamps_both_ends() {
        assert_eq!(ramp(500.0, 600.0, 1000.0), 0.0);
        assert_eq!(ramp(800.0, 600.0, 1000.0), 0.5);
        assert_eq!(ramp(1200.0, 600.0, 1000.0), 1.0);
    }
}
