//! Evaluation orchestrator.
//!
//! Drives the per-device, per-use-case state machine each cycle:
//!
//! ```text
//! NoFeatures -> Unknown (terminal)
//! HasFeatures -> RemoteAttempt -> Success -> Assembled
//!                              -> Failure -> HeuristicFallback -> Assembled
//! ```
//!
//! All applicable remote calls for one device run concurrently and the
//! orchestrator waits for every one to settle before assembling; there is
//! no partial streaming. Devices are evaluated in parallel with no shared
//! mutable state beyond each device's own history entry. Overlapping
//! cycles resolve by dropping the late cycle per device: if a device's
//! previous evaluation is still in flight when the next cycle starts, the
//! new record for that device is skipped with a warning.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{debug, warn};

use airsense_core::error::{EvalError, InferenceError};
use airsense_core::reading::DeltaRecord;
use airsense_core::{
    CanonicalReading, EngineConfig, EvaluationBundle, EvaluationDetails, Issue, Metric,
    ModelSource, UseCase, UseCaseEvaluation,
};
use airsense_resolver::{resolve_reading, SnapshotHistory};

use crate::heuristics::{self, HeuristicVerdict};
use crate::inference::{HttpInference, InferenceBackend, RemotePrediction};
use crate::issues;
use crate::overrides::{self, OverrideAction, OverrideContext, OverrideRegistry};

/// Minimum feature sets per use case: the remote call (and the whole
/// non-Unknown path) fires only when at least one is present.
fn gate_metrics(use_case: UseCase) -> &'static [Metric] {
    match use_case {
        UseCase::Occupancy => &[Metric::Co2, Metric::Voc],
        UseCase::HealthIndex => &[
            Metric::Co2,
            Metric::Voc,
            Metric::Pm1,
            Metric::Pm25,
            Metric::Pm10,
            Metric::TemperatureC,
            Metric::RelativeHumidity,
        ],
        UseCase::SmokeDetection => &[Metric::Pm1, Metric::Pm25, Metric::Pm10, Metric::Voc],
    }
}

fn present_gate_features(reading: &CanonicalReading, use_case: UseCase) -> Vec<&'static str> {
    gate_metrics(use_case)
        .iter()
        .filter(|m| reading.get(**m).is_some())
        .map(|m| m.name())
        .collect()
}

/// How one use case resolved this cycle.
enum Outcome {
    /// Feature gate failed: terminal Unknown, no call, no heuristic.
    NoFeatures,
    Remote(RemotePrediction),
    /// Remote failed, timed out, was disabled, or no backend is wired.
    Fallback(HeuristicVerdict),
}

/// The evaluation engine. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Evaluator {
    config: EngineConfig,
    backend: Option<Arc<dyn InferenceBackend>>,
    history: Arc<SnapshotHistory>,
    overrides: Arc<OverrideRegistry>,
    in_flight: Arc<DashMap<String, ()>>,
}

impl Evaluator {
    /// Build an evaluator, wiring the HTTP inference client when an
    /// endpoint is configured.
    pub fn new(config: EngineConfig) -> Result<Self, InferenceError> {
        let backend: Option<Arc<dyn InferenceBackend>> = match &config.inference.endpoint {
            Some(endpoint) => Some(Arc::new(HttpInference::new(
                endpoint.clone(),
                config.inference.timeout(),
            )?)),
            None => None,
        };
        Ok(Self::with_backend(config, backend))
    }

    /// Build an evaluator with an explicit backend (or none).
    pub fn with_backend(config: EngineConfig, backend: Option<Arc<dyn InferenceBackend>>) -> Self {
        let history = Arc::new(SnapshotHistory::new(config.history.clone()));
        Self {
            config,
            backend,
            history,
            overrides: Arc::new(OverrideRegistry::new()),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Install a device override registry.
    pub fn with_overrides(mut self, overrides: OverrideRegistry) -> Self {
        self.overrides = Arc::new(overrides);
        self
    }

    /// The shared snapshot history.
    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// Evaluate one cycle's device list. Devices run in parallel; one
    /// malformed record fails only its own slot in the result set.
    pub async fn evaluate_cycle(
        &self,
        records: Vec<(String, Value)>,
    ) -> Vec<Result<EvaluationBundle, EvalError>> {
        self.history.begin_cycle();
        let mut handles = Vec::new();
        for (device_id, raw) in records {
            if self.in_flight.insert(device_id.clone(), ()).is_some() {
                warn!(
                    "evaluation for '{}' from a previous cycle still in flight; dropping this cycle",
                    device_id
                );
                continue;
            }
            let evaluator = self.clone();
            handles.push(tokio::spawn(async move {
                let result = evaluator.evaluate_device(&device_id, &raw).await;
                evaluator.in_flight.remove(&device_id);
                result
            }));
        }
        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap_or_else(|e| Err(EvalError::TaskFailed(e.to_string()))))
            .collect()
    }

    /// Evaluate a single device record into a bundle.
    pub async fn evaluate_device(
        &self,
        device_id: &str,
        raw: &Value,
    ) -> Result<EvaluationBundle, EvalError> {
        let reading = resolve_reading(device_id, raw)?;
        let previous = self.history.observe(&reading);
        let delta = previous.as_ref().map(|p| DeltaRecord::between(&reading, p));
        let all_issues = issues::analyze(&reading);
        let inputs = serde_json::to_value(&reading).unwrap_or(Value::Null);

        // All applicable remote calls run concurrently; each settles
        // (success, error, or timeout) before assembly starts.
        let (occupancy, health, smoke) = tokio::join!(
            self.run_use_case(UseCase::Occupancy, &reading),
            self.run_use_case(UseCase::HealthIndex, &reading),
            self.run_use_case(UseCase::SmokeDetection, &reading),
        );

        let outcomes = [
            (UseCase::Occupancy, occupancy),
            (UseCase::HealthIndex, health),
            (UseCase::SmokeDetection, smoke),
        ];

        let mut fallback = false;
        let mut any_remote = false;
        let mut evaluations = Vec::new();
        for (use_case, outcome) in outcomes {
            match &outcome {
                Outcome::Remote(_) => any_remote = true,
                Outcome::Fallback(_) => fallback = true,
                Outcome::NoFeatures => {}
            }
            let mut evaluation =
                self.assemble(use_case, &reading, outcome, &all_issues, inputs.clone());
            let ctx = OverrideContext {
                reading: &reading,
                delta: delta.as_ref(),
                evaluation: &evaluation,
            };
            match self.overrides.apply(device_id, &ctx) {
                Some(OverrideAction::Suppress) => {
                    debug!("use case {} suppressed for device '{}'", use_case, device_id);
                }
                Some(OverrideAction::Rewrite(rewrite)) => {
                    overrides::apply_rewrite(&mut evaluation, rewrite);
                    evaluations.push(evaluation);
                }
                None => evaluations.push(evaluation),
            }
        }

        let model = if fallback || !any_remote {
            ModelSource::Heuristic
        } else {
            ModelSource::MlService
        };
        Ok(EvaluationBundle {
            device_id: device_id.to_string(),
            generated_at: chrono::Utc::now(),
            evaluations,
            model,
            fallback,
            inputs,
        })
    }

    async fn run_use_case(&self, use_case: UseCase, reading: &CanonicalReading) -> Outcome {
        if present_gate_features(reading, use_case).is_empty() {
            return Outcome::NoFeatures;
        }
        if let Some(backend) = &self.backend {
            if self.config.inference.is_enabled(use_case) {
                // The backend enforces its own bound; this outer timeout is
                // the hard guarantee that a late response is discarded.
                let bound = self.config.inference.timeout();
                match tokio::time::timeout(bound, backend.predict(use_case, reading)).await {
                    Ok(Ok(prediction)) => return Outcome::Remote(prediction),
                    Ok(Err(e)) => {
                        warn!(
                            "{} inference failed for '{}', falling back to heuristic: {}",
                            use_case, reading.device_id, e
                        );
                    }
                    Err(_) => {
                        warn!(
                            "{} inference timed out after {:?} for '{}', falling back to heuristic",
                            use_case, bound, reading.device_id
                        );
                    }
                }
            } else {
                debug!("{} inference disabled, using heuristic", use_case);
            }
        }
        Outcome::Fallback(heuristics::score(use_case, reading))
    }

    fn assemble(
        &self,
        use_case: UseCase,
        reading: &CanonicalReading,
        outcome: Outcome,
        all_issues: &[Issue],
        inputs: Value,
    ) -> UseCaseEvaluation {
        let details = details_for(use_case, all_issues);
        match outcome {
            Outcome::NoFeatures => {
                let mut evaluation = UseCaseEvaluation::unknown(use_case, inputs);
                evaluation.details = details;
                evaluation
            }
            Outcome::Remote(prediction) => UseCaseEvaluation {
                key: use_case,
                title: use_case.title().to_string(),
                status: prediction.status,
                score: Some(prediction.score),
                confidence: prediction.confidence,
                inputs,
                features_used: present_gate_features(reading, use_case)
                    .into_iter()
                    .map(String::from)
                    .collect(),
                details,
                raw: prediction.raw,
                count_range: prediction.count_range,
            },
            Outcome::Fallback(verdict) => {
                if verdict.score.is_none() {
                    // The gate passed but the scorer's own inputs were all
                    // absent (e.g. health gated on pm1 alone).
                    let mut evaluation = UseCaseEvaluation::unknown(use_case, inputs);
                    evaluation.details = details;
                    return evaluation;
                }
                UseCaseEvaluation {
                    key: use_case,
                    title: use_case.title().to_string(),
                    status: verdict.status,
                    score: verdict.score,
                    confidence: verdict.confidence,
                    inputs,
                    features_used: verdict.features_used.into_iter().map(String::from).collect(),
                    details,
                    raw: json!({ "signals": verdict.signals }),
                    count_range: None,
                }
            }
        }
    }
}

/// Merge the use case's issues into an advisory detail block.
fn details_for(use_case: UseCase, all_issues: &[Issue]) -> EvaluationDetails {
    let issues = issues::for_use_case(all_issues, use_case);
    let recommendation = issues
        .iter()
        .max_by_key(|issue| issue.severity)
        .map(|issue| issue.advice.clone());
    let tooltip = if issues.is_empty() {
        None
    } else {
        Some(
            issues
                .iter()
                .map(|issue| issue.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    };
    EvaluationDetails {
        issues,
        recommendation,
        tooltip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn gates_match_the_contract() {
        let mut reading = CanonicalReading::empty("dev-1", Utc::now());
        reading.set(Metric::TemperatureC, Some(22.0));
        // Temperature alone gates health but not occupancy or smoke.
        assert!(present_gate_features(&reading, UseCase::Occupancy).is_empty());
        assert!(!present_gate_features(&reading, UseCase::HealthIndex).is_empty());
        assert!(present_gate_features(&reading, UseCase::SmokeDetection).is_empty());
    }

    #[test]
    fn details_pick_highest_severity_recommendation() {
        let mut reading = CanonicalReading::empty("dev-1", Utc::now());
        reading.set(Metric::Co2, Some(1200.0));
        reading.set(Metric::Pm25, Some(80.0));
        let all = issues::analyze(&reading);
        let details = details_for(UseCase::HealthIndex, &all);
        // pm25 is critical, co2 only warning.
        assert_eq!(details.issues.len(), 2);
        assert!(details.recommendation.unwrap().contains("Fine particulates"));
        assert!(details.tooltip.unwrap().contains("; "));
    }
}
