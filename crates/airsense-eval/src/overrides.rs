//! Device-specific evaluation overrides.
//!
//! Some devices are known to produce systematic false positives: a sensor
//! next to a 3-D printer trips the smoke scorer on every print job. The
//! registry maps a device id to pure transforms applied after scoring and
//! fallback resolution. A transform can suppress a use case or rewrite its
//! `title`, `status`, `score`, and `details`. The `key` is not reachable
//! through the rewrite type, so evaluations can never change identity.
//! Keeping these transforms in a registry keeps the orchestrator free of
//! per-device conditionals.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use airsense_core::reading::DeltaRecord;
use airsense_core::{CanonicalReading, EvaluationDetails, UseCase, UseCaseEvaluation};

/// Read-only context a transform sees.
pub struct OverrideContext<'a> {
    pub reading: &'a CanonicalReading,
    pub delta: Option<&'a DeltaRecord>,
    pub evaluation: &'a UseCaseEvaluation,
}

/// Rewrite of the mutable evaluation surface. `None` keeps the field.
#[derive(Debug, Clone, Default)]
pub struct Rewrite {
    pub title: Option<String>,
    pub status: Option<String>,
    pub score: Option<f64>,
    pub details: Option<EvaluationDetails>,
}

/// What a transform decided.
#[derive(Debug, Clone)]
pub enum OverrideAction {
    /// Drop the use case from the bundle entirely.
    Suppress,
    Rewrite(Rewrite),
}

/// A pure transform over one use case's evaluation.
pub trait DeviceOverride: Send + Sync {
    fn use_case(&self) -> UseCase;

    /// Inspect the context and decide; `None` leaves the evaluation alone.
    fn evaluate(&self, ctx: &OverrideContext<'_>) -> Option<OverrideAction>;
}

/// Open/closed registry of overrides keyed by device id.
#[derive(Default)]
pub struct OverrideRegistry {
    by_device: HashMap<String, Vec<Arc<dyn DeviceOverride>>>,
}

impl OverrideRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform for a device. Multiple transforms per device
    /// and use case are allowed; the first that decides wins.
    pub fn register(&mut self, device_id: impl Into<String>, transform: Arc<dyn DeviceOverride>) {
        self.by_device.entry(device_id.into()).or_default().push(transform);
    }

    /// Apply the registered transforms to one evaluation. Returns `None`
    /// when no transform decided.
    pub fn apply(
        &self,
        device_id: &str,
        ctx: &OverrideContext<'_>,
    ) -> Option<OverrideAction> {
        let transforms = self.by_device.get(device_id)?;
        for transform in transforms {
            if transform.use_case() != ctx.evaluation.key {
                continue;
            }
            if let Some(action) = transform.evaluate(ctx) {
                debug!(
                    "override fired for device '{}' use case {}",
                    device_id, ctx.evaluation.key
                );
                return Some(action);
            }
        }
        None
    }
}

/// Apply a rewrite to an evaluation in place.
pub fn apply_rewrite(evaluation: &mut UseCaseEvaluation, rewrite: Rewrite) {
    if let Some(title) = rewrite.title {
        evaluation.title = title;
    }
    if let Some(status) = rewrite.status {
        evaluation.status = status;
    }
    if let Some(score) = rewrite.score {
        evaluation.score = Some(score);
    }
    if let Some(details) = rewrite.details {
        evaluation.details = details;
    }
}

/// Reinterprets a pm1-dominant particulate signature as printer emission.
///
/// FDM printers shed ultrafine particles: pm1 spikes while pm2.5 and pm10
/// stay moderate. The base smoke verdict is rewritten no matter what it
/// concluded.
pub struct PrinterEmissionOverride;

impl DeviceOverride for PrinterEmissionOverride {
    fn use_case(&self) -> UseCase {
        UseCase::SmokeDetection
    }

    fn evaluate(&self, ctx: &OverrideContext<'_>) -> Option<OverrideAction> {
        let reading = ctx.reading;
        let pm1_dominant = reading.pm1.is_some_and(|v| v >= 40.0)
            && reading.pm25.is_none_or(|v| v < 35.0)
            && reading.pm10.is_none_or(|v| v < 50.0);
        if !pm1_dominant {
            return None;
        }
        Some(OverrideAction::Rewrite(Rewrite {
            title: Some("3D Printer Emission".to_string()),
            status: Some("3D printing in process".to_string()),
            details: Some(EvaluationDetails {
                issues: ctx.evaluation.details.issues.clone(),
                recommendation: Some(
                    "Ultrafine particulates match printer emission; ensure enclosure ventilation"
                        .to_string(),
                ),
                tooltip: Some("pm1-dominant signature on a known 3D printer device".to_string()),
            }),
            ..Rewrite::default()
        }))
    }
}

/// Reinterprets a heat-plus-particulate ramp as welding activity.
///
/// Needs the inter-cycle delta: a rising temperature or CO2 alongside
/// elevated fine particulates and a base verdict that is already at least
/// suspicious.
pub struct WeldingActivityOverride;

impl DeviceOverride for WeldingActivityOverride {
    fn use_case(&self) -> UseCase {
        UseCase::SmokeDetection
    }

    fn evaluate(&self, ctx: &OverrideContext<'_>) -> Option<OverrideAction> {
        let delta = ctx.delta?;
        let heating = delta.temperature_c.is_some_and(|d| d >= 2.0)
            || delta.co2.is_some_and(|d| d >= 150.0);
        let particulates = ctx.reading.pm25.is_some_and(|v| v >= 35.0);
        let base_suspicious = matches!(
            ctx.evaluation.status.as_str(),
            "Suspicious" | "Warning" | "Critical"
        );
        if !(heating && particulates && base_suspicious) {
            return None;
        }
        Some(OverrideAction::Rewrite(Rewrite {
            title: Some("Welding Activity".to_string()),
            status: Some("Welding in progress".to_string()),
            details: Some(EvaluationDetails {
                issues: ctx.evaluation.details.issues.clone(),
                recommendation: Some(
                    "Fume signature matches welding; verify extraction is running".to_string(),
                ),
                tooltip: Some(
                    "temperature/CO2 rise with particulates on a known welding bay device"
                        .to_string(),
                ),
            }),
            ..Rewrite::default()
        }))
    }
}

/// Unconditionally removes one use case for a device.
pub struct SuppressUseCase(pub UseCase);

impl DeviceOverride for SuppressUseCase {
    fn use_case(&self) -> UseCase {
        self.0
    }

    fn evaluate(&self, _ctx: &OverrideContext<'_>) -> Option<OverrideAction> {
        Some(OverrideAction::Suppress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airsense_core::Metric;
    use chrono::Utc;
    use serde_json::Value;

    fn reading(fields: &[(Metric, f64)]) -> CanonicalReading {
        let mut r = CanonicalReading::empty("printer-7", Utc::now());
        for (metric, value) in fields {
            r.set(*metric, Some(*value));
        }
        r
    }

    fn smoke_eval(status: &str) -> UseCaseEvaluation {
        let mut eval = UseCaseEvaluation::unknown(UseCase::SmokeDetection, Value::Null);
        eval.status = status.to_string();
        eval.score = Some(0.9);
        eval.features_used = vec!["pm25".to_string()];
        eval
    }

    #[test]
    fn printer_override_fires_regardless_of_base_verdict() {
        let r = reading(&[
            (Metric::Pm1, 60.0),
            (Metric::Pm25, 20.0),
            (Metric::Pm10, 30.0),
        ]);
        for base in ["Normal", "Suspicious", "Warning", "Critical"] {
            let mut eval = smoke_eval(base);
            let ctx = OverrideContext {
                reading: &r,
                delta: None,
                evaluation: &eval,
            };
            let action = PrinterEmissionOverride.evaluate(&ctx).unwrap();
            let OverrideAction::Rewrite(rewrite) = action else {
                panic!("expected rewrite");
            };
            apply_rewrite(&mut eval, rewrite);
            assert_eq!(eval.status, "3D printing in process");
            assert_eq!(eval.key, UseCase::SmokeDetection);
        }
    }

    #[test]
    fn printer_override_needs_pm1_dominance() {
        // pm25 already at smoke levels: not a printer signature.
        let r = reading(&[(Metric::Pm1, 60.0), (Metric::Pm25, 80.0)]);
        let eval = smoke_eval("Critical");
        let ctx = OverrideContext {
            reading: &r,
            delta: None,
            evaluation: &eval,
        };
        assert!(PrinterEmissionOverride.evaluate(&ctx).is_none());
    }

    #[test]
    fn welding_override_needs_delta_and_particulates() {
        let r = reading(&[(Metric::Pm25, 40.0), (Metric::TemperatureC, 26.0)]);
        let eval = smoke_eval("Warning");

        // No delta: stays untouched.
        let ctx = OverrideContext {
            reading: &r,
            delta: None,
            evaluation: &eval,
        };
        assert!(WeldingActivityOverride.evaluate(&ctx).is_none());

        // Rising temperature plus particulates plus suspicious base verdict.
        let delta = DeltaRecord {
            temperature_c: Some(3.0),
            ..DeltaRecord::default()
        };
        let ctx = OverrideContext {
            reading: &r,
            delta: Some(&delta),
            evaluation: &eval,
        };
        let action = WeldingActivityOverride.evaluate(&ctx).unwrap();
        assert!(matches!(action, OverrideAction::Rewrite(_)));
    }

    #[test]
    fn registry_is_keyed_by_device_and_use_case() {
        let mut registry = OverrideRegistry::new();
        registry.register("printer-7", Arc::new(PrinterEmissionOverride));

        let r = reading(&[(Metric::Pm1, 60.0)]);
        let eval = smoke_eval("Warning");
        let ctx = OverrideContext {
            reading: &r,
            delta: None,
            evaluation: &eval,
        };
        assert!(registry.apply("printer-7", &ctx).is_some());
        assert!(registry.apply("other-device", &ctx).is_none());

        // Same device, different use case: no transform applies.
        let occupancy_eval = UseCaseEvaluation::unknown(UseCase::Occupancy, Value::Null);
        let ctx = OverrideContext {
            reading: &r,
            delta: None,
            evaluation: &occupancy_eval,
        };
        assert!(registry.apply("printer-7", &ctx).is_none());
    }

    #[test]
    fn suppress_always_decides() {
        let mut registry = OverrideRegistry::new();
        registry.register("flaky-1", Arc::new(SuppressUseCase(UseCase::SmokeDetection)));
        let r = reading(&[]);
        let eval = smoke_eval("Normal");
        let ctx = OverrideContext {
            reading: &r,
            delta: None,
            evaluation: &eval,
        };
        assert!(matches!(
            registry.apply("flaky-1", &ctx),
            Some(OverrideAction::Suppress)
        ));
    }
}
