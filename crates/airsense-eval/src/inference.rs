//! Remote inference client.
//!
//! The prediction service exposes three logical operations behind
//! `POST {base}/predict/{occupancy|health|smoke}`, each taking the
//! canonical reading (original wire names) and returning use-case-specific
//! status fields plus a confidence. Every call carries a hard timeout; a
//! response arriving after the bound is discarded by the `timeout` wrapper
//! and the use case falls back to its heuristic. A response that parses
//! but lacks the expected fields is malformed and treated exactly like an
//! unreachable service.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use airsense_core::error::InferenceError;
use airsense_core::{CanonicalReading, UseCase};

use crate::heuristics::{health, occupancy, smoke};

/// A normalized remote verdict, strategy-agnostic by construction.
#[derive(Debug, Clone)]
pub struct RemotePrediction {
    pub status: String,
    pub score: f64,
    pub confidence: f64,
    /// Occupant count bucket derived from the service's `n_estimate`.
    pub count_range: Option<String>,
    /// The verbatim service response, surfaced in the evaluation's `raw`.
    pub raw: Value,
}

/// Seam between the orchestrator and the prediction service. Tests swap in
/// scripted implementations; production wires `HttpInference`.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn predict(
        &self,
        use_case: UseCase,
        reading: &CanonicalReading,
    ) -> Result<RemotePrediction, InferenceError>;
}

/// Request body matching the original prediction service schema.
#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    timestamp: String,
    device_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    co2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    voc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pm1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pm25: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pm4: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pm10: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temp_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rh: Option<f64>,
}

impl<'a> PredictRequest<'a> {
    fn from_reading(reading: &'a CanonicalReading) -> Self {
        Self {
            timestamp: reading.timestamp.to_rfc3339(),
            device_id: &reading.device_id,
            co2: reading.co2,
            voc: reading.voc,
            pm1: reading.pm1,
            pm25: reading.pm25,
            pm4: reading.pm4,
            pm10: reading.pm10,
            temp_c: reading.temperature_c,
            rh: reading.relative_humidity,
        }
    }
}

/// HTTP implementation of the inference backend.
pub struct HttpInference {
    client: reqwest::Client,
    base: String,
    timeout_secs: u64,
}

impl HttpInference {
    /// Build a client with a fast connect timeout so an absent service
    /// fails well inside the per-call bound.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| InferenceError::Unavailable(e.to_string()))?;
        let mut base = endpoint.into();
        while base.ends_with('/') {
            base.pop();
        }
        Ok(Self {
            client,
            base,
            timeout_secs: timeout.as_secs().max(1),
        })
    }

    fn path_for(use_case: UseCase) -> &'static str {
        match use_case {
            UseCase::Occupancy => "occupancy",
            UseCase::HealthIndex => "health",
            UseCase::SmokeDetection => "smoke",
        }
    }
}

#[async_trait]
impl InferenceBackend for HttpInference {
    async fn predict(
        &self,
        use_case: UseCase,
        reading: &CanonicalReading,
    ) -> Result<RemotePrediction, InferenceError> {
        let url = format!("{}/predict/{}", self.base, Self::path_for(use_case));
        let request = self
            .client
            .post(&url)
            .json(&PredictRequest::from_reading(reading))
            .send();

        let response = tokio::time::timeout(Duration::from_secs(self.timeout_secs), request)
            .await
            .map_err(|_| InferenceError::Timeout(self.timeout_secs))?
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout(self.timeout_secs)
                } else {
                    InferenceError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} prediction for '{}' returned {}", use_case, reading.device_id, status);
            return Err(InferenceError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| InferenceError::Malformed(e.to_string()))?;
        debug!("{} prediction for '{}' ok", use_case, reading.device_id);
        parse_prediction(use_case, reading, body)
    }
}

/// Normalize a service response into a `RemotePrediction`, validating the
/// per-use-case required fields.
pub fn parse_prediction(
    use_case: UseCase,
    reading: &CanonicalReading,
    body: Value,
) -> Result<RemotePrediction, InferenceError> {
    // The service reports handled model errors in-band.
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return Err(InferenceError::Malformed(error.to_string()));
    }
    match use_case {
        UseCase::Occupancy => {
            body.get("occupied")
                .and_then(Value::as_bool)
                .ok_or_else(|| InferenceError::Malformed("missing 'occupied'".into()))?;
            let score = number_field(&body, &["probability", "confidence"])
                .ok_or_else(|| InferenceError::Malformed("missing 'probability'".into()))?;
            let confidence = number_field(&body, &["confidence", "probability"]).unwrap_or(score);
            let count_range = number_field(&body, &["n_estimate"]).map(count_range_for);
            Ok(RemotePrediction {
                status: occupancy::status_for(score).to_string(),
                score,
                confidence,
                count_range,
                raw: body,
            })
        }
        UseCase::HealthIndex => {
            let score = number_field(&body, &["health_index"])
                .ok_or_else(|| InferenceError::Malformed("missing 'health_index'".into()))?
                .clamp(0.0, 100.0);
            let confidence = number_field(&body, &["confidence"])
                .unwrap_or_else(|| default_confidence(reading));
            Ok(RemotePrediction {
                status: health::status_for(score).to_string(),
                score,
                confidence,
                count_range: None,
                raw: body,
            })
        }
        UseCase::SmokeDetection => {
            body.get("smoke_present")
                .and_then(Value::as_bool)
                .ok_or_else(|| InferenceError::Malformed("missing 'smoke_present'".into()))?;
            let score = number_field(&body, &["probability", "confidence"])
                .ok_or_else(|| InferenceError::Malformed("missing 'probability'".into()))?;
            let confidence = number_field(&body, &["confidence", "probability"]).unwrap_or(score);
            Ok(RemotePrediction {
                status: smoke::status_for(score).to_string(),
                score,
                confidence,
                count_range: None,
                raw: body,
            })
        }
    }
}

fn number_field(body: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| body.get(*key).and_then(Value::as_f64))
        .filter(|v| v.is_finite())
}

/// Confidence stand-in when the service omits one: input coverage.
fn default_confidence(reading: &CanonicalReading) -> f64 {
    (0.5 + 0.1 * reading.metric_count() as f64).clamp(0.0, 1.0)
}

/// Bucket the service's occupant estimate for display.
fn count_range_for(n_estimate: f64) -> String {
    if n_estimate < 0.5 {
        "0".to_string()
    } else if n_estimate < 2.5 {
        "1-2".to_string()
    } else if n_estimate < 5.5 {
        "3-5".to_string()
    } else {
        "6+".to_string()
    }
}
