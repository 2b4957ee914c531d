//! Smoke suspicion scorer.
//!
//! Combines particulate and VOC ramps by taking the maximum, not a sum: a
//! single saturated channel is already a credible smoke signature, and
//! averaging it away against clean channels would mask it.

use serde_json::json;

use airsense_core::CanonicalReading;

use super::{coverage_confidence, ramp, HeuristicVerdict};

/// Classify a score into the smoke status vocabulary.
pub fn status_for(score: f64) -> &'static str {
    if score >= 0.8 {
        "Critical"
    } else if score >= 0.6 {
        "Warning"
    } else if score >= 0.3 {
        "Suspicious"
    } else {
        "Normal"
    }
}

pub fn score(reading: &CanonicalReading) -> HeuristicVerdict {
    let mut features = Vec::new();
    let mut best: Option<f64> = None;
    let mut track = |signal: Option<f64>, feature: &'static str| {
        if let Some(s) = signal {
            best = Some(best.map_or(s, |b: f64| b.max(s)));
            features.push(feature);
        }
        signal
    };

    // PM2.5 ramps 35 -> 75 µg/m³.
    let pm25_signal = track(reading.pm25.map(|v| ramp(v, 35.0, 75.0)), "pm25");
    // PM10 ramps 50 -> 100 µg/m³.
    let pm10_signal = track(reading.pm10.map(|v| ramp(v, 50.0, 100.0)), "pm10");
    // VOC ramps 500 -> 1000 ppb, discounted: VOCs alone are weak evidence.
    let voc_signal = track(reading.voc.map(|v| ramp(v, 500.0, 1000.0) * 0.6), "voc");

    let Some(score) = best else {
        return HeuristicVerdict::unknown();
    };

    HeuristicVerdict {
        status: status_for(score).to_string(),
        score: Some(score),
        confidence: coverage_confidence(features.len()),
        features_used: features,
        signals: json!({
            "pm25": pm25_signal,
            "pm10": pm10_signal,
            "voc": voc_signal,
        }),
    }
}
