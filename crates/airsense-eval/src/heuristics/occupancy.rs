//! Occupancy scorer.
//!
//! Weighted sum of four piecewise-linear signals. The weights deliberately
//! sum past 1.0 and the result is clamped, so a strong CO2 signal plus one
//! supporting signal is enough to reach the Occupied band without every
//! sensor being present.

use serde_json::json;

use airsense_core::CanonicalReading;

use super::{coverage_confidence, ramp, HeuristicVerdict};

const CO2_WEIGHT: f64 = 0.6;
const HUMIDITY_WEIGHT: f64 = 0.2;
const TEMPERATURE_WEIGHT: f64 = 0.2;
const VOC_WEIGHT: f64 = 0.2;

/// Classify a score into the occupancy status vocabulary.
pub fn status_for(score: f64) -> &'static str {
    if score >= 0.8 {
        "Occupied"
    } else if score >= 0.6 {
        "Likely Occupied"
    } else if score >= 0.3 {
        "Possibly Occupied"
    } else {
        "Vacant"
    }
}

pub fn score(reading: &CanonicalReading) -> HeuristicVerdict {
    let mut weighted = 0.0;
    let mut features = Vec::new();

    // CO2 ramps 600 -> 1000 ppm.
    let co2_signal = reading.co2.map(|v| ramp(v, 600.0, 1000.0));
    if let Some(s) = co2_signal {
        weighted += CO2_WEIGHT * s;
        features.push("co2");
    }

    // Humidity deviation from 45 %, dead zone 0-10, ramp 10 -> 30.
    let humidity_signal = reading
        .relative_humidity
        .map(|v| ramp((v - 45.0).abs(), 10.0, 30.0));
    if let Some(s) = humidity_signal {
        weighted += HUMIDITY_WEIGHT * s;
        features.push("relative_humidity");
    }

    // Temperature deviation from 22 °C, dead zone 0-2, ramp 2 -> 6.
    let temperature_signal = reading
        .temperature_c
        .map(|v| ramp((v - 22.0).abs(), 2.0, 6.0));
    if let Some(s) = temperature_signal {
        weighted += TEMPERATURE_WEIGHT * s;
        features.push("temperature_c");
    }

    // VOC ramps 200 -> 400 ppb.
    let voc_signal = reading.voc.map(|v| ramp(v, 200.0, 400.0));
    if let Some(s) = voc_signal {
        weighted += VOC_WEIGHT * s;
        features.push("voc");
    }

    if features.is_empty() {
        return HeuristicVerdict::unknown();
    }

    let score = weighted.clamp(0.0, 1.0);
    HeuristicVerdict {
        status: status_for(score).to_string(),
        score: Some(score),
        confidence: coverage_confidence(features.len()),
        features_used: features,
        signals: json!({
            "co2": co2_signal,
            "relative_humidity": humidity_signal,
            "temperature_c": temperature_signal,
            "voc": voc_signal,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airsense_core::Metric;
    use chrono::Utc;

    fn reading(fields: &[(Metric, f64)]) -> CanonicalReading {
        let mut r = CanonicalReading::empty("dev-1", Utc::now());
        for (metric, value) in fields {
            r.set(*metric, Some(*value));
        }
        r
    }

    #[test]
    fn saturated_co2_and_voc_means_occupied() {
        let r = reading(&[
            (Metric::Co2, 1100.0),
            (Metric::Voc, 450.0),
            (Metric::TemperatureC, 22.0),
            (Metric::RelativeHumidity, 45.0),
        ]);
        let verdict = score(&r);
        let s = verdict.score.unwrap();
        assert!(s >= 0.8, "score was {s}");
        assert_eq!(verdict.status, "Occupied");
        assert_eq!(verdict.confidence, 0.9);
        assert_eq!(verdict.features_used.len(), 4);
    }

    #[test]
    fn monotone_in_co2_over_the_ramp() {
        let mut last = -1.0;
        for co2 in (600..=1000).step_by(50) {
            let r = reading(&[(Metric::Co2, co2 as f64)]);
            let s = score(&r).score.unwrap();
            assert!(s >= last, "score decreased at co2={co2}");
            last = s;
        }
    }

    #[test]
    fn comfort_baseline_reads_vacant() {
        let r = reading(&[
            (Metric::Co2, 450.0),
            (Metric::TemperatureC, 22.0),
            (Metric::RelativeHumidity, 45.0),
        ]);
        let verdict = score(&r);
        assert_eq!(verdict.status, "Vacant");
        assert_eq!(verdict.score, Some(0.0));
    }

    #[test]
    fn co2_alone_caps_at_likely_occupied() {
        let r = reading(&[(Metric::Co2, 1400.0)]);
        let verdict = score(&r);
        assert_eq!(verdict.score, Some(0.6));
        assert_eq!(verdict.status, "Likely Occupied");
        assert_eq!(verdict.confidence, 0.6);
    }

    #[test]
    fn dead_zones_contribute_nothing() {
        let r = reading(&[
            (Metric::TemperatureC, 23.5),
            (Metric::RelativeHumidity, 52.0),
        ]);
        let verdict = score(&r);
        assert_eq!(verdict.score, Some(0.0));
        assert_eq!(verdict.features_used.len(), 2);
    }
}
