//! Composite health index scorer.
//!
//! Each available pollutant contributes a 0-100 penalty; the score is 100
//! minus the weighted mean of the available penalties, with weights
//! renormalized so missing sensors do not drag the index down. Penalty
//! curves follow published guidance: EPA 2023 PM2.5 AQI breakpoints, a
//! logistic CO2 ramp centered on the 800 ppm ventilation guideline, a
//! two-regime quadratic TVOC ramp, and ASHRAE-style comfort penalties.

use serde_json::json;

use airsense_core::CanonicalReading;

use super::{coverage_confidence, HeuristicVerdict};

const PM25_WEIGHT: f64 = 0.4;
const CO2_WEIGHT: f64 = 0.2;
const VOC_WEIGHT: f64 = 0.2;
const COMFORT_WEIGHT: f64 = 0.2;

/// EPA 2023 PM2.5 breakpoints: (c_lo, c_hi, i_lo, i_hi).
const PM25_BREAKPOINTS: &[(f64, f64, f64, f64)] = &[
    (0.0, 12.0, 0.0, 50.0),
    (12.1, 35.4, 51.0, 100.0),
    (35.5, 55.4, 101.0, 150.0),
    (55.5, 150.4, 151.0, 200.0),
    (150.5, 250.4, 201.0, 300.0),
    (250.5, 500.4, 301.0, 500.0),
];

/// TVOC regime boundaries in ppb and the total risk cap.
const VOC_BREAKPOINTS: (f64, f64, f64) = (220.0, 660.0, 2200.0);
const VOC_RISK_CAP: f64 = 65.0;

const COMFORT_TEMP_RANGE: (f64, f64) = (20.0, 25.0);
const COMFORT_RH_RANGE: (f64, f64) = (30.0, 60.0);

/// Classify a 0-100 index into the health status vocabulary.
pub fn status_for(score: f64) -> &'static str {
    if score >= 85.0 {
        "Excellent"
    } else if score >= 70.0 {
        "Good"
    } else if score >= 55.0 {
        "Moderate"
    } else if score >= 40.0 {
        "Poor"
    } else {
        "Critical"
    }
}

/// Interpolate a PM2.5 concentration (µg/m³) onto the EPA AQI scale.
fn pm25_aqi(concentration: f64) -> f64 {
    for (c_lo, c_hi, i_lo, i_hi) in PM25_BREAKPOINTS {
        if concentration >= *c_lo && concentration <= *c_hi {
            return (i_hi - i_lo) / (c_hi - c_lo) * (concentration - c_lo) + i_lo;
        }
    }
    PM25_BREAKPOINTS[PM25_BREAKPOINTS.len() - 1].3
}

fn pm25_penalty(concentration: f64) -> f64 {
    (pm25_aqi(concentration) / 5.0).min(100.0)
}

/// Logistic penalty centered at 800 ppm, slope 0.018.
fn co2_penalty(co2: f64) -> f64 {
    (100.0 / (1.0 + (-0.018 * (co2 - 800.0)).exp())).clamp(0.0, 100.0)
}

/// Two-regime quadratic ramp: half the cap by 660 ppb, the rest by 2200.
fn voc_penalty(voc: f64) -> f64 {
    let (b1, b2, b3) = VOC_BREAKPOINTS;
    if voc <= b1 {
        0.0
    } else if voc <= b2 {
        let fraction = (voc - b1) / (b2 - b1);
        (VOC_RISK_CAP * 0.5) * fraction * fraction
    } else if voc <= b3 {
        let fraction = (voc - b2) / (b3 - b2);
        (VOC_RISK_CAP * 0.5) + (VOC_RISK_CAP * 0.5) * fraction * fraction
    } else {
        VOC_RISK_CAP
    }
}

/// Quadratic temperature penalty outside 20-25 °C plus a 1.5-power
/// humidity penalty outside 30-60 % RH, capped at 100.
fn comfort_penalty(temperature_c: Option<f64>, relative_humidity: Option<f64>) -> f64 {
    let mut penalty = 0.0;
    if let Some(t) = temperature_c {
        let (lo, hi) = COMFORT_TEMP_RANGE;
        let delta = if t < lo { lo - t } else if t > hi { t - hi } else { 0.0 };
        penalty += delta * delta * 2.0;
    }
    if let Some(rh) = relative_humidity {
        let (lo, hi) = COMFORT_RH_RANGE;
        let delta = if rh < lo { lo - rh } else if rh > hi { rh - hi } else { 0.0 };
        penalty += delta.powf(1.5);
    }
    penalty.clamp(0.0, 100.0)
}

pub fn score(reading: &CanonicalReading) -> HeuristicVerdict {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut features = Vec::new();

    let pm25 = reading.pm25.map(pm25_penalty);
    if let Some(p) = pm25 {
        weighted_sum += PM25_WEIGHT * p;
        weight_total += PM25_WEIGHT;
        features.push("pm25");
    }

    let co2 = reading.co2.map(co2_penalty);
    if let Some(p) = co2 {
        weighted_sum += CO2_WEIGHT * p;
        weight_total += CO2_WEIGHT;
        features.push("co2");
    }

    let voc = reading.voc.map(voc_penalty);
    if let Some(p) = voc {
        weighted_sum += VOC_WEIGHT * p;
        weight_total += VOC_WEIGHT;
        features.push("voc");
    }

    let comfort = if reading.temperature_c.is_some() || reading.relative_humidity.is_some() {
        let p = comfort_penalty(reading.temperature_c, reading.relative_humidity);
        weighted_sum += COMFORT_WEIGHT * p;
        weight_total += COMFORT_WEIGHT;
        if reading.temperature_c.is_some() {
            features.push("temperature_c");
        }
        if reading.relative_humidity.is_some() {
            features.push("relative_humidity");
        }
        Some(p)
    } else {
        None
    };

    if weight_total == 0.0 {
        return HeuristicVerdict::unknown();
    }

    let weighted_mean = weighted_sum / weight_total;
    let score = (100.0 - weighted_mean).clamp(0.0, 100.0);
    let term_count = [pm25, co2, voc, comfort].iter().filter(|p| p.is_some()).count();

    HeuristicVerdict {
        status: status_for(score).to_string(),
        score: Some(score),
        confidence: coverage_confidence(term_count),
        features_used: features,
        signals: json!({
            "penalty_pm25": pm25,
            "penalty_co2": co2,
            "penalty_voc": voc,
            "penalty_comfort": comfort,
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
    fn clean_air_is_excellent_or_good() {
        let r = reading(&[
            (Metric::Pm25, 10.0),
            (Metric::Co2, 400.0),
            (Metric::Voc, 50.0),
        ]);
        let verdict = score(&r);
        let s = verdict.score.unwrap();
        assert!(s >= 70.0, "score was {s}");
        assert!(matches!(verdict.status.as_str(), "Excellent" | "Good"));
    }

    #[test]
    fn comfort_baseline_scores_at_least_85() {
        let r = reading(&[
            (Metric::TemperatureC, 22.0),
            (Metric::RelativeHumidity, 45.0),
        ]);
        let verdict = score(&r);
        assert!(verdict.score.unwrap() >= 85.0);
        assert_eq!(verdict.status, "Excellent");
    }

    #[test]
    fn heavy_pm25_drags_the_index_down() {
        let clean = score(&reading(&[(Metric::Pm25, 5.0)]));
        let dirty = score(&reading(&[(Metric::Pm25, 150.0)]));
        assert!(dirty.score.unwrap() < clean.score.unwrap());
        assert!(dirty.score.unwrap() < 70.0);
    }

    #[test]
    fn weights_renormalize_over_available_terms() {
        // Only CO2 present: the full weight lands on its penalty.
        let r = reading(&[(Metric::Co2, 800.0)]);
        let verdict = score(&r);
        // Logistic penalty at the center is 50, so the index is 50.
        let s = verdict.score.unwrap();
        assert!((s - 50.0).abs() < 1e-9, "score was {s}");
    }

    #[test]
    fn voc_penalty_regimes() {
        assert_eq!(voc_penalty(100.0), 0.0);
        assert_eq!(voc_penalty(220.0), 0.0);
        assert!((voc_penalty(660.0) - VOC_RISK_CAP * 0.5).abs() < 1e-9);
        assert_eq!(voc_penalty(3000.0), VOC_RISK_CAP);
        // Monotone within the middle regime.
        assert!(voc_penalty(1000.0) > voc_penalty(700.0));
    }

    #[test]
    fn pm25_aqi_breakpoint_interpolation() {
        assert!((pm25_aqi(0.0) - 0.0).abs() < 1e-9);
        assert!((pm25_aqi(12.0) - 50.0).abs() < 1e-9);
        assert!((pm25_aqi(35.4) - 100.0).abs() < 1e-9);
        // Above the table, the top index is returned.
        assert_eq!(pm25_aqi(600.0), 500.0);
    }
}
