//! Raw record to canonical reading resolution.
//!
//! For each canonical metric, the alias list is tried in three stages with
//! fixed precedence:
//!
//! 1. exact top-level key;
//! 2. nested attribute-array entries, matched case-insensitively by whole
//!    name first, then by substring (substring only when the alias is
//!    longer than 3 characters);
//! 3. normalized (lowercased, separator-stripped) top-level key match,
//!    exact then partial; partials need an alias longer than 3 characters
//!    and skip keys that are themselves another metric's alias, so a
//!    record reporting only `pm10` can never populate `pm1`.
//!
//! The first stage that yields a finite number wins; multiple matches are
//! settled by alias order and are never surfaced as an error.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use airsense_core::error::EvalError;
use airsense_core::{CanonicalReading, Metric};

use crate::aliases::{self, normalize_key};
use crate::extract;
use crate::timestamp;

/// Keys an attribute-array entry may use to name its measurement.
const ENTRY_NAME_KEYS: &[&str] = &["name", "attribute", "key", "label", "id"];

/// Resolve one raw device record into a canonical reading.
///
/// The only failure mode is a record that is not an attribute map at all;
/// every per-field miss just leaves that field null.
pub fn resolve_reading(device_id: &str, raw: &Value) -> Result<CanonicalReading, EvalError> {
    let map = raw.as_object().ok_or_else(|| EvalError::MalformedRecord {
        device_id: device_id.to_string(),
        reason: format!("expected attribute map, got {}", value_kind(raw)),
    })?;

    let (ts, estimated) = timestamp::resolve(map);
    let mut reading = CanonicalReading::empty(device_id, ts);
    reading.timestamp_estimated = estimated;

    for metric in Metric::ALL {
        let value = resolve_metric(map, metric);
        if value.is_none() {
            trace!("no value for {} on device '{}'", metric, device_id);
        }
        reading.set(metric, value);
    }

    debug!(
        "resolved {}/{} metrics for device '{}' (timestamp_estimated={})",
        reading.metric_count(),
        Metric::ALL.len(),
        device_id,
        reading.timestamp_estimated
    );
    Ok(reading)
}

/// Resolve a single metric from an attribute map using its alias list.
pub fn resolve_metric(map: &Map<String, Value>, metric: Metric) -> Option<f64> {
    let aliases = aliases::for_metric(metric);
    // Stage 1: exact top-level keys.
    for alias in aliases {
        if let Some(value) = map.get(*alias) {
            if let Some(v) = extract::numeric(value) {
                return Some(v);
            }
        }
    }

    // Stage 2: attribute-array entries.
    let entries: Vec<&Map<String, Value>> = map
        .values()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_object)
        .collect();
    if !entries.is_empty() {
        for alias in aliases {
            // Whole-name matches across all entries first.
            for entry in &entries {
                if let Some(name) = entry_name(entry) {
                    if name.eq_ignore_ascii_case(alias) {
                        if let Some(v) = extract::numeric(&Value::Object((*entry).clone())) {
                            return Some(v);
                        }
                    }
                }
            }
            // Substring matches only for aliases long enough to be specific.
            if alias.len() > 3 {
                let needle = alias.to_lowercase();
                for entry in &entries {
                    if let Some(name) = entry_name(entry) {
                        if name.to_lowercase().contains(&needle) {
                            if let Some(v) = extract::numeric(&Value::Object((*entry).clone())) {
                                return Some(v);
                            }
                        }
                    }
                }
            }
        }
    }

    // Stage 3: normalized top-level keys, exact then partial.
    for alias in aliases {
        let needle = normalize_key(alias);
        for (key, value) in map {
            if normalize_key(key) == needle {
                if let Some(v) = extract::numeric(value) {
                    return Some(v);
                }
            }
        }
    }
    for alias in aliases {
        let needle = normalize_key(alias);
        if needle.len() <= 3 {
            continue;
        }
        for (key, value) in map {
            let normalized = normalize_key(key);
            if normalized.contains(&needle)
                && !aliases::belongs_to_other_metric(&normalized, metric)
            {
                if let Some(v) = extract::numeric(value) {
                    return Some(v);
                }
            }
        }
    }

    None
}

fn entry_name(entry: &Map<String, Value>) -> Option<&str> {
    for name_key in ENTRY_NAME_KEYS {
        for (key, value) in entry {
            if key.eq_ignore_ascii_case(name_key) {
                if let Some(s) = value.as_str() {
                    return Some(s);
                }
            }
        }
    }
    None
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolve(raw: Value) -> CanonicalReading {
        resolve_reading("dev-1", &raw).unwrap()
    }

    #[test]
    fn exact_key_with_wrapper_object() {
        let reading = resolve(json!({
            "SCD41_CO2_value": {"value": 812, "type": "Number"}
        }));
        assert_eq!(reading.co2, Some(812.0));
    }

    #[test]
    fn bare_scalar_keys() {
        let reading = resolve(json!({
            "co2": 1100, "voc": 450, "temp_c": 22, "rh": 45
        }));
        assert_eq!(reading.co2, Some(1100.0));
        assert_eq!(reading.voc, Some(450.0));
        assert_eq!(reading.temperature_c, Some(22.0));
        assert_eq!(reading.relative_humidity, Some(45.0));
    }

    #[test]
    fn attribute_array_whole_name() {
        let reading = resolve(json!({
            "attributes": [
                {"name": "co2", "value": 640},
                {"name": "temperature", "value": 21.5}
            ]
        }));
        assert_eq!(reading.co2, Some(640.0));
        assert_eq!(reading.temperature_c, Some(21.5));
    }

    #[test]
    fn attribute_array_substring_needs_long_alias() {
        let reading = resolve(json!({
            "attributes": [
                {"name": "indoor carbon_dioxide sensor", "value": 720}
            ]
        }));
        // Matched via the "carbon_dioxide" alias substring; the 3-char
        // "co2" alias alone would not substring-match.
        assert_eq!(reading.co2, Some(720.0));
    }

    #[test]
    fn normalized_key_match() {
        let reading = resolve(json!({
            "Relative-Humidity": 48.5,
            "PM 2.5": 11.0
        }));
        assert_eq!(reading.relative_humidity, Some(48.5));
        assert_eq!(reading.pm25, Some(11.0));
    }

    #[test]
    fn normalized_partial_match() {
        let reading = resolve(json!({
            "device_co2_ppm_reading": 903
        }));
        assert_eq!(reading.co2, Some(903.0));
    }

    #[test]
    fn alias_order_settles_ambiguity() {
        // Both keys resolve for CO2; the earlier alias wins.
        let reading = resolve(json!({
            "co2": 500,
            "SCD41_CO2_value": {"value": 900}
        }));
        assert_eq!(reading.co2, Some(500.0));
    }

    #[test]
    fn pm10_only_record_keeps_pm1_null() {
        // "pm10" must satisfy only the coarse-dust lookup; a phantom pm1
        // here would feed the pm1 issue row and the printer override.
        let reading = resolve(json!({"pm10": 60}));
        assert_eq!(reading.pm10, Some(60.0));
        assert_eq!(reading.pm1, None);
    }

    #[test]
    fn sensor_model_pm1_key_does_not_bleed_into_pm10() {
        let reading = resolve(json!({"sen55_pm1_0": 12.5}));
        assert_eq!(reading.pm1, Some(12.5));
        assert_eq!(reading.pm10, None);
    }

    #[test]
    fn unresolvable_fields_stay_null() {
        let reading = resolve(json!({"battery": 85, "firmware": "2.1.0"}));
        assert!(reading.is_empty());
    }

    #[test]
    fn non_object_record_is_the_only_error() {
        let err = resolve_reading("dev-1", &json!("garbage")).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("dev-1"));
        assert!(msg.contains("string"));
    }
}
