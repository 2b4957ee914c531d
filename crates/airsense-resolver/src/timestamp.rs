//! Reading timestamp recovery.
//!
//! Timestamps hide in as many places as the measurements do: a top-level
//! `timestamp`, an `observedAt` inside a wrapper object, a `ts` on an
//! attribute-array entry. The search walks the whole record to the same
//! bounded depth as numeric extraction, parses every candidate, and keeps
//! the most recent one. When nothing parses, wall-clock time is substituted
//! and flagged via `CanonicalReading::timestamp_estimated` so consumers can
//! account for staleness instead of silently trusting the reading.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::aliases::{normalize_key, TIMESTAMP_KEYS};
use crate::extract::MAX_DEPTH;

/// Resolve the reading timestamp from a raw attribute map.
///
/// Returns the timestamp and whether it is an estimate (wall clock).
pub fn resolve(map: &Map<String, Value>) -> (DateTime<Utc>, bool) {
    let mut best: Option<DateTime<Utc>> = None;
    collect(map, 0, &mut best);
    match best {
        Some(ts) => (ts, false),
        None => (Utc::now(), true),
    }
}

fn collect(map: &Map<String, Value>, depth: usize, best: &mut Option<DateTime<Utc>>) {
    if depth > MAX_DEPTH {
        return;
    }
    for (key, value) in map {
        if is_timestamp_key(key) {
            if let Some(ts) = parse_value(value) {
                if best.map_or(true, |b| ts > b) {
                    *best = Some(ts);
                }
            }
        }
        match value {
            Value::Object(inner) => collect(inner, depth + 1, best),
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(inner) = item {
                        collect(inner, depth + 1, best);
                    }
                }
            }
            _ => {}
        }
    }
}

fn is_timestamp_key(key: &str) -> bool {
    let normalized = normalize_key(key);
    TIMESTAMP_KEYS.iter().any(|k| normalize_key(k) == normalized)
}

/// Parse one candidate value: RFC 3339, a bare datetime string, or an
/// epoch number (seconds or milliseconds).
fn parse_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_text(s.trim()),
        Value::Number(n) => n.as_f64().and_then(parse_epoch),
        _ => None,
    }
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    text.parse::<f64>().ok().and_then(parse_epoch)
}

fn parse_epoch(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() || n <= 0.0 {
        return None;
    }
    // Values this large can only be millisecond epochs.
    let millis = if n >= 1e12 { n } else { n * 1000.0 };
    Utc.timestamp_millis_opt(millis as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn rfc3339_top_level() {
        let (ts, estimated) = resolve(&as_map(json!({
            "timestamp": "2026-02-01T10:30:00Z", "co2": 600
        })));
        assert!(!estimated);
        assert_eq!(ts.to_rfc3339(), "2026-02-01T10:30:00+00:00");
    }

    #[test]
    fn most_recent_candidate_wins() {
        let (ts, estimated) = resolve(&as_map(json!({
            "updatedAt": "2026-02-01T09:00:00Z",
            "co2": {"value": 640, "observedAt": "2026-02-01T11:00:00Z"}
        })));
        assert!(!estimated);
        assert_eq!(ts.to_rfc3339(), "2026-02-01T11:00:00+00:00");
    }

    #[test]
    fn epoch_seconds_and_millis() {
        let (secs, _) = resolve(&as_map(json!({"ts": 1_767_225_600})));
        let (millis, _) = resolve(&as_map(json!({"ts": 1_767_225_600_000_i64})));
        assert_eq!(secs, millis);
    }

    #[test]
    fn attribute_array_entry_timestamps() {
        let (ts, estimated) = resolve(&as_map(json!({
            "attributes": [
                {"name": "co2", "value": 700, "last_seen": "2026-02-01 08:15:00"}
            ]
        })));
        assert!(!estimated);
        assert_eq!(ts.to_rfc3339(), "2026-02-01T08:15:00+00:00");
    }

    #[test]
    fn wall_clock_fallback_is_flagged() {
        let before = Utc::now();
        let (ts, estimated) = resolve(&as_map(json!({"co2": 600})));
        assert!(estimated);
        assert!(ts >= before);
    }

    #[test]
    fn unparseable_candidates_are_skipped() {
        let (_, estimated) = resolve(&as_map(json!({"timestamp": "yesterday-ish"})));
        assert!(estimated);
    }
}
