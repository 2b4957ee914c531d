//! Bounded-depth numeric extraction from arbitrary JSON shapes.
//!
//! Raw attribute values arrive as bare scalars, `{value, type, observedAt}`
//! wrappers, arrays of samples, or deeper nestings of all three. Extraction
//! is a recursive visitor over the serde_json value tree, capped at depth 5,
//! that prefers well-known wrapper sub-keys before probing anything else.
//! It returns `None` on failure, never an error.

use serde_json::Value;

/// Maximum recursion depth when unwrapping nested shapes.
pub const MAX_DEPTH: usize = 5;

/// Wrapper sub-keys that most likely carry the actual reading, in
/// precedence order.
const PRIORITY_SUBKEYS: &[&str] = &[
    "value",
    "avg",
    "average",
    "mean",
    "raw",
    "reading",
    "current",
    "level",
    "measurement",
];

/// Extract a finite numeric value from an arbitrarily shaped JSON value.
pub fn numeric(value: &Value) -> Option<f64> {
    numeric_at(value, 0)
}

fn numeric_at(value: &Value, depth: usize) -> Option<f64> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        Value::Object(map) => {
            // Well-known wrapper keys first, case-insensitively.
            for subkey in PRIORITY_SUBKEYS {
                for (key, inner) in map {
                    if key.eq_ignore_ascii_case(subkey) {
                        if let Some(v) = numeric_at(inner, depth + 1) {
                            return Some(v);
                        }
                    }
                }
            }
            // Then any other numeric-bearing key. serde_json's map is
            // key-ordered, which makes this precedence deterministic.
            for (key, inner) in map {
                if PRIORITY_SUBKEYS.iter().any(|s| key.eq_ignore_ascii_case(s)) {
                    continue;
                }
                if let Some(v) = numeric_at(inner, depth + 1) {
                    return Some(v);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| numeric_at(item, depth + 1)),
        Value::Bool(_) | Value::Null => None,
    }
}
