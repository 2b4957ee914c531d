//! Canonical sensor reading.
//!
//! A `CanonicalReading` is the fixed-field numeric projection of one raw
//! device record. It is rebuilt from scratch every polling cycle and never
//! mutated afterwards; the previous cycle's reading lives in the snapshot
//! history until replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed set of metrics a reading can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Co2,
    Voc,
    Pm1,
    Pm25,
    Pm4,
    Pm10,
    TemperatureC,
    RelativeHumidity,
}

impl Metric {
    /// All metrics in canonical order.
    pub const ALL: [Metric; 8] = [
        Metric::Co2,
        Metric::Voc,
        Metric::Pm1,
        Metric::Pm25,
        Metric::Pm4,
        Metric::Pm10,
        Metric::TemperatureC,
        Metric::RelativeHumidity,
    ];

    /// Canonical field name, matching the serialized reading.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Co2 => "co2",
            Metric::Voc => "voc",
            Metric::Pm1 => "pm1",
            Metric::Pm25 => "pm25",
            Metric::Pm4 => "pm4",
            Metric::Pm10 => "pm10",
            Metric::TemperatureC => "temperature_c",
            Metric::RelativeHumidity => "relative_humidity",
        }
    }

    /// Measurement unit for display and issue records.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Co2 => "ppm",
            Metric::Voc => "ppb",
            Metric::Pm1 | Metric::Pm25 | Metric::Pm4 | Metric::Pm10 => "µg/m³",
            Metric::TemperatureC => "°C",
            Metric::RelativeHumidity => "%",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-field numeric projection of one raw device record.
///
/// Every metric is either absent or a finite number; NaN and infinities are
/// rejected during extraction. `timestamp_estimated` is set when no
/// timestamp could be recovered from the record and wall-clock time was
/// substituted, so consumers can treat the reading as potentially stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalReading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    /// True when the timestamp is wall-clock fallback, not device-reported.
    #[serde(default)]
    pub timestamp_estimated: bool,
    pub co2: Option<f64>,
    pub voc: Option<f64>,
    pub pm1: Option<f64>,
    pub pm25: Option<f64>,
    pub pm4: Option<f64>,
    pub pm10: Option<f64>,
    pub temperature_c: Option<f64>,
    pub relative_humidity: Option<f64>,
}

impl CanonicalReading {
    /// Create an empty reading for a device at a given timestamp.
    pub fn empty(device_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            timestamp_estimated: false,
            co2: None,
            voc: None,
            pm1: None,
            pm25: None,
            pm4: None,
            pm10: None,
            temperature_c: None,
            relative_humidity: None,
        }
    }

    /// Get a metric value by name.
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Co2 => self.co2,
            Metric::Voc => self.voc,
            Metric::Pm1 => self.pm1,
            Metric::Pm25 => self.pm25,
            Metric::Pm4 => self.pm4,
            Metric::Pm10 => self.pm10,
            Metric::TemperatureC => self.temperature_c,
            Metric::RelativeHumidity => self.relative_humidity,
        }
    }

    /// Set a metric value. Non-finite values are dropped to `None` so the
    /// null-or-finite invariant holds by construction.
    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        match metric {
            Metric::Co2 => self.co2 = value,
            Metric::Voc => self.voc = value,
            Metric::Pm1 => self.pm1 = value,
            Metric::Pm25 => self.pm25 = value,
            Metric::Pm4 => self.pm4 = value,
            Metric::Pm10 => self.pm10 = value,
            Metric::TemperatureC => self.temperature_c = value,
            Metric::RelativeHumidity => self.relative_humidity = value,
        }
    }

    /// Number of populated metrics.
    pub fn metric_count(&self) -> usize {
        Metric::ALL.iter().filter(|m| self.get(**m).is_some()).count()
    }

    /// True when no metric resolved at all.
    pub fn is_empty(&self) -> bool {
        self.metric_count() == 0
    }

    /// Names of the populated metrics, in canonical order.
    pub fn present_metrics(&self) -> Vec<&'static str> {
        Metric::ALL
            .iter()
            .filter(|m| self.get(**m).is_some())
            .map(|m| m.name())
            .collect()
    }
}

/// Signed inter-cycle differences between the current and previous reading.
///
/// Transient: rebuilt each cycle, never persisted. A delta is only present
/// when both the current and previous cycle carried the metric.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub co2: Option<f64>,
    pub voc: Option<f64>,
    pub pm1: Option<f64>,
    pub pm25: Option<f64>,
    pub pm4: Option<f64>,
    pub pm10: Option<f64>,
    pub temperature_c: Option<f64>,
    pub relative_humidity: Option<f64>,
    /// Seconds between the two readings, when both timestamps are real.
    pub elapsed_secs: Option<f64>,
}

impl DeltaRecord {
    /// Compute current − previous over the shared metric set.
    pub fn between(current: &CanonicalReading, previous: &CanonicalReading) -> Self {
        let diff = |m: Metric| match (current.get(m), previous.get(m)) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        };
        let elapsed_secs = if current.timestamp_estimated || previous.timestamp_estimated {
            None
        } else {
            Some((current.timestamp - previous.timestamp).num_milliseconds() as f64 / 1000.0)
        };
        Self {
            co2: diff(Metric::Co2),
            voc: diff(Metric::Voc),
            pm1: diff(Metric::Pm1),
            pm25: diff(Metric::Pm25),
            pm4: diff(Metric::Pm4),
            pm10: diff(Metric::Pm10),
            temperature_c: diff(Metric::TemperatureC),
            relative_humidity: diff(Metric::RelativeHumidity),
            elapsed_secs,
        }
    }
}
