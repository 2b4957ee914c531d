//! Per-metric alias tables.
//!
//! Ordered by precedence: the plain canonical spelling first, common
//! firmware variants after, sensor-model-prefixed spellings last. Order
//! matters: the resolver takes the first alias that yields a number, so
//! ambiguity between multiple matching keys is settled here, never
//! surfaced to callers.

use airsense_core::Metric;

pub const CO2: &[&str] = &[
    "co2",
    "CO2",
    "co2_ppm",
    "CO2_ppm",
    "co2Level",
    "co2_level",
    "carbonDioxide",
    "carbon_dioxide",
    "carbon_dioxide_ppm",
    "co2_concentration",
    "SCD41_CO2_value",
    "scd41_co2",
    "scd30_co2",
    "senseair_co2",
];

pub const VOC: &[&str] = &[
    "voc",
    "tvoc",
    "VOC",
    "TVOC",
    "voc_ppb",
    "tvoc_ppb",
    "vocIndex",
    "voc_index",
    "tvocLevel",
    "volatile_organic_compounds",
    "SGP40_VOC_value",
    "sgp40_voc",
    "sgp30_tvoc",
];

// No separator-spelled "pm1_0"/"PM1.0" variants here: those normalize to
// "pm10" and would steal the coarse-dust reading.
pub const PM1: &[&str] = &[
    "pm1",
    "pm01",
    "pm1p0",
    "pm_1",
    "pm1_ug_m3",
    "particulate_matter_1",
    "sen55_pm1_0",
    "sps30_pm1",
];

pub const PM25: &[&str] = &[
    "pm25",
    "pm2_5",
    "pm2.5",
    "PM2.5",
    "pm2p5",
    "pm_2_5",
    "pm25_ug_m3",
    "fine_dust",
    "particulate_matter_2_5",
    "sen55_pm2_5",
    "sps30_pm2_5",
];

pub const PM4: &[&str] = &[
    "pm4",
    "pm4_0",
    "pm4p0",
    "PM4.0",
    "pm_4",
    "particulate_matter_4",
    "sen55_pm4_0",
    "sps30_pm4",
];

pub const PM10: &[&str] = &[
    "pm10",
    "PM10",
    "pm10_0",
    "pm10p0",
    "pm_10",
    "pm10_ug_m3",
    "coarse_dust",
    "particulate_matter_10",
    "sen55_pm10_0",
    "sps30_pm10",
];

pub const TEMPERATURE_C: &[&str] = &[
    "temperature",
    "temp",
    "temp_c",
    "temperature_c",
    "temperatureC",
    "tempC",
    "air_temperature",
    "ambient_temperature",
    "scd41_temperature",
    "sen55_temperature",
    "sht40_temperature",
    "t",
];

pub const RELATIVE_HUMIDITY: &[&str] = &[
    "humidity",
    "rh",
    "relative_humidity",
    "relativeHumidity",
    "humidity_percent",
    "hum",
    "air_humidity",
    "rel_hum",
    "scd41_humidity",
    "sen55_humidity",
    "sht40_humidity",
];

/// Alias list for one canonical metric.
pub fn for_metric(metric: Metric) -> &'static [&'static str] {
    match metric {
        Metric::Co2 => CO2,
        Metric::Voc => VOC,
        Metric::Pm1 => PM1,
        Metric::Pm25 => PM25,
        Metric::Pm4 => PM4,
        Metric::Pm10 => PM10,
        Metric::TemperatureC => TEMPERATURE_C,
        Metric::RelativeHumidity => RELATIVE_HUMIDITY,
    }
}

/// True when `normalized` is exactly the normalized spelling of an alias
/// belonging to a metric other than `metric`. Partial key matching skips
/// such keys so a `pm10` key can never satisfy a `pm1` lookup.
pub fn belongs_to_other_metric(normalized: &str, metric: Metric) -> bool {
    Metric::ALL.iter().any(|other| {
        *other != metric
            && for_metric(*other)
                .iter()
                .any(|alias| normalize_key(alias) == normalized)
    })
}

/// Keys that may carry a reading timestamp, anywhere in the record.
pub const TIMESTAMP_KEYS: &[&str] = &[
    "timestamp",
    "observedAt",
    "observed_at",
    "time",
    "ts",
    "lastSeen",
    "last_seen",
    "updatedAt",
    "updated_at",
    "reportedAt",
    "reported_at",
    "recordedAt",
    "recorded_at",
];

/// Lowercase + strip separators, so `SCD41_CO2_value` and `scd41co2value`
/// compare equal.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | '.' | ' '))
        .flat_map(|c| c.to_lowercase())
        .collect()
}
