//! Engine configuration.
//!
//! Plain serde structs with builder-style setters. The library reads no
//! environment; flag parsing belongs to the embedding binary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::evaluation::UseCase;

fn default_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_idle_cycles() -> u64 {
    10
}

/// Remote inference configuration.
///
/// Health-index remote calls default to disabled: the reference deployment
/// always served health via the local scorer. Kept configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of the prediction service, e.g. "http://localhost:8000".
    /// `None` disables remote inference entirely.
    pub endpoint: Option<String>,

    /// Hard per-call timeout in seconds (default 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub enable_occupancy: bool,

    #[serde(default)]
    pub enable_health: bool,

    #[serde(default = "default_true")]
    pub enable_smoke: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            enable_occupancy: true,
            enable_health: false,
            enable_smoke: true,
        }
    }
}

impl InferenceConfig {
    /// Get the per-call timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Set the service endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the per-call timeout in seconds.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Enable or disable remote calls for one use case.
    pub fn with_use_case_enabled(mut self, use_case: UseCase, enabled: bool) -> Self {
        match use_case {
            UseCase::Occupancy => self.enable_occupancy = enabled,
            UseCase::HealthIndex => self.enable_health = enabled,
            UseCase::SmokeDetection => self.enable_smoke = enabled,
        }
        self
    }

    /// Whether remote calls are enabled for a use case.
    pub fn is_enabled(&self, use_case: UseCase) -> bool {
        match use_case {
            UseCase::Occupancy => self.enable_occupancy,
            UseCase::HealthIndex => self.enable_health,
            UseCase::SmokeDetection => self.enable_smoke,
        }
    }
}

/// Snapshot history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Evict a device's snapshot after this many cycles without a sighting.
    #[serde(default = "default_max_idle_cycles")]
    pub max_idle_cycles: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_idle_cycles: default_max_idle_cycles(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_remote_defaults_disabled() {
        let config = InferenceConfig::default();
        assert!(config.is_enabled(UseCase::Occupancy));
        assert!(!config.is_enabled(UseCase::HealthIndex));
        assert!(config.is_enabled(UseCase::SmokeDetection));
    }

    #[test]
    fn builder_round_trip() {
        let config = InferenceConfig::default()
            .with_endpoint("http://localhost:8000")
            .with_timeout_secs(3)
            .with_use_case_enabled(UseCase::HealthIndex, true);
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:8000"));
        assert_eq!(config.timeout(), Duration::from_secs(3));
        assert!(config.is_enabled(UseCase::HealthIndex));
    }

    #[test]
    fn deserialize_applies_defaults() {
        let config: InferenceConfig = serde_json::from_str(r#"{"endpoint":null}"#).unwrap();
        assert_eq!(config.timeout_secs, 10);
        assert!(config.enable_occupancy);
        assert!(!config.enable_health);
    }
}
