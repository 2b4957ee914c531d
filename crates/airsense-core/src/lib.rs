//! Shared data model for the AirSense evaluation engine.
//!
//! This crate defines the canonical reading produced by the attribute
//! resolver, the per-use-case evaluation types consumed by collaborators,
//! the configuration surface, and the error taxonomy. It performs no I/O.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod reading;

pub use config::{EngineConfig, HistoryConfig, InferenceConfig};
pub use error::{EvalError, InferenceError, Result};
pub use evaluation::{
    EvaluationBundle, EvaluationDetails, Issue, ModelSource, Severity, UseCase, UseCaseEvaluation,
};
pub use reading::{CanonicalReading, DeltaRecord, Metric};
