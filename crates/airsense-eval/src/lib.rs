//! Dual-strategy evaluation engine.
//!
//! Every polling cycle, each device's canonical reading is classified for
//! three use cases: occupancy, health index, and smoke detection. A remote
//! inference service is preferred per use case; a deterministic local
//! scorer takes over whenever the remote call fails, times out, or is
//! disabled. The output shape is identical either way: consumers see one
//! `EvaluationBundle` per device per cycle, with a `fallback` flag marking
//! degraded provenance.

pub mod heuristics;
pub mod inference;
pub mod issues;
pub mod orchestrator;
pub mod overrides;

pub use inference::{HttpInference, InferenceBackend, RemotePrediction};
pub use orchestrator::Evaluator;
pub use overrides::{DeviceOverride, OverrideRegistry};
