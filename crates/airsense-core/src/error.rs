//! Error taxonomy for the evaluation engine.
//!
//! Absent features are not errors: they reduce feature counts and end as
//! Unknown evaluations. Remote failures are recovered locally via heuristic
//! fallback and never surface to callers. The only caller-visible failure
//! is a malformed raw device record, caught per device so one bad record
//! cannot abort a batch.

/// Top-level engine error.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// The raw device record is not an attribute map at all.
    #[error("malformed device record for '{device_id}': {reason}")]
    MalformedRecord { device_id: String, reason: String },

    /// A device evaluation task failed to join.
    #[error("evaluation task failed: {0}")]
    TaskFailed(String),
}

/// Remote inference failure. All variants resolve to heuristic fallback.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("inference endpoint unreachable: {0}")]
    Unavailable(String),

    #[error("inference call timed out after {0}s")]
    Timeout(u64),

    #[error("inference endpoint returned status {0}")]
    Status(u16),

    /// Response parsed but expected fields were missing. Treated exactly
    /// like `Unavailable` by the fallback policy.
    #[error("malformed inference response: {0}")]
    Malformed(String),

    /// The use case is disabled in configuration or no backend is wired.
    #[error("inference disabled for this use case")]
    Disabled,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EvalError>;
