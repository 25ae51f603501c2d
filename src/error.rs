//! Error types for the restoration pipeline.
//!
//! Retryable conditions (`ResourceExhausted`) are ordinary values consumed by
//! the orchestrator's split ladder; everything else surfaces to the caller
//! unchanged.
use thiserror::Error;

/// Top-level pipeline error.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// Malformed input detected before any allocation (zero-area image,
    /// mask/image dimension mismatch). Never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The split ladder and the single global re-plan both ran out of
    /// memory. `plan` names the last attempted strategy.
    #[error("memory budget exhausted (last plan: {plan})")]
    ResourceExhausted { plan: String },

    /// The inpainting device is gone and no fallback device was configured.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The caller raised the cancellation token and did not opt into
    /// partial results.
    #[error("cancelled")]
    Cancelled,
}

impl RestoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        RestoreError::Validation(msg.into())
    }
}
