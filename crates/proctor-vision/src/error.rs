//! Error types for detector adapters, geometric analyzers and the session pipeline.

use thiserror::Error;

/// Result type used throughout this crate.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur while loading models or processing a frame.
///
/// Most of these never reach a caller as an `Err` in normal operation: a
/// detector adapter that hits `ModelLoadFailed` at startup degrades to
/// `Availability::Unavailable` rather than propagating, and a solver that
/// hits `SolverDegenerate` returns neutral scalars instead of bubbling up.
/// The variants exist so internal call sites can use `?` and the registry
/// can log the failure once before swallowing it.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("model failed to load: {0}")]
    ModelLoadFailed(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("frame decode failed: {0}")]
    DecodeFailed(String),

    #[error("PnP solver did not converge")]
    SolverDegenerate,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl VisionError {
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    pub fn model_load_failed(message: impl Into<String>) -> Self {
        Self::ModelLoadFailed(message.into())
    }

    pub fn inference_failed(message: impl Into<String>) -> Self {
        Self::InferenceFailed(message.into())
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        Self::DecodeFailed(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
