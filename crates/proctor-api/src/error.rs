//! Engine error types.
//!
//! There is no REST surface in this engine beyond `/health` and `/metrics`,
//! so unlike the teacher's `ApiError` this type does not implement
//! `IntoResponse`: transport-facing failures convert to `{"error": ...}`
//! text frames instead (see `ws.rs`), following the same "typed error at
//! the boundary" discipline.

use proctor_models::ErrorFrame;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid frame payload: {0}")]
    InvalidFrame(String),

    #[error("frame decode failed: {0}")]
    DecodeFailed(String),

    #[error(transparent)]
    Vision(#[from] proctor_vision::VisionError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(msg.into())
    }

    pub fn decode_failed(msg: impl Into<String>) -> Self {
        Self::DecodeFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Convert to the wire-level error frame sent back over the socket.
    /// Never exposes internal detail beyond the error's own message, since
    /// there is no untrusted multi-tenant boundary to hide it from here.
    pub fn to_error_frame(&self) -> ErrorFrame {
        ErrorFrame::new(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failed_round_trips_message() {
        let err = EngineError::decode_failed("corrupt jpeg");
        assert_eq!(err.to_error_frame().error, "frame decode failed: corrupt jpeg");
    }
}
