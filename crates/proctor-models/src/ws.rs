//! Wire types for the `/ws/proctor` streaming endpoint.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One inbound text frame: a single base64-encoded JPEG, optionally
/// prefixed with a `data:image/...;base64,` URI scheme.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FrameRequest {
    pub frame: String,
}

/// The error frame sent in place of a `Verdict` when a frame cannot be
/// decoded. Unlike a transport-level failure, this never terminates the
/// session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorFrame {
    pub error: String,
}

impl ErrorFrame {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_request_deserializes_plain_base64() {
        let json = r#"{"frame": "abcd1234"}"#;
        let req: FrameRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.frame, "abcd1234");
    }

    #[test]
    fn test_error_frame_serializes_to_error_key() {
        let frame = ErrorFrame::new("invalid jpeg");
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"error":"invalid jpeg"}"#);
    }
}
