//! Frame decoding: the one place this crate turns raw bytes into a `Mat`.

use opencv::core::Vector;
use opencv::imgcodecs;
use opencv::prelude::*;

use crate::error::{VisionError, VisionResult};

/// Decode a JPEG (or any format OpenCV's `imdecode` understands) byte buffer
/// into a BGR `Mat`. Used at the transport boundary so callers never need
/// their own OpenCV dependency just to hand frames to the pipeline.
pub fn decode_jpeg_bgr(bytes: &[u8]) -> VisionResult<opencv::core::Mat> {
    let buf = Vector::<u8>::from_slice(bytes);
    let frame = imgcodecs::imdecode(&buf, imgcodecs::IMREAD_COLOR)
        .map_err(|e| VisionError::decode_failed(e.to_string()))?;

    if frame.empty() {
        return Err(VisionError::decode_failed("decoded frame is empty"));
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_jpeg_bgr_rejects_garbage_bytes() {
        let err = decode_jpeg_bgr(b"not a jpeg").unwrap_err();
        assert!(matches!(err, VisionError::DecodeFailed(_)));
    }
}
