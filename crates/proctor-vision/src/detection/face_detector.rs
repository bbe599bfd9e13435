//! Face presence/count detection via OpenCV's YuNet face detector.
//!
//! Grounded on the teacher's `yunet.rs`: a small ONNX face detector wrapped
//! by `opencv::objdetect::FaceDetectorYN`, loaded once and reused across
//! frames. Confidence is taken straight from the detector's own score.

use std::sync::Mutex;

use opencv::core::{Mat, Size};
use opencv::objdetect::FaceDetectorYN;
use opencv::prelude::*;

use proctor_models::BoundingBox;

use crate::error::{VisionError, VisionResult};

const MODEL_PATH: &str = "models/face_detection_yunet.onnx";
const SCORE_THRESHOLD: f32 = 0.7;
const NMS_THRESHOLD: f32 = 0.3;
const TOP_K: i32 = 10;

/// One detected face, with its bounding box in the coordinate space of the
/// frame it was detected on (the downscaled analysis frame).
#[derive(Debug, Clone)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    pub score: f64,
}

pub struct FaceDetector {
    detector: Mutex<opencv::core::Ptr<FaceDetectorYN>>,
}

impl FaceDetector {
    pub fn load() -> VisionResult<Self> {
        if !std::path::Path::new(MODEL_PATH).exists() {
            return Err(VisionError::model_not_found(MODEL_PATH));
        }

        let detector = FaceDetectorYN::create(
            MODEL_PATH,
            "",
            Size::new(320, 320),
            SCORE_THRESHOLD,
            NMS_THRESHOLD,
            TOP_K,
            opencv::dnn::DNN_BACKEND_DEFAULT,
            opencv::dnn::DNN_TARGET_CPU,
        )
        .map_err(|e| VisionError::model_load_failed(format!("yunet load failed: {e}")))?;

        Ok(Self { detector: Mutex::new(detector) })
    }

    /// Detect faces in a BGR frame. Returns detections sorted by
    /// descending score; callers needing just the count/top score can take
    /// the first entry.
    pub fn detect(&self, frame_bgr: &Mat) -> VisionResult<Vec<FaceDetection>> {
        let size = frame_bgr
            .size()
            .map_err(|e| VisionError::inference_failed(format!("bad frame size: {e}")))?;

        let mut detector = self
            .detector
            .lock()
            .map_err(|_| VisionError::internal("face detector lock poisoned"))?;

        detector
            .set_input_size(size)
            .map_err(|e| VisionError::inference_failed(format!("set_input_size failed: {e}")))?;

        let mut faces = Mat::default();
        detector
            .detect(frame_bgr, &mut faces)
            .map_err(|e| VisionError::inference_failed(format!("yunet detect failed: {e}")))?;

        if faces.empty() {
            return Ok(Vec::new());
        }

        let rows = faces.rows();
        let mut out = Vec::with_capacity(rows as usize);
        for r in 0..rows {
            let x = *faces.at_2d::<f32>(r, 0).map_err(|e| VisionError::internal(e.to_string()))?;
            let y = *faces.at_2d::<f32>(r, 1).map_err(|e| VisionError::internal(e.to_string()))?;
            let w = *faces.at_2d::<f32>(r, 2).map_err(|e| VisionError::internal(e.to_string()))?;
            let h = *faces.at_2d::<f32>(r, 3).map_err(|e| VisionError::internal(e.to_string()))?;
            let score = *faces.at_2d::<f32>(r, 14).map_err(|e| VisionError::internal(e.to_string()))?;

            out.push(FaceDetection {
                bbox: BoundingBox::new(x as f64, y as f64, w as f64, h as f64),
                score: score as f64,
            });
        }

        out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_detection_holds_score_and_bbox() {
        let d = FaceDetection { bbox: BoundingBox::new(1.0, 2.0, 10.0, 10.0), score: 0.95 };
        assert_eq!(d.bbox.x, 1.0);
        assert!(d.score > 0.9);
    }
}
