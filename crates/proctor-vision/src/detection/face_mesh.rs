//! Dense facial-landmark (iris-refined) detection.
//!
//! Adapted from the teacher's `face_mesh.rs`: expand the face ROI by 25% and
//! square it, resize to the model's fixed input, run inference, then map
//! normalized landmarks back to original-frame pixel coordinates via a
//! center-based affine transform.

use std::sync::Mutex;

use opencv::core::{Mat, Rect};
use opencv::imgproc;
use opencv::prelude::*;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use proctor_models::Point2D;

use crate::error::{VisionError, VisionResult};

const MODEL_PATH: &str = "models/face_mesh.onnx";
const INPUT_SIZE: i32 = 192;
const ROI_EXPAND: f64 = 1.25;
pub const NUM_LANDMARKS: usize = 478; // 468 mesh points + 10 iris points

/// Per-eye landmark indices used by the geometric analyzers (MediaPipe mesh topology).
pub const LEFT_EYE_CORNERS: (usize, usize) = (33, 133);
pub const RIGHT_EYE_CORNERS: (usize, usize) = (362, 263);
pub const LEFT_EYE_VERTICAL: [(usize, usize); 2] = [(159, 145), (160, 144)];
pub const RIGHT_EYE_VERTICAL: [(usize, usize); 2] = [(386, 374), (387, 373)];
pub const LEFT_IRIS_CENTER: usize = 468;
pub const RIGHT_IRIS_CENTER: usize = 473;

/// The 6 points the PnP solver needs, indexed into the mesh.
pub const NOSE_TIP: usize = 1;
pub const CHIN: usize = 152;
pub const LEFT_EYE_OUTER: usize = 33;
pub const RIGHT_EYE_OUTER: usize = 263;
pub const LEFT_MOUTH_CORNER: usize = 61;
pub const RIGHT_MOUTH_CORNER: usize = 291;

#[derive(Debug, Clone)]
pub struct FaceMeshResult {
    pub landmarks: Vec<Point2D>,
}

pub struct FaceMeshDetector {
    session: Mutex<Session>,
}

impl FaceMeshDetector {
    pub fn load() -> VisionResult<Self> {
        if !std::path::Path::new(MODEL_PATH).exists() {
            return Err(VisionError::model_not_found(MODEL_PATH));
        }

        let model_bytes = std::fs::read(MODEL_PATH)?;
        let session = Session::builder()
            .map_err(|e| VisionError::model_load_failed(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::model_load_failed(e.to_string()))?
            .commit_from_memory(&model_bytes)
            .map_err(|e| VisionError::model_load_failed(format!("face mesh load failed: {e}")))?;

        Ok(Self { session: Mutex::new(session) })
    }

    /// Run inference on one face ROI (in original-frame pixel coordinates)
    /// and return landmarks mapped back to that same coordinate space.
    pub fn detect(&self, frame_bgr: &Mat, roi: &Rect) -> VisionResult<FaceMeshResult> {
        let (square, frame_size) = make_square_crop(frame_bgr, roi)?;
        let crop = Mat::roi(frame_bgr, square)
            .map_err(|e| VisionError::inference_failed(format!("roi crop failed: {e}")))?;

        let mut resized = Mat::default();
        imgproc::resize(
            &crop,
            &mut resized,
            opencv::core::Size::new(INPUT_SIZE, INPUT_SIZE),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )
        .map_err(|e| VisionError::inference_failed(format!("resize failed: {e}")))?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| VisionError::inference_failed(format!("color convert failed: {e}")))?;

        let tensor = mat_to_chw_tensor(&rgb)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::internal("face mesh session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| VisionError::inference_failed(format!("face mesh inference failed: {e}")))?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference_failed(format!("extract tensor failed: {e}")))?;

        let landmarks = extract_landmarks(&raw, square, frame_size);
        Ok(FaceMeshResult { landmarks })
    }
}

/// Expand `roi` by `ROI_EXPAND` and force it square, clamped to the frame bounds.
fn make_square_crop(frame_bgr: &Mat, roi: &Rect) -> VisionResult<(Rect, (i32, i32))> {
    let frame_size = frame_bgr
        .size()
        .map_err(|e| VisionError::inference_failed(format!("bad frame size: {e}")))?;

    let cx = roi.x as f64 + roi.width as f64 / 2.0;
    let cy = roi.y as f64 + roi.height as f64 / 2.0;
    let side = (roi.width.max(roi.height) as f64 * ROI_EXPAND).max(1.0);

    let half = side / 2.0;
    let x = (cx - half).max(0.0) as i32;
    let y = (cy - half).max(0.0) as i32;
    let side_i = side as i32;
    let width = side_i.min(frame_size.width - x).max(1);
    let height = side_i.min(frame_size.height - y).max(1);

    Ok((Rect::new(x, y, width, height), (frame_size.width, frame_size.height)))
}

fn mat_to_chw_tensor(rgb: &Mat) -> VisionResult<Value> {
    let size = rgb.size().map_err(|e| VisionError::internal(e.to_string()))?;
    let (w, h) = (size.width as usize, size.height as usize);

    let mut chw = Vec::with_capacity(3 * h * w);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let pixel = rgb
                    .at_2d::<opencv::core::Vec3b>(y as i32, x as i32)
                    .map_err(|e| VisionError::internal(e.to_string()))?;
                // Normalize to [-1, 1] as the model expects.
                chw.push(pixel[c] as f32 / 127.5 - 1.0);
            }
        }
    }

    Tensor::from_array((vec![1usize, 3, h, w], chw.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| VisionError::inference_failed(format!("failed to build tensor: {e}")))
}

/// Map normalized model-space landmarks back to original-frame pixel
/// coordinates using the square crop's origin and scale.
fn extract_landmarks(raw: &[f32], crop: Rect, _frame_size: (i32, i32)) -> Vec<Point2D> {
    raw.chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|p| {
            let x = crop.x as f64 + (p[0] as f64 / INPUT_SIZE as f64) * crop.width as f64;
            let y = crop.y as f64 + (p[1] as f64 / INPUT_SIZE as f64) * crop.height as f64;
            Point2D::new(x, y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_landmarks_maps_center_correctly() {
        let crop = Rect::new(100, 100, 200, 200);
        // A landmark at the model-space center should map to the crop's center.
        let raw = vec![INPUT_SIZE as f32 / 2.0, INPUT_SIZE as f32 / 2.0, 0.0];
        let landmarks = extract_landmarks(&raw, crop, (1000, 1000));
        assert_eq!(landmarks.len(), 1);
        assert!((landmarks[0].x - 200.0).abs() < 1.0);
        assert!((landmarks[0].y - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_landmark_indices_are_distinct() {
        let indices = [NOSE_TIP, CHIN, LEFT_EYE_OUTER, RIGHT_EYE_OUTER, LEFT_MOUTH_CORNER, RIGHT_MOUTH_CORNER];
        let unique: std::collections::HashSet<_> = indices.iter().collect();
        assert_eq!(unique.len(), indices.len());
    }
}
