//! Whole-body pose estimation, lightest model tier, tracking-across-frames enabled.
//!
//! Structured the same way as `face_mesh.rs`: a `Mutex`-guarded ONNX
//! session, a fixed square input size, and normalized-to-pixel landmark
//! mapping. The output is a fixed 33-joint skeleton (BlazePose topology).

use std::sync::Mutex;

use opencv::core::Mat;
use opencv::imgproc;
use opencv::prelude::*;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};

use crate::error::{VisionError, VisionResult};

const MODEL_PATH: &str = "models/pose_landmark_lite.onnx";
const INPUT_SIZE: i32 = 256;
pub const NUM_JOINTS: usize = 33;

pub const NOSE: usize = 0;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;

pub const VISIBILITY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct Joint {
    pub x: f64,
    pub y: f64,
    pub visibility: f64,
}

#[derive(Debug, Clone)]
pub struct PoseResult {
    pub joints: [Joint; NUM_JOINTS],
}

impl PoseResult {
    pub fn joint(&self, index: usize) -> Option<Joint> {
        self.joints.get(index).copied().filter(|j| j.visibility >= VISIBILITY_THRESHOLD)
    }
}

pub struct PoseDetector {
    session: Mutex<Session>,
}

impl PoseDetector {
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
            .map_err(|e| VisionError::model_load_failed(format!("pose model load failed: {e}")))?;

        Ok(Self { session: Mutex::new(session) })
    }

    /// Run inference on the full (downscaled) analysis frame and return
    /// joints in that frame's normalized coordinates (0.0-1.0), as the
    /// geometric analyzers expect for nose/shoulder/wrist comparisons.
    pub fn detect(&self, frame_bgr: &Mat) -> VisionResult<PoseResult> {
        let size = frame_bgr.size().map_err(|e| VisionError::internal(e.to_string()))?;

        let mut resized = Mat::default();
        imgproc::resize(
            frame_bgr,
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
            .map_err(|_| VisionError::internal("pose detector session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| VisionError::inference_failed(format!("pose inference failed: {e}")))?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference_failed(format!("extract tensor failed: {e}")))?;

        Ok(PoseResult { joints: parse_joints(&raw, size.width, size.height) })
    }
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
                chw.push(pixel[c] as f32 / 255.0);
            }
        }
    }

    Tensor::from_array((vec![1usize, 3, h, w], chw.into_boxed_slice()))
        .map(Value::from)
        .map_err(|e| VisionError::inference_failed(format!("failed to build tensor: {e}")))
}

fn parse_joints(raw: &[f32], _orig_width: i32, _orig_height: i32) -> [Joint; NUM_JOINTS] {
    let mut joints = [Joint { x: 0.0, y: 0.0, visibility: 0.0 }; NUM_JOINTS];
    for (i, chunk) in raw.chunks_exact(4).take(NUM_JOINTS).enumerate() {
        joints[i] = Joint {
            x: chunk[0] as f64,
            y: chunk[1] as f64,
            visibility: chunk[3] as f64,
        };
    }
    joints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_below_visibility_threshold_is_ignored() {
        let mut joints = [Joint { x: 0.5, y: 0.5, visibility: 0.0 }; NUM_JOINTS];
        joints[NOSE] = Joint { x: 0.5, y: 0.3, visibility: 0.9 };
        joints[LEFT_WRIST] = Joint { x: 0.2, y: 0.6, visibility: 0.2 };
        let result = PoseResult { joints };

        assert!(result.joint(NOSE).is_some());
        assert!(result.joint(LEFT_WRIST).is_none());
    }

    #[test]
    fn test_parse_joints_reads_visibility_as_fourth_field() {
        let mut raw = vec![0.0f32; NUM_JOINTS * 4];
        raw[0] = 0.4;
        raw[1] = 0.3;
        raw[2] = 0.0;
        raw[3] = 0.95;
        let joints = parse_joints(&raw, 100, 100);
        assert!((joints[0].x - 0.4).abs() < 1e-6);
        assert!((joints[0].visibility - 0.95).abs() < 1e-6);
    }
}
