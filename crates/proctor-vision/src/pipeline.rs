//! The per-frame orchestrator: ties detector adapters, analyzers, the
//! classifier and the renderer into one `process` call.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use opencv::core::{Mat, Rect};
use opencv::imgproc;
use opencv::prelude::*;
use proctor_models::{BoundingBox, Point2D, Signals, Verdict};
use tracing::warn;

use crate::analyzers;
use crate::classifier;
use crate::detection::face_mesh::{LEFT_IRIS_CENTER, RIGHT_IRIS_CENTER};
use crate::detection::object_detector::DetectedObject;
use crate::error::VisionResult;
use crate::registry::ModelRegistry;
use crate::renderer::{self, OverlayInputs};
use crate::session::{CachedDetections, SessionBuffer};

const SKIP_STRIDE: u64 = 3;
const OBJECT_DETECTOR_STRIDE: u64 = 10;
const DOWNSCALE_WIDTH: i32 = 320;

pub struct Pipeline {
    registry: Arc<ModelRegistry>,
}

impl Pipeline {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Process one inbound frame for a session. This is synchronous and
    /// CPU-bound; callers run it inside `spawn_blocking`.
    pub fn process(&self, frame_bgr: Mat, buffer: &mut SessionBuffer, force: bool) -> VisionResult<Verdict> {
        let start = std::time::Instant::now();

        buffer.clear_old_alerts();
        buffer.increment_frame_count();
        let frame_count = buffer.frame_count;

        if !force && frame_count % SKIP_STRIDE != 0 && buffer.alert_ring_is_empty() {
            let fps = buffer.update_fps();
            let avg_fps = buffer.avg_fps();
            return Ok(Verdict::skipped(
                classifier::classify_behavior(&Signals::neutral()),
                frame_count,
                fps,
                avg_fps,
                unix_timestamp(),
            ));
        }

        let (downscaled, scale_x, scale_y) = downscale(&frame_bgr)?;

        let faces = self
            .registry
            .face_detector()
            .map(|d| d.detect(&downscaled))
            .transpose()?
            .unwrap_or_default();

        let top_face_score = faces.first().map(|f| f.score).unwrap_or(0.0);
        let face_count = faces.len() as u32;

        let landmarks = if let (Some(mesh), Some(primary)) = (self.registry.face_mesh(), faces.first()) {
            let roi = bbox_to_rect(&primary.bbox);
            mesh.detect(&downscaled, &roi)
                .map(|r| scale_points(&r.landmarks, scale_x, scale_y))
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let pose = self.registry.pose_detector().and_then(|d| d.detect(&downscaled).ok());

        let orig_size = frame_bgr.size().map_err(|e| crate::error::VisionError::internal(e.to_string()))?;
        let devices = self.run_object_detector(&frame_bgr, buffer, frame_count)?;
        let yolo_cached = !devices.ran_this_frame;

        let signals = derive_signals(
            face_count,
            &landmarks,
            pose.as_ref(),
            orig_size.width as f64,
            orig_size.height as f64,
        );
        buffer.add(signals);

        let active_alerts = classifier::classify_alerts(&signals, top_face_score, &devices.objects, buffer);
        let alert_string = Verdict::format_alert_string(&active_alerts.iter().map(|(k, _)| *k).collect::<Vec<_>>());
        let conf = classifier::overall_confidence(&active_alerts);
        let behavior_status = classifier::classify_behavior(&signals);

        let face_boxes: Vec<BoundingBox> = faces.iter().map(|f| f.bbox.scale(scale_x, scale_y)).collect();
        let iris_points: Vec<Point2D> =
            [LEFT_IRIS_CENTER, RIGHT_IRIS_CENTER].iter().filter_map(|&i| landmarks.get(i).copied()).collect();
        let mut render_frame = frame_bgr;
        let viz = renderer::render(
            &mut render_frame,
            &OverlayInputs {
                face_boxes: &face_boxes,
                iris_points: &iris_points,
                pose: pose.as_ref(),
                devices: &devices.objects,
                alert_string: &alert_string,
                behavior_status: behavior_status.as_str(),
                fps: buffer.avg_fps(),
            },
        )?;

        let fps = buffer.update_fps();
        let avg_fps = buffer.avg_fps();
        let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        Ok(Verdict {
            alert: alert_string,
            conf,
            viz,
            behavior_status: behavior_status.to_string(),
            devices_detected: Verdict::devices_to_strings(
                &devices.objects.iter().map(|d| d.class).collect::<Vec<_>>(),
            ),
            details: proctor_models::Details {
                num_faces: face_count,
                gaze_horizontal: signals.gaze_h,
                gaze_vertical: signals.gaze_v,
                ear: signals.ear,
                head_pitch: signals.pitch,
                head_yaw: signals.yaw,
                head_roll: signals.roll,
                hand_face_distance_left: no_signal_as_zero(signals.hand_face_distance_left),
                hand_face_distance_right: no_signal_as_zero(signals.hand_face_distance_right),
                nose_shoulder_diff: signals.nose_shoulder_diff,
                processing_time_ms,
                fps,
                avg_fps,
                frame_count,
                yolo_cached,
                skipped: false,
            },
            timestamp: unix_timestamp(),
        })
    }

    fn run_object_detector(
        &self,
        frame_bgr: &Mat,
        buffer: &mut SessionBuffer,
        frame_count: u64,
    ) -> VisionResult<ObjectRunResult> {
        if frame_count % OBJECT_DETECTOR_STRIDE == 0 {
            if let Some(detector) = self.registry.object_detector() {
                let size = frame_bgr.size().map_err(|e| crate::error::VisionError::internal(e.to_string()))?;
                let rgb = bgr_to_rgb_bytes(frame_bgr)?;
                match detector.detect(&rgb, size.width as u32, size.height as u32) {
                    Ok(objects) => {
                        buffer.last_heavy_detections =
                            Some(CachedDetections { devices: objects.clone(), frame_index: frame_count });
                        return Ok(ObjectRunResult { objects, ran_this_frame: true });
                    }
                    Err(e) => {
                        warn!(error = %e, "object detector inference failed for this frame");
                    }
                }
            }
        }

        if buffer.has_fresh_cache(OBJECT_DETECTOR_STRIDE) {
            let objects = buffer
                .last_heavy_detections
                .as_ref()
                .map(|c| c.devices.clone())
                .unwrap_or_default();
            return Ok(ObjectRunResult { objects, ran_this_frame: false });
        }

        Ok(ObjectRunResult { objects: Vec::new(), ran_this_frame: false })
    }
}

struct ObjectRunResult {
    objects: Vec<DetectedObject>,
    ran_this_frame: bool,
}

fn downscale(frame_bgr: &Mat) -> VisionResult<(Mat, f64, f64)> {
    let size = frame_bgr.size().map_err(|e| crate::error::VisionError::internal(e.to_string()))?;
    let target_width = DOWNSCALE_WIDTH.min(size.width).max(1);
    let target_height = ((size.height as f64) * (target_width as f64) / (size.width as f64)).round() as i32;
    let target_height = target_height.max(1);

    let mut resized = Mat::default();
    imgproc::resize(
        frame_bgr,
        &mut resized,
        opencv::core::Size::new(target_width, target_height),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )
    .map_err(|e| crate::error::VisionError::internal(format!("downscale failed: {e}")))?;

    let scale_x = size.width as f64 / target_width as f64;
    let scale_y = size.height as f64 / target_height as f64;
    Ok((resized, scale_x, scale_y))
}

fn bbox_to_rect(b: &BoundingBox) -> Rect {
    Rect::new(b.x as i32, b.y as i32, b.width.max(1.0) as i32, b.height.max(1.0) as i32)
}

fn scale_points(points: &[Point2D], scale_x: f64, scale_y: f64) -> Vec<Point2D> {
    points.iter().map(|p| Point2D::new(p.x * scale_x, p.y * scale_y)).collect()
}

fn bgr_to_rgb_bytes(frame_bgr: &Mat) -> VisionResult<Vec<u8>> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(frame_bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
        .map_err(|e| crate::error::VisionError::internal(format!("color convert failed: {e}")))?;
    Ok(rgb.data_bytes().map_err(|e| crate::error::VisionError::internal(e.to_string()))?.to_vec())
}

fn derive_signals(
    face_count: u32,
    landmarks: &[Point2D],
    pose: Option<&crate::detection::pose_detector::PoseResult>,
    frame_width: f64,
    frame_height: f64,
) -> Signals {
    let (gaze_h, gaze_v) = if landmarks.is_empty() { (0.0, 0.0) } else { analyzers::gaze_offset(landmarks) };
    let ear = if landmarks.is_empty() { 0.0 } else { analyzers::eye_aspect_ratio(landmarks) };
    let (pitch, yaw, roll) = if landmarks.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        analyzers::head_pose(landmarks, frame_width, frame_height)
    };

    let (hand_left, hand_right) = pose.map(analyzers::hand_face_distance).unwrap_or((f64::MAX, f64::MAX));
    let nose_shoulder = pose.map(analyzers::nose_shoulder_diff).unwrap_or(0.0);

    Signals {
        face_count,
        gaze_h,
        gaze_v,
        ear,
        pitch,
        yaw,
        roll,
        hand_face_distance_left: hand_left,
        hand_face_distance_right: hand_right,
        nose_shoulder_diff: nose_shoulder,
    }
}

/// `f64::MAX` is the classifier's "no pose signal" sentinel; outside that
/// threshold check it has no meaning and must not reach the wire.
fn no_signal_as_zero(distance: f64) -> f64 {
    if distance == f64::MAX {
        0.0
    } else {
        distance
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_points_applies_independent_axis_factors() {
        let points = vec![Point2D::new(1.0, 2.0)];
        let scaled = scale_points(&points, 2.0, 3.0);
        assert_eq!(scaled[0], Point2D::new(2.0, 6.0));
    }

    #[test]
    fn test_derive_signals_with_no_detections_is_neutral_except_face_count() {
        let signals = derive_signals(0, &[], None, 640.0, 480.0);
        assert_eq!(signals.face_count, 0);
        assert_eq!(signals.gaze_h, 0.0);
        assert_eq!(signals.hand_face_distance_left, f64::MAX);
    }
}
