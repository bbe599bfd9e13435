//! Frame overlay rendering and JPEG encoding.
//!
//! Grounded on the teacher's `face_mesh.rs` debug-render path
//! (`opencv::imgproc::rectangle`/`circle`/`put_text`), generalized from a
//! debug-only aid into the primary visualization output.

use base64::Engine;
use opencv::core::{Mat, Point, Scalar, Vector};
use opencv::imgcodecs;
use opencv::imgproc;
use proctor_models::{BoundingBox, Point2D};

use crate::detection::object_detector::DetectedObject;
use crate::detection::pose_detector::PoseResult;
use crate::error::{VisionError, VisionResult};

const JPEG_QUALITY: i32 = 85;

const COLOR_GREEN: Scalar = Scalar::new(0.0, 200.0, 0.0, 0.0);
const COLOR_RED: Scalar = Scalar::new(0.0, 0.0, 220.0, 0.0);
const COLOR_YELLOW: Scalar = Scalar::new(0.0, 220.0, 220.0, 0.0);
const COLOR_WHITE: Scalar = Scalar::new(255.0, 255.0, 255.0, 0.0);
const COLOR_BLUE: Scalar = Scalar::new(220.0, 120.0, 0.0, 0.0);

/// Everything the renderer needs to draw one frame's overlay.
pub struct OverlayInputs<'a> {
    pub face_boxes: &'a [BoundingBox],
    pub iris_points: &'a [Point2D],
    pub pose: Option<&'a PoseResult>,
    pub devices: &'a [DetectedObject],
    pub alert_string: &'a str,
    pub behavior_status: &'a str,
    pub fps: f64,
}

/// Draw all overlays on `frame_bgr` in place, then JPEG-encode and base64-armor it.
pub fn render(frame_bgr: &mut Mat, inputs: &OverlayInputs) -> VisionResult<String> {
    draw_faces(frame_bgr, inputs.face_boxes)?;
    draw_iris_points(frame_bgr, inputs.iris_points)?;
    if let Some(pose) = inputs.pose {
        draw_pose_skeleton(frame_bgr, pose)?;
    }
    draw_devices(frame_bgr, inputs.devices)?;
    draw_status_banner(frame_bgr, inputs.alert_string, inputs.behavior_status)?;
    draw_fps(frame_bgr, inputs.fps)?;

    encode_jpeg_base64(frame_bgr)
}

fn draw_faces(frame: &mut Mat, boxes: &[BoundingBox]) -> VisionResult<()> {
    let color = if boxes.len() == 1 { COLOR_GREEN } else { COLOR_RED };
    for b in boxes {
        imgproc::rectangle(
            frame,
            opencv::core::Rect::new(b.x as i32, b.y as i32, b.width as i32, b.height as i32),
            color,
            2,
            imgproc::LINE_8,
            0,
        )
        .map_err(|e| VisionError::internal(format!("draw face box failed: {e}")))?;
    }
    Ok(())
}

fn draw_iris_points(frame: &mut Mat, points: &[Point2D]) -> VisionResult<()> {
    for p in points {
        imgproc::circle(
            frame,
            Point::new(p.x as i32, p.y as i32),
            2,
            COLOR_YELLOW,
            -1,
            imgproc::LINE_8,
            0,
        )
        .map_err(|e| VisionError::internal(format!("draw iris dot failed: {e}")))?;
    }
    Ok(())
}

const SKELETON_EDGES: &[(usize, usize)] = &[(11, 12), (11, 13), (13, 15), (12, 14), (14, 16), (11, 23), (12, 24), (23, 24)];

fn draw_pose_skeleton(frame: &mut Mat, pose: &PoseResult) -> VisionResult<()> {
    let (w, h) = frame_dims(frame)?;
    for &(a, b) in SKELETON_EDGES {
        if let (Some(ja), Some(jb)) = (pose.joint(a), pose.joint(b)) {
            imgproc::line(
                frame,
                Point::new((ja.x * w) as i32, (ja.y * h) as i32),
                Point::new((jb.x * w) as i32, (jb.y * h) as i32),
                COLOR_BLUE,
                2,
                imgproc::LINE_8,
                0,
            )
            .map_err(|e| VisionError::internal(format!("draw skeleton edge failed: {e}")))?;
        }
    }
    Ok(())
}

fn draw_devices(frame: &mut Mat, devices: &[DetectedObject]) -> VisionResult<()> {
    for d in devices {
        let b = &d.bbox;
        imgproc::rectangle(
            frame,
            opencv::core::Rect::new(b.x as i32, b.y as i32, b.width as i32, b.height as i32),
            COLOR_YELLOW,
            2,
            imgproc::LINE_8,
            0,
        )
        .map_err(|e| VisionError::internal(format!("draw device box failed: {e}")))?;

        let label = format!("{} {:.0}%", d.class.as_str(), d.confidence * 100.0);
        put_text(frame, &label, Point::new(b.x as i32, (b.y - 5.0).max(0.0) as i32), COLOR_YELLOW)?;
    }
    Ok(())
}

fn draw_status_banner(frame: &mut Mat, alert_string: &str, behavior_status: &str) -> VisionResult<()> {
    let (w, _) = frame_dims(frame)?;
    let color = if alert_string == "none" { COLOR_GREEN } else { COLOR_RED };

    imgproc::rectangle(
        frame,
        opencv::core::Rect::new(0, 0, w as i32, 30),
        color,
        -1,
        imgproc::LINE_8,
        0,
    )
    .map_err(|e| VisionError::internal(format!("draw banner failed: {e}")))?;

    let label = format!("{alert_string} | {behavior_status}");
    put_text(frame, &label, Point::new(8, 20), COLOR_WHITE)
}

fn draw_fps(frame: &mut Mat, fps: f64) -> VisionResult<()> {
    let (w, h) = frame_dims(frame)?;
    let label = format!("{fps:.1} fps");
    put_text(frame, &label, Point::new((w - 100.0).max(0.0) as i32, (h - 10.0).max(0.0) as i32), COLOR_WHITE)
}

fn put_text(frame: &mut Mat, text: &str, origin: Point, color: Scalar) -> VisionResult<()> {
    imgproc::put_text(
        frame,
        text,
        origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.5,
        color,
        1,
        imgproc::LINE_8,
        false,
    )
    .map_err(|e| VisionError::internal(format!("draw text failed: {e}")))
}

fn frame_dims(frame: &Mat) -> VisionResult<(f64, f64)> {
    let size = frame.size().map_err(|e| VisionError::internal(e.to_string()))?;
    Ok((size.width as f64, size.height as f64))
}

fn encode_jpeg_base64(frame: &Mat) -> VisionResult<String> {
    let mut buf = Vector::<u8>::new();
    let params = Vector::<i32>::from_slice(&[imgcodecs::IMWRITE_JPEG_QUALITY, JPEG_QUALITY]);
    imgcodecs::imencode(".jpg", frame, &mut buf, &params)
        .map_err(|e| VisionError::internal(format!("jpeg encode failed: {e}")))?;

    Ok(base64::engine::general_purpose::STANDARD.encode(buf.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_edges_reference_valid_joint_indices() {
        for &(a, b) in SKELETON_EDGES {
            assert!(a < 33);
            assert!(b < 33);
        }
    }
}
