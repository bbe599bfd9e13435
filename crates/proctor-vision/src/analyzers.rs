//! Stateless geometric analyzers that turn raw detector output into scalars.

use opencv::calib3d;
use opencv::core::{Mat, Point2f, Point3f, Vector};
use proctor_models::Point2D;

use crate::detection::face_mesh::{
    CHIN, LEFT_EYE_CORNERS, LEFT_EYE_OUTER, LEFT_EYE_VERTICAL, LEFT_IRIS_CENTER,
    LEFT_MOUTH_CORNER, NOSE_TIP, RIGHT_EYE_CORNERS, RIGHT_EYE_OUTER, RIGHT_EYE_VERTICAL,
    RIGHT_IRIS_CENTER, RIGHT_MOUTH_CORNER,
};
use crate::detection::pose_detector::{PoseResult, LEFT_SHOULDER, LEFT_WRIST, NOSE, RIGHT_SHOULDER, RIGHT_WRIST};

const DEGENERATE_WIDTH: f64 = 1e-6;

/// (horizontal, vertical) gaze offset, each in roughly [-100, 100].
/// Positive horizontal means looking right; positive vertical means looking down.
pub fn gaze_offset(landmarks: &[Point2D]) -> (f64, f64) {
    let left = eye_gaze(landmarks, LEFT_EYE_CORNERS, LEFT_IRIS_CENTER);
    let right = eye_gaze(landmarks, RIGHT_EYE_CORNERS, RIGHT_IRIS_CENTER);

    match (left, right) {
        (Some(l), Some(r)) => ((l.0 + r.0) / 2.0, (l.1 + r.1) / 2.0),
        (Some(v), None) | (None, Some(v)) => v,
        (None, None) => (0.0, 0.0),
    }
}

fn eye_gaze(landmarks: &[Point2D], corners: (usize, usize), iris_center: usize) -> Option<(f64, f64)> {
    let outer = landmarks.get(corners.0)?;
    let inner = landmarks.get(corners.1)?;
    let iris = landmarks.get(iris_center)?;

    let eye_center = outer.midpoint(inner);
    let eye_width = outer.distance(inner);
    if eye_width < DEGENERATE_WIDTH {
        return Some((0.0, 0.0));
    }

    let h = (iris.x - eye_center.x) / eye_width * 100.0;
    let v = (iris.y - eye_center.y) / eye_width * 100.0;
    Some((h, v))
}

/// Eye aspect ratio, averaged across both eyes. Low values indicate closed eyes.
pub fn eye_aspect_ratio(landmarks: &[Point2D]) -> f64 {
    let left = single_eye_ear(landmarks, LEFT_EYE_VERTICAL, LEFT_EYE_CORNERS);
    let right = single_eye_ear(landmarks, RIGHT_EYE_VERTICAL, RIGHT_EYE_CORNERS);

    match (left, right) {
        (Some(l), Some(r)) => (l + r) / 2.0,
        (Some(v), None) | (None, Some(v)) => v,
        (None, None) => 0.0,
    }
}

fn single_eye_ear(landmarks: &[Point2D], vertical: [(usize, usize); 2], horizontal: (usize, usize)) -> Option<f64> {
    let v1 = landmarks.get(vertical[0].0)?.distance(landmarks.get(vertical[0].1)?);
    let v2 = landmarks.get(vertical[1].0)?.distance(landmarks.get(vertical[1].1)?);
    let h = landmarks.get(horizontal.0)?.distance(landmarks.get(horizontal.1)?);

    if h < DEGENERATE_WIDTH {
        return Some(0.0);
    }
    Some((v1 + v2) / (2.0 * h))
}

/// Head pose (pitch, yaw, roll) in degrees, solved via PnP against a fixed
/// 6-point 3D face model. Returns (0, 0, 0) on any solver failure.
pub fn head_pose(landmarks: &[Point2D], frame_width: f64, frame_height: f64) -> (f64, f64, f64) {
    solve_head_pose(landmarks, frame_width, frame_height).unwrap_or((0.0, 0.0, 0.0))
}

fn solve_head_pose(landmarks: &[Point2D], frame_width: f64, frame_height: f64) -> Option<(f64, f64, f64)> {
    let indices = [NOSE_TIP, CHIN, LEFT_EYE_OUTER, RIGHT_EYE_OUTER, LEFT_MOUTH_CORNER, RIGHT_MOUTH_CORNER];
    let points: Vec<&Point2D> = indices.iter().map(|&i| landmarks.get(i)).collect::<Option<Vec<_>>>()?;

    let mut image_points = Vector::<Point2f>::new();
    for p in &points {
        image_points.push(Point2f::new(p.x as f32, p.y as f32));
    }

    // Canonical 3D face model, in an arbitrary millimeter-scale coordinate frame.
    let mut model_points = Vector::<Point3f>::new();
    model_points.push(Point3f::new(0.0, 0.0, 0.0)); // nose tip
    model_points.push(Point3f::new(0.0, -330.0, -65.0)); // chin
    model_points.push(Point3f::new(-225.0, 170.0, -135.0)); // left eye outer
    model_points.push(Point3f::new(225.0, 170.0, -135.0)); // right eye outer
    model_points.push(Point3f::new(-150.0, -150.0, -125.0)); // left mouth corner
    model_points.push(Point3f::new(150.0, -150.0, -125.0)); // right mouth corner

    let focal_length = frame_width;
    let center = (frame_width / 2.0, frame_height / 2.0);
    let camera_matrix = Mat::from_slice_2d(&[
        [focal_length, 0.0, center.0],
        [0.0, focal_length, center.1],
        [0.0, 0.0, 1.0],
    ])
    .ok()?;

    let dist_coeffs = Mat::zeros(4, 1, opencv::core::CV_64F).ok()?.to_mat().ok()?;

    let mut rotation_vec = Mat::default();
    let mut translation_vec = Mat::default();

    let ok = calib3d::solve_pnp(
        &model_points,
        &image_points,
        &camera_matrix,
        &dist_coeffs,
        &mut rotation_vec,
        &mut translation_vec,
        false,
        calib3d::SOLVEPNP_ITERATIVE,
    )
    .ok()?;

    if !ok {
        return None;
    }

    let mut rotation_matrix = Mat::default();
    calib3d::rodrigues(&rotation_vec, &mut rotation_matrix, &mut Mat::default()).ok()?;

    euler_angles_from_rotation_matrix(&rotation_matrix)
}

fn euler_angles_from_rotation_matrix(r: &Mat) -> Option<(f64, f64, f64)> {
    let get = |row: i32, col: i32| -> Option<f64> { r.at_2d::<f64>(row, col).ok().copied() };

    let r00 = get(0, 0)?;
    let r10 = get(1, 0)?;
    let r20 = get(2, 0)?;
    let r21 = get(2, 1)?;
    let r22 = get(2, 2)?;

    let sy = (r00 * r00 + r10 * r10).sqrt();
    let singular = sy < 1e-6;

    let (pitch, yaw, roll) = if !singular {
        let x = r21.atan2(r22);
        let y = (-r20).atan2(sy);
        let z = r10.atan2(r00);
        (x, y, z)
    } else {
        let x = (-get(1, 2)?).atan2(get(1, 1)?);
        let y = (-r20).atan2(sy);
        let z = 0.0;
        (x, y, z)
    };

    Some((pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees()))
}

/// Normalized nose-to-wrist distance for each hand, ignoring wrists below the
/// visibility threshold.
pub fn hand_face_distance(pose: &PoseResult) -> (f64, f64) {
    let nose = pose.joint(NOSE);
    let left = match (nose, pose.joint(LEFT_WRIST)) {
        (Some(n), Some(w)) => ((n.x - w.x).powi(2) + (n.y - w.y).powi(2)).sqrt(),
        _ => f64::MAX,
    };
    let right = match (nose, pose.joint(RIGHT_WRIST)) {
        (Some(n), Some(w)) => ((n.x - w.x).powi(2) + (n.y - w.y).powi(2)).sqrt(),
        _ => f64::MAX,
    };
    (left, right)
}

/// Nose-y minus mean-shoulder-y, in normalized coordinates. Positive means
/// the nose sits below the shoulder line (looking down).
pub fn nose_shoulder_diff(pose: &PoseResult) -> f64 {
    let nose = match pose.joint(NOSE) {
        Some(n) => n,
        None => return 0.0,
    };

    match (pose.joint(LEFT_SHOULDER), pose.joint(RIGHT_SHOULDER)) {
        (Some(l), Some(r)) => nose.y - (l.y + r.y) / 2.0,
        (Some(s), None) | (None, Some(s)) => nose.y - s.y,
        (None, None) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmarks_with(overrides: &[(usize, Point2D)]) -> Vec<Point2D> {
        let mut v = vec![Point2D::new(0.0, 0.0); 478];
        for (i, p) in overrides {
            v[*i] = *p;
        }
        v
    }

    #[test]
    fn test_gaze_offset_centered_iris_is_zero() {
        let landmarks = landmarks_with(&[
            (LEFT_EYE_CORNERS.0, Point2D::new(0.0, 0.0)),
            (LEFT_EYE_CORNERS.1, Point2D::new(10.0, 0.0)),
            (LEFT_IRIS_CENTER, Point2D::new(5.0, 0.0)),
            (RIGHT_EYE_CORNERS.0, Point2D::new(0.0, 0.0)),
            (RIGHT_EYE_CORNERS.1, Point2D::new(10.0, 0.0)),
            (RIGHT_IRIS_CENTER, Point2D::new(5.0, 0.0)),
        ]);
        let (h, v) = gaze_offset(&landmarks);
        assert!(h.abs() < 1e-9);
        assert!(v.abs() < 1e-9);
    }

    #[test]
    fn test_gaze_offset_shifted_iris_is_positive_when_looking_right() {
        let landmarks = landmarks_with(&[
            (LEFT_EYE_CORNERS.0, Point2D::new(0.0, 0.0)),
            (LEFT_EYE_CORNERS.1, Point2D::new(10.0, 0.0)),
            (LEFT_IRIS_CENTER, Point2D::new(8.0, 0.0)),
            (RIGHT_EYE_CORNERS.0, Point2D::new(0.0, 0.0)),
            (RIGHT_EYE_CORNERS.1, Point2D::new(10.0, 0.0)),
            (RIGHT_IRIS_CENTER, Point2D::new(8.0, 0.0)),
        ]);
        let (h, _) = gaze_offset(&landmarks);
        assert!(h > 0.0);
    }

    #[test]
    fn test_ear_degenerate_width_is_zero() {
        let landmarks = landmarks_with(&[]);
        assert_eq!(eye_aspect_ratio(&landmarks), 0.0);
    }

    #[test]
    fn test_head_pose_with_missing_landmarks_returns_zero() {
        let landmarks = vec![Point2D::new(0.0, 0.0); 10]; // too short to cover CHIN=152
        assert_eq!(head_pose(&landmarks, 640.0, 480.0), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_nose_shoulder_diff_with_no_pose_is_zero() {
        let joints = [crate::detection::pose_detector::Joint { x: 0.0, y: 0.0, visibility: 0.0 }; 33];
        let pose = PoseResult { joints };
        assert_eq!(nose_shoulder_diff(&pose), 0.0);
    }
}
