//! The outbound per-frame verdict, matching the transport wire contract exactly.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::alert::{AlertKind, BehaviorStatus, DeviceClass};

/// The `details` record nested inside a `Verdict`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Details {
    pub num_faces: u32,
    pub gaze_horizontal: f64,
    pub gaze_vertical: f64,
    pub ear: f64,
    pub head_pitch: f64,
    pub head_yaw: f64,
    pub head_roll: f64,
    pub hand_face_distance_left: f64,
    pub hand_face_distance_right: f64,
    pub nose_shoulder_diff: f64,
    pub processing_time_ms: f64,
    pub fps: f64,
    pub avg_fps: f64,
    pub frame_count: u64,
    pub yolo_cached: bool,
    pub skipped: bool,
}

/// The JSON message sent back to the client for every inbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Verdict {
    pub alert: String,
    pub conf: f64,
    pub viz: String,
    pub behavior_status: String,
    pub devices_detected: Vec<String>,
    pub details: Details,
    pub timestamp: f64,
}

impl Verdict {
    /// Join active alert kinds into the `"none"` / `"<kind>"` / `"<kind> AND <kind>"` string.
    pub fn format_alert_string(kinds: &[AlertKind]) -> String {
        if kinds.is_empty() {
            return "none".to_string();
        }
        kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    pub fn devices_to_strings(devices: &[DeviceClass]) -> Vec<String> {
        devices.iter().map(|d| d.as_str().to_string()).collect()
    }

    /// A synthetic verdict for a skipped frame: no detectors ran, neutral signals.
    pub fn skipped(
        behavior_status: BehaviorStatus,
        frame_count: u64,
        fps: f64,
        avg_fps: f64,
        timestamp: f64,
    ) -> Self {
        Self {
            alert: "none".to_string(),
            conf: 1.0,
            viz: String::new(),
            behavior_status: behavior_status.to_string(),
            devices_detected: Vec::new(),
            details: Details {
                num_faces: 0,
                gaze_horizontal: 0.0,
                gaze_vertical: 0.0,
                ear: 0.0,
                head_pitch: 0.0,
                head_yaw: 0.0,
                head_roll: 0.0,
                hand_face_distance_left: 0.0,
                hand_face_distance_right: 0.0,
                nose_shoulder_diff: 0.0,
                processing_time_ms: 0.0,
                fps,
                avg_fps,
                frame_count,
                yolo_cached: false,
                skipped: true,
            },
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_alert_string_empty() {
        assert_eq!(Verdict::format_alert_string(&[]), "none");
    }

    #[test]
    fn test_format_alert_string_joins_with_and() {
        let kinds = vec![AlertKind::MultipleFaces, AlertKind::HandNearFace];
        assert_eq!(
            Verdict::format_alert_string(&kinds),
            "multiple_faces AND hand_near_face"
        );
    }

    #[test]
    fn test_skipped_verdict_marks_skipped_and_empty_viz() {
        let v = Verdict::skipped(BehaviorStatus::FocusedOnScreen, 42, 30.0, 29.5, 1_700_000_000.0);
        assert!(v.details.skipped);
        assert_eq!(v.viz, "");
        assert_eq!(v.alert, "none");
        assert_eq!(v.details.frame_count, 42);
    }
}
