//! Alert and behavior-status classification.
//!
//! Immediate-fire kinds (multi-face, devices, hand-near-face) are high
//! precision events where a single strong detection is actionable. Noisy
//! signals (gaze, looking-down, no-face) must survive a short temporal
//! window, so every candidate is first recorded into the session's alert
//! history and only promoted to "active" once its window condition holds.

use std::time::Duration;

use proctor_models::{AlertKind, BehaviorStatus, DeviceClass, Signals};

use crate::detection::object_detector::DetectedObject;
use crate::session::SessionBuffer;

const MULTIPLE_FACES_CONF_FLOOR: f64 = 0.95;
const NO_FACE_CONF: f64 = 0.90;
const GAZE_OFF_SCREEN_CONF: f64 = 0.85;
const HAND_NEAR_FACE_CONF: f64 = 0.60;
const LOOKING_DOWN_CONF: f64 = 0.55;

const GAZE_THRESHOLD: f64 = 15.0;
const LOOKING_DOWN_THRESHOLD: f64 = 0.20;
const HAND_FACE_THRESHOLD: f64 = 0.08;

const EAR_CLOSED_THRESHOLD: f64 = 0.15;
const GAZE_EXTREME_THRESHOLD: f64 = 35.0;
const GAZE_SLIGHT_THRESHOLD: f64 = 20.0;

/// One active alert with its confidence.
pub type ActiveAlert = (AlertKind, f64);

/// Classify the current frame's signals into the set of currently active alerts.
///
/// `top_face_score` is the highest per-face detector score this frame (0 if
/// no faces). `devices` is the current-or-cached object-detector output.
pub fn classify_alerts(
    signals: &Signals,
    top_face_score: f64,
    devices: &[DetectedObject],
    buffer: &mut SessionBuffer,
) -> Vec<ActiveAlert> {
    let mut active = Vec::new();

    if signals.face_count > 1 {
        buffer.add_alert(AlertKind::MultipleFaces);
        active.push((AlertKind::MultipleFaces, top_face_score.max(MULTIPLE_FACES_CONF_FLOOR)));
    }

    if signals.face_count == 0 {
        buffer.add_alert(AlertKind::NoFaceDetected);
        if buffer.should_trigger(AlertKind::NoFaceDetected, 2, Duration::from_secs(1)) {
            active.push((AlertKind::NoFaceDetected, NO_FACE_CONF));
        }
    }

    if signals.gaze_h.abs() > GAZE_THRESHOLD || signals.gaze_v.abs() > GAZE_THRESHOLD {
        buffer.add_alert(AlertKind::GazeOffScreen);
        if buffer.should_trigger(AlertKind::GazeOffScreen, 3, Duration::from_secs(1)) {
            active.push((AlertKind::GazeOffScreen, GAZE_OFF_SCREEN_CONF));
        }
    }

    if signals.hand_face_distance_left < HAND_FACE_THRESHOLD
        || signals.hand_face_distance_right < HAND_FACE_THRESHOLD
    {
        buffer.add_alert(AlertKind::HandNearFace);
        active.push((AlertKind::HandNearFace, HAND_NEAR_FACE_CONF));
    }

    if signals.nose_shoulder_diff > LOOKING_DOWN_THRESHOLD {
        buffer.add_alert(AlertKind::LookingDown);
        if buffer.should_trigger(AlertKind::LookingDown, 3, Duration::from_millis(1500)) {
            active.push((AlertKind::LookingDown, LOOKING_DOWN_CONF));
        }
    }

    for (kind, conf) in device_alerts(devices) {
        buffer.add_alert(kind);
        active.push((kind, conf));
    }

    dedup_keep_max_conf(active)
}

fn device_alerts(devices: &[DetectedObject]) -> Vec<ActiveAlert> {
    let mut best: Vec<ActiveAlert> = Vec::new();
    for device in devices {
        if let Some(kind) = device.class.alert_kind() {
            match best.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, conf)) if *conf < device.confidence => *conf = device.confidence,
                Some(_) => {}
                None => best.push((kind, device.confidence)),
            }
        }
    }
    best
}

fn dedup_keep_max_conf(alerts: Vec<ActiveAlert>) -> Vec<ActiveAlert> {
    let mut out: Vec<ActiveAlert> = Vec::new();
    for (kind, conf) in alerts {
        match out.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, existing)) if *existing < conf => *existing = conf,
            Some(_) => {}
            None => out.push((kind, conf)),
        }
    }
    out
}

/// Overall confidence for a verdict: the max among active alerts, or 1.0 if none.
pub fn overall_confidence(active: &[ActiveAlert]) -> f64 {
    if active.is_empty() {
        return 1.0;
    }
    active.iter().map(|(_, c)| *c).fold(0.0_f64, f64::max)
}

/// Select the single behavior-status string by strict priority.
pub fn classify_behavior(signals: &Signals) -> BehaviorStatus {
    if signals.face_count == 0 {
        return BehaviorStatus::NoPersonDetected;
    }
    if signals.face_count > 1 {
        return BehaviorStatus::MultiplePeopleDetected;
    }
    if signals.ear < EAR_CLOSED_THRESHOLD {
        return BehaviorStatus::EyesClosedOrBlinking;
    }

    let (gaze_h, gaze_v) = (signals.gaze_h, signals.gaze_v);
    if gaze_h.abs() > GAZE_EXTREME_THRESHOLD || gaze_v.abs() > GAZE_EXTREME_THRESHOLD {
        return if gaze_h.abs() >= gaze_v.abs() {
            if gaze_h > 0.0 { BehaviorStatus::LookingRight } else { BehaviorStatus::LookingLeft }
        } else if gaze_v > 0.0 {
            BehaviorStatus::LookingDownExtreme
        } else {
            BehaviorStatus::LookingUp
        };
    }

    if signals.nose_shoulder_diff > LOOKING_DOWN_THRESHOLD {
        return BehaviorStatus::LookingDownSignificantly;
    }

    if gaze_h.abs() > GAZE_SLIGHT_THRESHOLD || gaze_v.abs() > GAZE_SLIGHT_THRESHOLD {
        return BehaviorStatus::SlightGazeDeviation;
    }

    BehaviorStatus::FocusedOnScreen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral_with(f: impl FnOnce(&mut Signals)) -> Signals {
        let mut s = Signals::neutral();
        f(&mut s);
        s
    }

    #[test]
    fn test_no_faces_gives_no_person_status() {
        let signals = Signals::neutral();
        assert_eq!(classify_behavior(&signals), BehaviorStatus::NoPersonDetected);
    }

    #[test]
    fn test_focused_when_everything_neutral_with_one_face() {
        let signals = neutral_with(|s| {
            s.face_count = 1;
            s.ear = 0.3;
        });
        assert_eq!(classify_behavior(&signals), BehaviorStatus::FocusedOnScreen);
    }

    #[test]
    fn test_multiple_faces_alert_has_confidence_floor() {
        let mut buf = SessionBuffer::new();
        let signals = neutral_with(|s| s.face_count = 2);
        let active = classify_alerts(&signals, 0.5, &[], &mut buf);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].0, AlertKind::MultipleFaces);
        assert!((active[0].1 - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_no_face_requires_two_consecutive_frames() {
        let mut buf = SessionBuffer::new();
        let signals = Signals::neutral();
        let first = classify_alerts(&signals, 0.0, &[], &mut buf);
        assert!(first.is_empty());
        let second = classify_alerts(&signals, 0.0, &[], &mut buf);
        assert_eq!(second[0].0, AlertKind::NoFaceDetected);
    }

    #[test]
    fn test_gaze_off_screen_requires_three_frames() {
        let mut buf = SessionBuffer::new();
        let signals = neutral_with(|s| {
            s.face_count = 1;
            s.gaze_h = 25.0;
        });
        assert!(classify_alerts(&signals, 0.9, &[], &mut buf).is_empty());
        assert!(classify_alerts(&signals, 0.9, &[], &mut buf).is_empty());
        let third = classify_alerts(&signals, 0.9, &[], &mut buf);
        assert!(third.iter().any(|(k, _)| *k == AlertKind::GazeOffScreen));
    }
}
