//! End-to-end classifier/session scenarios, driven directly off `Signals`
//! and `DetectedObject` rather than real detector inference, since no model
//! weights are available in this environment. These exercise the same
//! classification and temporal-smoothing code path `Pipeline::process`
//! drives, just with synthetic inputs in place of real frames.

use proctor_models::{AlertKind, BehaviorStatus, DeviceClass, Signals};
use proctor_vision::classifier::{classify_alerts, classify_behavior};
use proctor_vision::detection::DetectedObject;
use proctor_vision::session::CachedDetections;
use proctor_vision::SessionBuffer;

fn bbox() -> proctor_models::BoundingBox {
    proctor_models::BoundingBox::new(10.0, 10.0, 40.0, 40.0)
}

#[test]
fn clean_single_person_frontal_is_focused_with_no_alert() {
    let mut buf = SessionBuffer::new();
    let signals = Signals { face_count: 1, ear: 0.28, ..Signals::neutral() };

    let active = classify_alerts(&signals, 0.92, &[], &mut buf);
    let status = classify_behavior(&signals);

    assert!(active.is_empty());
    assert_eq!(status, BehaviorStatus::FocusedOnScreen);
    assert!(signals.ear >= 0.2);
}

#[test]
fn two_faces_raises_multiple_faces_with_confidence_floor() {
    let mut buf = SessionBuffer::new();
    let signals = Signals { face_count: 2, ..Signals::neutral() };

    let active = classify_alerts(&signals, 0.5, &[], &mut buf);
    let status = classify_behavior(&signals);

    assert_eq!(active.len(), 1);
    assert_eq!(active[0].0, AlertKind::MultipleFaces);
    assert!(active[0].1 >= 0.95);
    assert_eq!(status, BehaviorStatus::MultiplePeopleDetected);
}

#[test]
fn gaze_sweep_of_five_frames_fires_from_the_third_onward() {
    let mut buf = SessionBuffer::new();
    let signals = Signals { face_count: 1, gaze_h: 25.0, ..Signals::neutral() };

    let mut fired = Vec::new();
    for _ in 0..5 {
        let active = classify_alerts(&signals, 0.9, &[], &mut buf);
        fired.push(active.iter().any(|(k, _)| *k == AlertKind::GazeOffScreen));
    }

    assert_eq!(fired, vec![false, false, true, true, true]);
}

#[test]
fn phone_held_to_ear_fires_hand_near_face_immediately() {
    let mut buf = SessionBuffer::new();
    let signals = Signals {
        face_count: 1,
        hand_face_distance_left: 0.05,
        hand_face_distance_right: f64::MAX,
        ..Signals::neutral()
    };

    let active = classify_alerts(&signals, 0.9, &[], &mut buf);

    assert_eq!(active.len(), 1);
    assert_eq!(active[0].0, AlertKind::HandNearFace);
    assert!((active[0].1 - 0.60).abs() < 1e-9);
}

#[test]
fn device_detection_stride_reuses_cache_between_heavy_runs() {
    let mut buf = SessionBuffer::new();
    let phone = DetectedObject { class: DeviceClass::Phone, bbox: bbox(), confidence: 0.8 };

    // Simulate 30 frames: the object detector only actually runs every 10th
    // frame, everything in between reuses `last_heavy_detections`.
    for frame in 1..=30u64 {
        buf.frame_count = frame;
        let devices: Vec<DetectedObject> = if frame % 10 == 0 {
            buf.last_heavy_detections = Some(CachedDetections {
                devices: vec![phone.clone()],
                frame_index: frame,
            });
            vec![phone.clone()]
        } else if buf.has_fresh_cache(10) {
            buf.last_heavy_detections.as_ref().unwrap().devices.clone()
        } else {
            Vec::new()
        };

        let signals = Signals { face_count: 1, ..Signals::neutral() };
        let active = classify_alerts(&signals, 0.9, &devices, &mut buf);

        if frame < 10 {
            assert!(active.iter().all(|(k, _)| *k != AlertKind::DeviceDetectedPhone));
        } else {
            assert!(active.iter().any(|(k, _)| *k == AlertKind::DeviceDetectedPhone));
        }
    }
}

#[test]
fn reconnecting_session_starts_with_a_fresh_buffer() {
    let mut first = SessionBuffer::new();
    first.add_alert(AlertKind::GazeOffScreen);
    first.add_alert(AlertKind::GazeOffScreen);
    assert!(first.should_trigger(AlertKind::GazeOffScreen, 2, std::time::Duration::from_secs(1)));

    // A reconnect creates a brand new buffer; nothing from `first` is visible.
    let second = SessionBuffer::new();
    assert!(second.alert_ring_is_empty());
    assert_eq!(second.frame_count, 0);
}
