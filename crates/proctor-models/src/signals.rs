//! Derived per-frame scalars produced by the geometric analyzers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Scalars derived from one frame's detector outputs.
///
/// Every field defaults to a neutral value (0.0, or `face_count = 0`) when the
/// detector that would feed it is unavailable or returned no detections, so a
/// `Signals` can always be built even on a degraded frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Signals {
    pub face_count: u32,
    pub gaze_h: f64,
    pub gaze_v: f64,
    pub ear: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub hand_face_distance_left: f64,
    pub hand_face_distance_right: f64,
    pub nose_shoulder_diff: f64,
}

impl Signals {
    /// The baseline signals used for a skipped frame and as the starting
    /// point before any detector has run.
    pub fn neutral() -> Self {
        Self {
            face_count: 0,
            gaze_h: 0.0,
            gaze_v: 0.0,
            ear: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            roll: 0.0,
            hand_face_distance_left: 0.0,
            hand_face_distance_right: 0.0,
            nose_shoulder_diff: 0.0,
        }
    }
}

impl Default for Signals {
    fn default() -> Self {
        Self::neutral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_signals_have_zero_face_count() {
        let s = Signals::neutral();
        assert_eq!(s.face_count, 0);
        assert_eq!(s.gaze_h, 0.0);
        assert_eq!(s.ear, 0.0);
    }
}
