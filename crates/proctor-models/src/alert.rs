//! Alert kinds and behavior-status strings.
//!
//! These are a tagged sum type with an associated confidence; the outbound
//! `"A AND B"` string is a presentation concern, produced at serialization
//! time rather than modeled directly (see `proctor-vision`'s classifier).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An active cheat-signal category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    MultipleFaces,
    NoFaceDetected,
    GazeOffScreen,
    HandNearFace,
    LookingDown,
    DeviceDetectedPhone,
    DeviceDetectedLaptop,
    DeviceDetectedMonitor,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::MultipleFaces => "multiple_faces",
            AlertKind::NoFaceDetected => "no_face_detected",
            AlertKind::GazeOffScreen => "gaze_off_screen",
            AlertKind::HandNearFace => "hand_near_face",
            AlertKind::LookingDown => "looking_down",
            AlertKind::DeviceDetectedPhone => "device_detected_phone",
            AlertKind::DeviceDetectedLaptop => "device_detected_laptop",
            AlertKind::DeviceDetectedMonitor => "device_detected_monitor",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A device class the object detector can surface in `devices_detected`.
///
/// `Keyboard` and `Mouse` are deliberately not attached to any `AlertKind` —
/// the source system surfaces them in the detection list without ever
/// raising an alert for them, and this spec preserves that asymmetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Phone,
    Laptop,
    Monitor,
    Keyboard,
    Mouse,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Phone => "cell phone",
            DeviceClass::Laptop => "laptop",
            DeviceClass::Monitor => "monitor",
            DeviceClass::Keyboard => "keyboard",
            DeviceClass::Mouse => "mouse",
        }
    }

    /// Map a COCO class label to a device class, if it is one this engine cares about.
    pub fn from_coco_label(label: &str) -> Option<Self> {
        match label {
            "cell phone" => Some(DeviceClass::Phone),
            "laptop" => Some(DeviceClass::Laptop),
            "tv" => Some(DeviceClass::Monitor),
            "keyboard" => Some(DeviceClass::Keyboard),
            "mouse" => Some(DeviceClass::Mouse),
            _ => None,
        }
    }

    pub fn alert_kind(&self) -> Option<AlertKind> {
        match self {
            DeviceClass::Phone => Some(AlertKind::DeviceDetectedPhone),
            DeviceClass::Laptop => Some(AlertKind::DeviceDetectedLaptop),
            DeviceClass::Monitor => Some(AlertKind::DeviceDetectedMonitor),
            DeviceClass::Keyboard | DeviceClass::Mouse => None,
        }
    }
}

impl Serialize for BehaviorStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// The single human-readable behavior-status string, selected by strict priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorStatus {
    NoPersonDetected,
    MultiplePeopleDetected,
    EyesClosedOrBlinking,
    LookingLeft,
    LookingRight,
    LookingUp,
    LookingDownExtreme,
    LookingDownSignificantly,
    SlightGazeDeviation,
    FocusedOnScreen,
}

impl BehaviorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorStatus::NoPersonDetected => "No person detected",
            BehaviorStatus::MultiplePeopleDetected => "Multiple people detected",
            BehaviorStatus::EyesClosedOrBlinking => "Eyes closed or blinking",
            BehaviorStatus::LookingLeft => "Looking left",
            BehaviorStatus::LookingRight => "Looking right",
            BehaviorStatus::LookingUp => "Looking up",
            BehaviorStatus::LookingDownExtreme => "Looking down",
            BehaviorStatus::LookingDownSignificantly => "Looking down significantly",
            BehaviorStatus::SlightGazeDeviation => "Slight gaze deviation",
            BehaviorStatus::FocusedOnScreen => "Focused on screen",
        }
    }
}

impl std::fmt::Display for BehaviorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_kind_roundtrip() {
        assert_eq!(AlertKind::MultipleFaces.as_str(), "multiple_faces");
        assert_eq!(AlertKind::DeviceDetectedPhone.as_str(), "device_detected_phone");
    }

    #[test]
    fn test_device_class_from_coco() {
        assert_eq!(DeviceClass::from_coco_label("cell phone"), Some(DeviceClass::Phone));
        assert_eq!(DeviceClass::from_coco_label("tv"), Some(DeviceClass::Monitor));
        assert_eq!(DeviceClass::from_coco_label("car"), None);
    }

    #[test]
    fn test_keyboard_mouse_have_no_alert() {
        assert_eq!(DeviceClass::Keyboard.alert_kind(), None);
        assert_eq!(DeviceClass::Mouse.alert_kind(), None);
    }

    #[test]
    fn test_behavior_status_display() {
        assert_eq!(BehaviorStatus::FocusedOnScreen.to_string(), "Focused on screen");
    }
}
