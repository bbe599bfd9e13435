//! Process-wide, read-only set of detector handles.
//!
//! Mirrors the teacher's pattern of a single shared `ObjectDetector` behind
//! a `Mutex`-guarded `Session`, generalized to every detector kind this
//! engine uses and wrapped in a silent-once degradation contract: a model
//! that fails to load flips to `Availability::Unavailable` and is logged
//! exactly once, the way `face_landmarks.rs`'s `OnceLock<bool>` guard does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tracing::warn;

use crate::detection::face_detector::FaceDetector;
use crate::detection::face_mesh::FaceMeshDetector;
use crate::detection::object_detector::{ObjectDetector, ObjectDetectorConfig};
use crate::detection::pose_detector::PoseDetector;

/// Whether a detector's backing model is usable for this process's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Logs a model-unavailable warning exactly once per detector kind, then
/// stays silent for the remainder of the process.
struct WarnOnce {
    warned: AtomicBool,
}

impl WarnOnce {
    const fn new() -> Self {
        Self { warned: AtomicBool::new(false) }
    }

    fn warn_once(&self, detector: &str, reason: &str) {
        if self.warned.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
            warn!(detector, reason, "detector unavailable, degrading silently from now on");
        }
    }
}

static FACE_WARN: WarnOnce = WarnOnce::new();
static MESH_WARN: WarnOnce = WarnOnce::new();
static POSE_WARN: WarnOnce = WarnOnce::new();
static OBJECT_WARN: WarnOnce = WarnOnce::new();

/// The process-wide set of detector handles, built once at startup and
/// shared (read-only) across every session task.
pub struct ModelRegistry {
    face_detector: Option<FaceDetector>,
    face_mesh: Option<FaceMeshDetector>,
    pose_detector: Option<PoseDetector>,
    object_detector: Option<ObjectDetector>,
    startup_complete: OnceLock<()>,
}

impl ModelRegistry {
    /// Load every model, tolerating individual failures. Called once at
    /// process start; never fails outright, since a missing model degrades
    /// its feature rather than aborting startup.
    pub fn load(object_model_path: &str) -> Self {
        let face_detector = match FaceDetector::load() {
            Ok(d) => Some(d),
            Err(e) => {
                FACE_WARN.warn_once("face_detector", &e.to_string());
                None
            }
        };

        let face_mesh = match FaceMeshDetector::load() {
            Ok(d) => Some(d),
            Err(e) => {
                MESH_WARN.warn_once("face_mesh", &e.to_string());
                None
            }
        };

        let pose_detector = match PoseDetector::load() {
            Ok(d) => Some(d),
            Err(e) => {
                POSE_WARN.warn_once("pose_detector", &e.to_string());
                None
            }
        };

        let object_detector = match ObjectDetector::new(ObjectDetectorConfig {
            model_path: object_model_path.to_string(),
            ..ObjectDetectorConfig::default()
        }) {
            Ok(d) => Some(d),
            Err(e) => {
                OBJECT_WARN.warn_once("object_detector", &e.to_string());
                None
            }
        };

        let registry = Self {
            face_detector,
            face_mesh,
            pose_detector,
            object_detector,
            startup_complete: OnceLock::new(),
        };
        let _ = registry.startup_complete.set(());
        registry
    }

    pub fn face_detector(&self) -> Option<&FaceDetector> {
        self.face_detector.as_ref()
    }

    pub fn face_mesh(&self) -> Option<&FaceMeshDetector> {
        self.face_mesh.as_ref()
    }

    pub fn pose_detector(&self) -> Option<&PoseDetector> {
        self.pose_detector.as_ref()
    }

    pub fn object_detector(&self) -> Option<&ObjectDetector> {
        self.object_detector.as_ref()
    }

    pub fn face_availability(&self) -> Availability {
        availability(self.face_detector.is_some())
    }

    pub fn mesh_availability(&self) -> Availability {
        availability(self.face_mesh.is_some())
    }

    pub fn pose_availability(&self) -> Availability {
        availability(self.pose_detector.is_some())
    }

    pub fn object_availability(&self) -> Availability {
        availability(self.object_detector.is_some())
    }

    /// True once the registry has finished its one and only load attempt,
    /// regardless of how many models actually came up. Used by the
    /// readiness check.
    pub fn startup_complete(&self) -> bool {
        self.startup_complete.get().is_some()
    }
}

fn availability(loaded: bool) -> Availability {
    if loaded {
        Availability::Available
    } else {
        Availability::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_once_fires_a_single_time() {
        let w = WarnOnce::new();
        assert!(!w.warned.load(Ordering::SeqCst));
        w.warn_once("x", "missing");
        assert!(w.warned.load(Ordering::SeqCst));
        // second call is a no-op, but shouldn't panic or flip state back
        w.warn_once("x", "missing");
        assert!(w.warned.load(Ordering::SeqCst));
    }

    #[test]
    fn test_registry_with_missing_model_path_is_still_usable() {
        let registry = ModelRegistry::load("/nonexistent/path/model.onnx");
        assert!(registry.startup_complete());
        assert_eq!(registry.object_availability(), Availability::Unavailable);
    }
}
