//! Detector adapters: one module per model, each exposing a narrow
//! `detect`/`analyze` operation over a frame. Every adapter is pure with
//! respect to its input frame and degrades to "unavailable" rather than
//! panicking when its backing model failed to load.

pub mod face_detector;
pub mod face_mesh;
pub mod object_detector;
pub mod pose_detector;

pub use face_detector::{FaceDetection, FaceDetector};
pub use face_mesh::{FaceMeshDetector, FaceMeshResult};
pub use object_detector::{DetectedObject, ObjectDetector, ObjectDetectorConfig, COCO_CLASSES};
pub use pose_detector::{Joint, PoseDetector, PoseResult};

