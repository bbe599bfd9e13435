//! Shared data models for the proctoring engine.
//!
//! This crate provides Serde-serializable types for:
//! - Rectangles and points in normalized and pixel coordinate spaces
//! - Derived per-frame signals (gaze, EAR, head pose, hand/shoulder offsets)
//! - Alert kinds, device classes and the behavior-status vocabulary
//! - The outbound `Verdict` wire type and its nested `Details` record
//! - The `/ws/proctor` inbound/error frame types

pub mod alert;
pub mod rect;
pub mod signals;
pub mod verdict;
pub mod ws;

pub use alert::{AlertKind, BehaviorStatus, DeviceClass};
pub use rect::{BoundingBox, NormalizedRect, Point2D};
pub use signals::Signals;
pub use verdict::{Details, Verdict};
pub use ws::{ErrorFrame, FrameRequest};
