#![deny(unreachable_patterns)]
//! Detector adapters, geometric analyzers and the per-frame orchestrator
//! for the proctoring engine.
//!
//! This crate provides:
//! - Detector adapters for face presence, facial-landmark/iris mesh, body
//!   pose and generic object (device) detection
//! - Stateless geometric analyzers deriving gaze, EAR, head pose and
//!   pose-based signals from detector output
//! - A per-session bounded temporal buffer
//! - The alert/behavior classifier
//! - A frame overlay renderer
//! - The `Pipeline` orchestrator tying all of the above together

pub mod analyzers;
pub mod classifier;
pub mod detection;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod registry;
pub mod renderer;
pub mod session;

pub use error::{VisionError, VisionResult};
pub use io::decode_jpeg_bgr;
pub use pipeline::Pipeline;
pub use registry::{Availability, ModelRegistry};
pub use session::SessionBuffer;
