//! Subject detection
//!
//! Per-frame classification: given a frame, return the regions that contain
//! the subject of interest. Only the presence or absence of detections drives
//! recording; boxes are exposed for diagnostics and future overlays.

pub mod motion;
pub mod traits;

pub use motion::MotionDetector;
pub use traits::{Detection, Detector, DetectorConfig};
