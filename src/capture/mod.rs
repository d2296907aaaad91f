//! Frame acquisition
//!
//! This module provides the frame source abstraction and the webcam
//! implementation behind it:
//! - `FrameSource` trait for pull-based frame delivery
//! - `WebcamSource` backed by nokhwa (feature: webcam)
//! - `PreviewSink` for optional live display, fully decoupled from recording

pub mod traits;

#[cfg(feature = "webcam")]
pub mod webcam;

pub use traits::{Frame, FrameSource, PreviewSink};

#[cfg(feature = "webcam")]
pub use webcam::WebcamSource;
