//! Capture trait definitions
//!
//! Source-agnostic frame types and traits. Everything downstream (detector,
//! trigger machine, sinks) works against these, never against a device API.

use crate::utils::CamResult;
use std::time::Duration;

/// One captured frame.
///
/// Pixels are row-major RGBA. A frame is owned by the capture loop for the
/// duration of one iteration and handed to collaborators by reference; it is
/// never retained across iterations.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw RGBA pixel data, `width * height * 4` bytes
    pub data: Vec<u8>,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Monotonic capture timestamp, relative to source start
    pub timestamp: Duration,
}

impl Frame {
    /// Expected byte length of the pixel buffer
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// A service that produces frames on demand.
///
/// `Ok(None)` signals end of stream; the capture loop terminates cleanly.
pub trait FrameSource {
    /// Block until the next frame is available
    fn read(&mut self) -> CamResult<Option<Frame>>;
}

/// Optional live preview of the feed.
///
/// Preview failures must never affect recording behavior; the capture loop
/// only logs them.
pub trait PreviewSink {
    fn show(&mut self, frame: &Frame) -> CamResult<()>;
}
