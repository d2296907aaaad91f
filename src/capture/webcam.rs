//! Webcam capture using nokhwa
//!
//! Opens a camera by device index and delivers decoded RGBA frames. The
//! camera controls pacing: `read` blocks until the device produces the next
//! frame, so the capture loop runs at the device's natural delivery rate.

use crate::capture::traits::{Frame, FrameSource};
use crate::utils::{CamError, CamResult};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use std::time::Instant;

/// List the human-readable names of available cameras
pub fn enumerate() -> Vec<String> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .map(|info| info.human_name().to_string())
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

/// Frame source backed by a local webcam
pub struct WebcamSource {
    camera: Camera,
    opened: Instant,
}

impl WebcamSource {
    /// Open the camera at `index` and start its stream
    pub fn open(index: u32) -> CamResult<Self> {
        let format =
            RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let mut camera = Camera::new(CameraIndex::Index(index), format)
            .map_err(|e| CamError::Capture(format!("failed to open camera {index}: {e}")))?;

        camera
            .open_stream()
            .map_err(|e| CamError::Capture(format!("failed to open camera stream: {e}")))?;

        let camera_format = camera.camera_format();
        tracing::info!(
            "Webcam {} opened: {}x{} @ {}fps",
            index,
            camera_format.resolution().width(),
            camera_format.resolution().height(),
            camera_format.frame_rate()
        );

        Ok(Self {
            camera,
            opened: Instant::now(),
        })
    }

    /// Resolution the device settled on
    pub fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.camera_format().resolution();
        (resolution.width(), resolution.height())
    }
}

impl FrameSource for WebcamSource {
    fn read(&mut self) -> CamResult<Option<Frame>> {
        // A device that stops delivering frames ends the stream; the loop
        // treats that as exhaustion, not a fault.
        let buffer = match self.camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                tracing::warn!("Camera stopped delivering frames: {:?}", e);
                return Ok(None);
            }
        };

        let image = buffer
            .decode_image::<RgbAFormat>()
            .map_err(|e| CamError::Capture(format!("failed to decode frame: {e}")))?;

        let (width, height) = image.dimensions();
        Ok(Some(Frame {
            data: image.into_raw(),
            width,
            height,
            timestamp: self.opened.elapsed(),
        }))
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Error stopping camera stream: {:?}", e);
        }
    }
}
