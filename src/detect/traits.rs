//! Detector trait definitions

use crate::capture::Frame;
use crate::utils::{CamError, CamResult};
use serde::{Deserialize, Serialize};

/// A region of a frame classified as containing the subject of interest.
///
/// Coordinates are pixels, origin top-left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Pluggable subject detector.
///
/// Implementations may be stateful (frame differencing keeps the previous
/// frame), hence `&mut self`. The frame is read-only and must not be retained
/// beyond the call. Errors are transient: the capture loop treats them as
/// "nothing detected" and never escalates them.
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> CamResult<Vec<Detection>>;
}

/// Detector tuning.
///
/// `scale_factor` and `min_neighbors` carry the classic cascade-classifier
/// semantics: the factor between successive search-window scales (accuracy vs
/// speed) and how many overlapping raw hits must agree before a region counts
/// as a detection (noise rejection).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    /// Growth factor between search-window scales; must be > 1.0,
    /// recommended 1.1-1.5
    pub scale_factor: f64,

    /// Overlapping raw hits required to confirm a detection;
    /// recommended 3-6
    pub min_neighbors: u32,

    /// Per-pixel luma delta that marks a pixel as changed
    pub diff_threshold: u8,

    /// Smallest search window edge, in pixels
    pub min_window: u32,

    /// Fraction of changed pixels a window needs to count as a raw hit
    pub min_fill: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.2,
            min_neighbors: 5,
            diff_threshold: 24,
            min_window: 32,
            min_fill: 0.2,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> CamResult<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 {
            return Err(CamError::Config(format!(
                "scaleFactor must be > 1.0, got {}",
                self.scale_factor
            )));
        }
        if self.min_neighbors == 0 {
            return Err(CamError::Config(
                "minNeighbors must be at least 1".to_string(),
            ));
        }
        if self.min_window < 8 {
            return Err(CamError::Config(format!(
                "minWindow must be at least 8, got {}",
                self.min_window
            )));
        }
        if !self.min_fill.is_finite() || self.min_fill <= 0.0 || self.min_fill > 1.0 {
            return Err(CamError::Config(format!(
                "minFill must be in (0, 1], got {}",
                self.min_fill
            )));
        }
        Ok(())
    }
}
