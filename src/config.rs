//! Monitor configuration
//!
//! Runtime configuration for the capture loop, detector and video sink.
//! All fields have defaults, so an empty JSON object is a valid config file.

use crate::detect::DetectorConfig;
use crate::utils::{CamError, CamResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for the monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    /// Directory recorded clips are written to
    pub output_dir: PathBuf,

    /// Frame rate of saved clips
    pub frame_rate: f64,

    /// Quiet period (seconds with no detection) before a clip is finalized
    pub grace_secs: f64,

    /// FFmpeg video codec for saved clips (`mpeg4` tags .mp4 output with the
    /// mp4v fourcc)
    pub codec: String,

    /// Camera device index to capture from
    pub camera_index: u32,

    /// Detector tuning
    pub detector: DetectorConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("videos"),
            frame_rate: 20.0,
            grace_secs: 5.0,
            codec: "mpeg4".to_string(),
            camera_index: 0,
            detector: DetectorConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> CamResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| CamError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are usable before any capture starts
    pub fn validate(&self) -> CamResult<()> {
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(CamError::Config(format!(
                "frameRate must be positive, got {}",
                self.frame_rate
            )));
        }
        if !self.grace_secs.is_finite() || self.grace_secs < 0.0 {
            return Err(CamError::Config(format!(
                "graceSecs must be non-negative, got {}",
                self.grace_secs
            )));
        }
        if self.codec.is_empty() {
            return Err(CamError::Config("codec must not be empty".to_string()));
        }
        self.detector.validate()
    }

    /// Grace period as a Duration
    pub fn grace(&self) -> Duration {
        Duration::from_secs_f64(self.grace_secs)
    }
}
