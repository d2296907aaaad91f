//! Sentrycam - event-triggered security camera recorder.
//!
//! Watches a live camera feed, runs a subject detector on every frame, and
//! records `.mp4` clips bounded by a debounce policy: recording starts on
//! first detection and stops only after a configurable quiet period with no
//! detection.

pub mod capture;
pub mod config;
pub mod detect;
pub mod monitor;
pub mod recorder;
pub mod utils;

pub use config::MonitorConfig;
pub use monitor::{Monitor, MonitorReport};
pub use utils::{CamError, CamResult};
