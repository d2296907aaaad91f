//! Recording system module
//!
//! This module implements the detection-triggered recording architecture:
//! - TriggerState / TriggerMachine: the per-frame state machine
//! - RecordingSession: one open clip, finalized exactly once
//! - VideoSink / SinkFactory traits and the FFmpeg implementation

pub mod encoder;
pub mod session;
pub mod state;
pub mod trigger;

pub use encoder::{FfmpegSink, FfmpegSinkFactory};
pub use session::{RecordingSession, SinkFactory, VideoSink};
pub use state::{TriggerPhase, TriggerState};
pub use trigger::TriggerMachine;
