//! Trigger state
//!
//! Defines the recording trigger state machine's states. The recording
//! states carry the live session, so "a session is open iff the state is
//! Active or CoolingDown" holds by construction: an idle state with an open
//! clip, or a cooldown timer without one, cannot be represented.

use crate::recorder::session::RecordingSession;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Current state of the trigger machine
pub enum TriggerState {
    /// No subject in view, no clip open
    Idle,
    /// Subject in view, clip recording
    Active { session: RecordingSession },
    /// Subject left view; clip still recording until the grace period
    /// elapses. `since` is the capture timestamp at which detection ceased.
    CoolingDown {
        session: RecordingSession,
        since: Duration,
    },
}

impl Default for TriggerState {
    fn default() -> Self {
        Self::Idle
    }
}

impl TriggerState {
    /// Data-free view of the state, for observation and status reporting
    pub fn phase(&self) -> TriggerPhase {
        match self {
            Self::Idle => TriggerPhase::Idle,
            Self::Active { .. } => TriggerPhase::Active,
            Self::CoolingDown { .. } => TriggerPhase::CoolingDown,
        }
    }

    /// Whether a recording session is currently open
    pub fn is_recording(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// Phase of the trigger machine, without the per-state payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerPhase {
    Idle,
    Active,
    CoolingDown,
}
