//! Detection-triggered recording state machine
//!
//! Consumes one detection result per frame plus the frame's monotonic
//! timestamp, and decides when to open, continue and finalize a recording
//! session. A clip starts on first detection and ends only after `grace`
//! elapses with no detection; re-detection during the grace window resumes
//! the same clip, so one session can span brief gaps in detection.

use crate::capture::Frame;
use crate::recorder::session::{RecordingSession, SinkFactory};
use crate::recorder::state::{TriggerPhase, TriggerState};
use crate::utils::{CamError, CamResult};
use std::time::Duration;

/// The trigger state machine
pub struct TriggerMachine {
    state: TriggerState,
    grace: Duration,
    sinks: Box<dyn SinkFactory>,
    sessions_completed: u64,
}

impl TriggerMachine {
    pub fn new(grace: Duration, sinks: Box<dyn SinkFactory>) -> Self {
        Self {
            state: TriggerState::Idle,
            grace,
            sinks,
            sessions_completed: 0,
        }
    }

    /// Current phase, for the loop and for tests
    pub fn phase(&self) -> TriggerPhase {
        self.state.phase()
    }

    /// Clips finalized so far
    pub fn sessions_completed(&self) -> u64 {
        self.sessions_completed
    }

    /// Advance the machine by one frame.
    ///
    /// `present` is whether the detector found anything in this frame. Sink
    /// errors leave the machine Idle with no session retained and are
    /// returned for the caller to surface; monitoring can continue.
    pub fn on_frame(&mut self, frame: &Frame, present: bool) -> CamResult<()> {
        let state = std::mem::take(&mut self.state);
        let (next, result) = self.advance(state, frame, present);
        self.state = next;
        result
    }

    fn advance(
        &mut self,
        state: TriggerState,
        frame: &Frame,
        present: bool,
    ) -> (TriggerState, CamResult<()>) {
        match state {
            TriggerState::Idle => {
                if !present {
                    return (TriggerState::Idle, Ok(()));
                }
                let mut session = match RecordingSession::open(self.sinks.as_mut(), frame) {
                    Ok(session) => session,
                    // No session retained; a later detection retries fresh
                    Err(e) => return (TriggerState::Idle, Err(e)),
                };
                tracing::info!("Subject detected, recording started");
                if let Err(e) = session.write(frame) {
                    return (TriggerState::Idle, Err(self.abort(session, e)));
                }
                (TriggerState::Active { session }, Ok(()))
            }

            TriggerState::Active { mut session } => {
                if let Err(e) = session.write(frame) {
                    return (TriggerState::Idle, Err(self.abort(session, e)));
                }
                if present {
                    (TriggerState::Active { session }, Ok(()))
                } else {
                    // Still within the grace window; keep writing
                    (
                        TriggerState::CoolingDown {
                            session,
                            since: frame.timestamp,
                        },
                        Ok(()),
                    )
                }
            }

            TriggerState::CoolingDown { mut session, since } => {
                if present {
                    if let Err(e) = session.write(frame) {
                        return (TriggerState::Idle, Err(self.abort(session, e)));
                    }
                    tracing::debug!("Subject re-detected, cooldown cancelled");
                    return (TriggerState::Active { session }, Ok(()));
                }

                if frame.timestamp.saturating_sub(since) >= self.grace {
                    // Quiet period complete; this frame is not written to
                    // the closed clip
                    let result = session.close();
                    if result.is_ok() {
                        self.sessions_completed += 1;
                    }
                    tracing::info!("Grace period elapsed, recording stopped");
                    return (TriggerState::Idle, result);
                }

                if let Err(e) = session.write(frame) {
                    return (TriggerState::Idle, Err(self.abort(session, e)));
                }
                (TriggerState::CoolingDown { session, since }, Ok(()))
            }
        }
    }

    /// Best-effort close after a mid-session failure; the write error wins
    fn abort(&mut self, session: RecordingSession, error: CamError) -> CamError {
        if let Err(close_error) = session.close() {
            tracing::warn!("Failed to close aborted session: {close_error}");
        }
        error
    }

    /// Shutdown finalization: close any open session.
    ///
    /// Safe to call when Idle (including repeatedly) — "no session open" is
    /// an ordinary state here, not a fault.
    pub fn finish(&mut self) -> CamResult<()> {
        match std::mem::take(&mut self.state) {
            TriggerState::Idle => Ok(()),
            TriggerState::Active { session } | TriggerState::CoolingDown { session, .. } => {
                tracing::info!("Finalizing open recording on shutdown");
                let result = session.close();
                if result.is_ok() {
                    self.sessions_completed += 1;
                }
                result
            }
        }
    }
}
