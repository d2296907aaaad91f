//! Capture loop
//!
//! Drives the per-frame cycle: acquire frame, detect, advance the trigger
//! machine, optionally forward the frame to a preview sink, check the quit
//! flag. Single-threaded and frame-paced: the source's delivery rate bounds
//! the iteration rate, and exactly one frame is in flight at a time.

use crate::capture::{FrameSource, PreviewSink};
use crate::detect::Detector;
use crate::recorder::TriggerMachine;
use crate::utils::CamResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Summary of one monitoring run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorReport {
    /// Frames pulled from the source
    pub frames_seen: u64,
    /// Clips finalized (including one closed by shutdown)
    pub sessions_recorded: u64,
}

/// Owns the capture loop's state: detector, trigger machine, optional
/// preview, and the externally visible quit flag
pub struct Monitor {
    detector: Box<dyn Detector>,
    machine: TriggerMachine,
    preview: Option<Box<dyn PreviewSink>>,
    quit: Arc<AtomicBool>,
}

impl Monitor {
    pub fn new(detector: Box<dyn Detector>, machine: TriggerMachine) -> Self {
        Self {
            detector,
            machine,
            preview: None,
            quit: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach a live preview. Preview failures are logged and the preview is
    /// dropped; recording behavior never changes.
    pub fn with_preview(mut self, preview: Box<dyn PreviewSink>) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Flag that stops the loop from another thread (signal handler, test)
    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        self.quit.clone()
    }

    /// Run until quit is signaled or the source is exhausted.
    ///
    /// Any open recording session is finalized before this returns,
    /// whatever the reason for exit.
    pub fn run(mut self, source: &mut dyn FrameSource) -> CamResult<MonitorReport> {
        let mut frames_seen = 0u64;

        loop {
            if self.quit.load(Ordering::SeqCst) {
                tracing::info!("Quit requested, stopping monitor");
                break;
            }

            let frame = match source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("Frame source exhausted, stopping monitor");
                    break;
                }
                Err(e) => {
                    tracing::warn!("Frame source failed, stopping monitor: {e}");
                    break;
                }
            };
            frames_seen += 1;

            // Detector faults are transient: treat as "nothing detected"
            let detections = match self.detector.detect(&frame) {
                Ok(detections) => detections,
                Err(e) => {
                    tracing::debug!("Detector error on frame, treating as empty: {e}");
                    Vec::new()
                }
            };

            if let Err(e) = self.machine.on_frame(&frame, !detections.is_empty()) {
                // Session already returned to Idle; keep monitoring
                tracing::error!("Recording error: {e}");
            }

            if let Some(preview) = &mut self.preview {
                if let Err(e) = preview.show(&frame) {
                    tracing::warn!("Preview failed, disabling: {e}");
                    self.preview = None;
                }
            }
        }

        // Shutdown finalization: an unfinalized clip is a truncated file
        self.machine.finish()?;

        Ok(MonitorReport {
            frames_seen,
            sessions_recorded: self.machine.sessions_completed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;
    use crate::detect::Detection;
    use crate::recorder::{SinkFactory, VideoSink};
    use crate::utils::{CamError, CamResult};
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    /// Source that yields one frame per scripted entry, then end-of-stream
    struct ScriptedSource {
        remaining: usize,
        next_t: u64,
        quit_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl ScriptedSource {
        fn with_frames(count: usize) -> Self {
            Self {
                remaining: count,
                next_t: 0,
                quit_after: None,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn read(&mut self) -> CamResult<Option<Frame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            let t = self.next_t;
            self.next_t += 1;
            if let Some((after, flag)) = &self.quit_after {
                if self.next_t as usize >= *after {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            Ok(Some(Frame {
                data: vec![0; 8 * 8 * 4],
                width: 8,
                height: 8,
                timestamp: Duration::from_secs(t),
            }))
        }
    }

    /// Detector that replays a presence script, erroring where requested
    struct ScriptedDetector {
        script: Vec<Result<bool, ()>>,
        cursor: usize,
    }

    impl ScriptedDetector {
        fn presence(script: &[bool]) -> Self {
            Self {
                script: script.iter().map(|p| Ok(*p)).collect(),
                cursor: 0,
            }
        }
    }

    impl Detector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> CamResult<Vec<Detection>> {
            let step = self.script.get(self.cursor).copied().unwrap_or(Ok(false));
            self.cursor += 1;
            match step {
                Ok(true) => Ok(vec![Detection {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 4,
                }]),
                Ok(false) => Ok(Vec::new()),
                Err(()) => Err(CamError::Detection("classifier hiccup".to_string())),
            }
        }
    }

    struct CountingFactory {
        opens: Arc<AtomicU64>,
        finishes: Arc<AtomicU64>,
    }

    struct CountingSink {
        finishes: Arc<AtomicU64>,
    }

    impl VideoSink for CountingSink {
        fn write_frame(&mut self, _rgba: &[u8]) -> CamResult<()> {
            Ok(())
        }
        fn finish(self: Box<Self>) -> CamResult<()> {
            self.finishes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl SinkFactory for CountingFactory {
        fn open(&mut self, _width: u32, _height: u32) -> CamResult<Box<dyn VideoSink>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingSink {
                finishes: self.finishes.clone(),
            }))
        }
    }

    fn harness(
        script: ScriptedDetector,
        grace_secs: u64,
    ) -> (Monitor, Arc<AtomicU64>, Arc<AtomicU64>) {
        let opens = Arc::new(AtomicU64::new(0));
        let finishes = Arc::new(AtomicU64::new(0));
        let factory = CountingFactory {
            opens: opens.clone(),
            finishes: finishes.clone(),
        };
        let machine = TriggerMachine::new(Duration::from_secs(grace_secs), Box::new(factory));
        (Monitor::new(Box::new(script), machine), opens, finishes)
    }

    #[test]
    fn source_exhaustion_exits_cleanly_with_report() {
        let (monitor, opens, _) = harness(ScriptedDetector::presence(&[false; 4]), 5);
        let mut source = ScriptedSource::with_frames(4);

        let report = monitor.run(&mut source).unwrap();

        assert_eq!(report.frames_seen, 4);
        assert_eq!(report.sessions_recorded, 0);
        assert_eq!(opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exhaustion_mid_recording_finalizes_the_clip() {
        let (monitor, opens, finishes) =
            harness(ScriptedDetector::presence(&[false, true, true]), 5);
        let mut source = ScriptedSource::with_frames(3);

        let report = monitor.run(&mut source).unwrap();

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
        assert_eq!(report.sessions_recorded, 1);
    }

    #[test]
    fn quit_mid_recording_finalizes_the_clip() {
        let (monitor, _, finishes) = harness(ScriptedDetector::presence(&[true; 10]), 5);
        let quit = monitor.quit_flag();
        let mut source = ScriptedSource::with_frames(10);
        source.quit_after = Some((3, quit));

        let report = monitor.run(&mut source).unwrap();

        assert_eq!(report.frames_seen, 3);
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
        assert_eq!(report.sessions_recorded, 1);
    }

    #[test]
    fn detector_errors_count_as_absence() {
        // Error frames inside the grace window must not fragment the session
        let script = ScriptedDetector {
            script: vec![Ok(true), Err(()), Err(()), Ok(true)],
            cursor: 0,
        };
        let (monitor, opens, finishes) = harness(script, 5);
        let mut source = ScriptedSource::with_frames(4);

        monitor.run(&mut source).unwrap();

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(finishes.load(Ordering::SeqCst), 1, "closed by shutdown");
    }

    struct FlakyPreview {
        shown: Arc<AtomicU64>,
        fail_after: u64,
    }

    impl PreviewSink for FlakyPreview {
        fn show(&mut self, _frame: &Frame) -> CamResult<()> {
            if self.shown.load(Ordering::SeqCst) >= self.fail_after {
                return Err(CamError::Capture("window closed".to_string()));
            }
            self.shown.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn preview_failure_never_affects_recording() {
        let (monitor, opens, finishes) = harness(ScriptedDetector::presence(&[true; 6]), 5);
        let shown = Arc::new(AtomicU64::new(0));
        let monitor = monitor.with_preview(Box::new(FlakyPreview {
            shown: shown.clone(),
            fail_after: 2,
        }));
        let mut source = ScriptedSource::with_frames(6);

        let report = monitor.run(&mut source).unwrap();

        // Preview died after two frames, but every frame was still processed
        assert_eq!(shown.load(Ordering::SeqCst), 2);
        assert_eq!(report.frames_seen, 6);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detector_errors_alone_never_trigger() {
        let script = ScriptedDetector {
            script: vec![Err(()); 5],
            cursor: 0,
        };
        let (monitor, opens, _) = harness(script, 5);
        let mut source = ScriptedSource::with_frames(5);

        let report = monitor.run(&mut source).unwrap();

        assert_eq!(opens.load(Ordering::SeqCst), 0);
        assert_eq!(report.sessions_recorded, 0);
    }
}
