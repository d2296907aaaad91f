//! Recording session lifecycle
//!
//! A `RecordingSession` owns one open video sink. It is append-only and
//! finalized exactly once: `close` consumes the session, so a write after
//! close does not type-check.

use crate::capture::Frame;
use crate::utils::{CamError, CamResult};
use chrono::{DateTime, Local};

/// A service that appends frames to one open clip and finalizes it.
///
/// Implementations receive row-major RGBA pixel data with the dimensions the
/// sink was opened with.
pub trait VideoSink {
    fn write_frame(&mut self, rgba: &[u8]) -> CamResult<()>;

    /// Finalize the clip. Consumes the sink; the output is unplayable until
    /// this succeeds.
    fn finish(self: Box<Self>) -> CamResult<()>;
}

/// Opens video sinks for new recording sessions.
///
/// `open` fails with [`CamError::SinkUnavailable`] when the output
/// destination cannot be created.
pub trait SinkFactory {
    fn open(&mut self, width: u32, height: u32) -> CamResult<Box<dyn VideoSink>>;
}

/// One open output clip
pub struct RecordingSession {
    opened_at: DateTime<Local>,
    width: u32,
    height: u32,
    frames_written: u64,
    sink: Box<dyn VideoSink>,
}

impl RecordingSession {
    /// Open a new session, fixing clip dimensions from the first frame
    pub fn open(sinks: &mut dyn SinkFactory, frame: &Frame) -> CamResult<Self> {
        let sink = sinks.open(frame.width, frame.height)?;
        Ok(Self {
            opened_at: Local::now(),
            width: frame.width,
            height: frame.height,
            frames_written: 0,
            sink,
        })
    }

    /// Append a frame to the clip
    pub fn write(&mut self, frame: &Frame) -> CamResult<()> {
        if frame.width != self.width || frame.height != self.height {
            // A renegotiated capture resolution would corrupt the raw stream
            return Err(CamError::Sink(format!(
                "frame size changed mid-session: {}x{} -> {}x{}",
                self.width, self.height, frame.width, frame.height
            )));
        }
        self.sink.write_frame(&frame.data)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Finalize the clip
    pub fn close(self) -> CamResult<()> {
        tracing::debug!(
            "Closing session opened at {}: {} frames",
            self.opened_at.format("%H:%M:%S"),
            self.frames_written
        );
        self.sink.finish()
    }

    pub fn opened_at(&self) -> DateTime<Local> {
        self.opened_at
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct CountingSink {
        writes: Arc<AtomicU64>,
        finishes: Arc<AtomicU64>,
    }

    impl VideoSink for CountingSink {
        fn write_frame(&mut self, _rgba: &[u8]) -> CamResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn finish(self: Box<Self>) -> CamResult<()> {
            self.finishes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingFactory {
        writes: Arc<AtomicU64>,
        finishes: Arc<AtomicU64>,
    }

    impl SinkFactory for CountingFactory {
        fn open(&mut self, _width: u32, _height: u32) -> CamResult<Box<dyn VideoSink>> {
            Ok(Box::new(CountingSink {
                writes: self.writes.clone(),
                finishes: self.finishes.clone(),
            }))
        }
    }

    fn frame(width: u32, height: u32) -> Frame {
        Frame {
            data: vec![0; (width * height * 4) as usize],
            width,
            height,
            timestamp: Duration::ZERO,
        }
    }

    #[test]
    fn writes_then_closes_once() {
        let writes = Arc::new(AtomicU64::new(0));
        let finishes = Arc::new(AtomicU64::new(0));
        let mut factory = CountingFactory {
            writes: writes.clone(),
            finishes: finishes.clone(),
        };

        let first = frame(32, 24);
        let mut session = RecordingSession::open(&mut factory, &first).unwrap();
        session.write(&first).unwrap();
        session.write(&frame(32, 24)).unwrap();
        assert_eq!(session.frames_written(), 2);

        session.close().unwrap();
        assert_eq!(writes.load(Ordering::SeqCst), 2);
        assert_eq!(finishes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rejects_resized_frames() {
        let writes = Arc::new(AtomicU64::new(0));
        let finishes = Arc::new(AtomicU64::new(0));
        let mut factory = CountingFactory {
            writes: writes.clone(),
            finishes,
        };

        let mut session = RecordingSession::open(&mut factory, &frame(32, 24)).unwrap();
        let result = session.write(&frame(64, 48));
        assert!(matches!(result, Err(CamError::Sink(_))));
        assert_eq!(writes.load(Ordering::SeqCst), 0);
    }
}
