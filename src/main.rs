use sentrycam::capture::FrameSource;
use sentrycam::detect::MotionDetector;
use sentrycam::recorder::{FfmpegSinkFactory, TriggerMachine};
use sentrycam::{CamResult, Monitor, MonitorConfig};
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sentrycam=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting sentrycam v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        tracing::error!("Fatal: {e}");
        std::process::exit(1);
    }
}

fn run() -> CamResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => MonitorConfig::load(Path::new(&path))?,
        None => MonitorConfig::default(),
    };
    config.validate()?;

    FfmpegSinkFactory::ensure_available()?;

    let detector = MotionDetector::new(config.detector.clone())?;
    let sinks = FfmpegSinkFactory::new(
        config.output_dir.clone(),
        config.frame_rate,
        config.codec.clone(),
    );
    let machine = TriggerMachine::new(config.grace(), Box::new(sinks));
    let monitor = Monitor::new(Box::new(detector), machine);

    // 'q' on stdin stops the loop after the current frame
    spawn_quit_watcher(monitor.quit_flag());

    let mut source = open_source(&config)?;
    tracing::info!(
        "Monitoring camera {} -> {} (grace {:.1}s, type 'q' + Enter to quit)",
        config.camera_index,
        config.output_dir.display(),
        config.grace_secs
    );

    let report = monitor.run(source.as_mut())?;
    tracing::info!(
        "Monitored {} frames, recorded {} clip(s)",
        report.frames_seen,
        report.sessions_recorded
    );
    Ok(())
}

fn spawn_quit_watcher(quit: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                    quit.store(true, Ordering::SeqCst);
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });
}

#[cfg(feature = "webcam")]
fn open_source(config: &MonitorConfig) -> CamResult<Box<dyn FrameSource>> {
    use sentrycam::capture::webcam::{self, WebcamSource};

    let source = match WebcamSource::open(config.camera_index) {
        Ok(source) => source,
        Err(e) => {
            let available = webcam::enumerate();
            if available.is_empty() {
                tracing::error!("No cameras found");
            } else {
                tracing::error!("Available cameras: {}", available.join(", "));
            }
            return Err(e);
        }
    };
    Ok(Box::new(source))
}

#[cfg(not(feature = "webcam"))]
fn open_source(_config: &MonitorConfig) -> CamResult<Box<dyn FrameSource>> {
    Err(sentrycam::CamError::Capture(
        "built without the `webcam` feature; no frame source available".to_string(),
    ))
}
