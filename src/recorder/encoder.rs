//! FFmpeg video sink
//!
//! Writes clips by piping raw RGBA frames into a spawned `ffmpeg` process.
//! One process per recording session; the clip is finalized by closing stdin
//! and waiting for the encoder to exit.

use crate::recorder::session::{SinkFactory, VideoSink};
use crate::utils::{CamError, CamResult};
use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Clip path for a session opened at `opened_at`
fn clip_path(output_dir: &Path, opened_at: DateTime<Local>) -> PathBuf {
    output_dir.join(format!("{}.mp4", opened_at.format("%d-%m-%Y-%H-%M-%S")))
}

/// Opens one FFmpeg encoder per recording session
pub struct FfmpegSinkFactory {
    output_dir: PathBuf,
    frame_rate: f64,
    codec: String,
}

impl FfmpegSinkFactory {
    pub fn new(output_dir: PathBuf, frame_rate: f64, codec: String) -> Self {
        Self {
            output_dir,
            frame_rate,
            codec,
        }
    }

    /// Fail fast when the ffmpeg binary is missing
    pub fn ensure_available() -> CamResult<()> {
        Command::new("ffmpeg")
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                CamError::SinkUnavailable(format!("ffmpeg not found on PATH: {e}"))
            })?;
        Ok(())
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn open(&mut self, width: u32, height: u32) -> CamResult<Box<dyn VideoSink>> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            CamError::SinkUnavailable(format!(
                "cannot create output directory {}: {e}",
                self.output_dir.display()
            ))
        })?;

        let path = clip_path(&self.output_dir, Local::now());
        let sink = FfmpegSink::spawn(&path, width, height, self.frame_rate, &self.codec)?;
        Ok(Box::new(sink))
    }
}

/// Video sink writing one clip through a piped FFmpeg process
pub struct FfmpegSink {
    process: Option<Child>,
    stdin: Option<ChildStdin>,
    path: PathBuf,
    frame_count: u64,
}

impl FfmpegSink {
    fn spawn(
        path: &Path,
        width: u32,
        height: u32,
        frame_rate: f64,
        codec: &str,
    ) -> CamResult<Self> {
        let mut process = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{width}x{height}"),
                "-r",
                &frame_rate.to_string(),
                "-i",
                "-",
                "-c:v",
                codec,
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CamError::SinkUnavailable(format!("failed to start FFmpeg encoder: {e}"))
            })?;

        let stdin = process.stdin.take().ok_or_else(|| {
            CamError::SinkUnavailable("failed to capture FFmpeg stdin".to_string())
        })?;

        tracing::info!(
            "Started FFmpeg encoder: {}x{} @ {}fps -> {}",
            width,
            height,
            frame_rate,
            path.display()
        );

        Ok(Self {
            process: Some(process),
            stdin: Some(stdin),
            path: path.to_path_buf(),
            frame_count: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VideoSink for FfmpegSink {
    fn write_frame(&mut self, rgba: &[u8]) -> CamResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CamError::Sink("encoder stdin already closed".to_string()))?;
        stdin
            .write_all(rgba)
            .map_err(|e| CamError::Sink(format!("failed to write frame: {e}")))?;
        self.frame_count += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> CamResult<()> {
        // Close stdin to signal EOF to FFmpeg
        drop(self.stdin.take());

        let process = self
            .process
            .take()
            .ok_or_else(|| CamError::Sink("encoder already finished".to_string()))?;
        let output = process
            .wait_with_output()
            .map_err(|e| CamError::Sink(format!("failed to wait for FFmpeg: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CamError::Sink(format!(
                "FFmpeg exited with error: {stderr}"
            )));
        }

        tracing::info!(
            "FFmpeg encoder finished: {} frames -> {}",
            self.frame_count,
            self.path.display()
        );
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        // Normal flow takes the child in finish(); a sink dropped with it
        // still attached was abandoned, so don't leave the process around.
        if let Some(mut process) = self.process.take() {
            drop(self.stdin.take());
            let _ = process.kill();
            let _ = process.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn clip_name_uses_session_timestamp() {
        let opened_at = Local.with_ymd_and_hms(2021, 9, 26, 14, 5, 9).unwrap();
        let path = clip_path(Path::new("videos"), opened_at);
        assert_eq!(path, Path::new("videos/26-09-2021-14-05-09.mp4"));
    }
}
