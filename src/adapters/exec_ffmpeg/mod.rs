//! FFmpeg execution adapter
//!
//! Runs the `ffmpeg` binary as a subprocess. The engine's file namespace is a
//! private scratch directory; every run executes with it as working directory,
//! so argument lists refer to plain file names.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::MICROS_PER_SECOND;
use crate::ports::*;

/// Arguments prepended to every run
const BASE_ARGS: [&str; 7] = [
    "-hide_banner",
    "-nostdin",
    "-nostats",
    "-y",
    "-progress",
    "pipe:1",
    "-loglevel",
];

/// Lines of stderr kept for error reports
const STDERR_TAIL: usize = 12;

/// FFmpeg-based engine adapter
pub struct FfmpegEngineAdapter {
    binary: PathBuf,
    workspace: TempDir,
    loaded: AtomicBool,
    logging: AtomicBool,
    progress: RwLock<Option<ProgressFn>>,
}

impl FfmpegEngineAdapter {
    /// Create new adapter with a fresh scratch directory
    pub fn new(binary: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let workspace = tempfile::Builder::new()
            .prefix("sticker-")
            .tempdir()
            .map_err(|e| DomainError::FsFail(format!("Failed to create workspace: {}", e)))?;

        Ok(Self {
            binary: binary.into(),
            workspace,
            loaded: AtomicBool::new(false),
            logging: AtomicBool::new(false),
            progress: RwLock::new(None),
        })
    }

    /// Scratch directory backing the file namespace
    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    /// Map a namespace file name to its path, refusing anything but plain names
    fn resolve(&self, name: &str) -> Result<PathBuf, DomainError> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !plain {
            return Err(DomainError::FsFail(format!("Invalid file name: {}", name)));
        }
        Ok(self.workspace.path().join(name))
    }

    fn current_progress(&self) -> Option<ProgressFn> {
        self.progress.read().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl EnginePort for FfmpegEngineAdapter {
    async fn load(&self) -> Result<(), DomainError> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                DomainError::EngineUnavailable(format!("{}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            return Err(DomainError::EngineUnavailable(format!(
                "{} -version exited with {}",
                self.binary.display(),
                output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        info!(
            version = version.lines().next().unwrap_or("unknown"),
            workspace = %self.workspace().display(),
            "FFmpeg engine loaded"
        );
        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_logging(&self, enabled: bool) {
        self.logging.store(enabled, Ordering::Relaxed);
    }

    fn set_progress(&self, callback: Option<ProgressFn>) {
        if let Ok(mut progress) = self.progress.write() {
            *progress = callback;
        }
    }

    async fn run(&self, args: &[String]) -> Result<(), DomainError> {
        if !self.loaded.load(Ordering::SeqCst) {
            return Err(DomainError::EngineUnavailable(
                "Engine has not been loaded".to_string(),
            ));
        }

        let logging = self.logging.load(Ordering::Relaxed);
        debug!(args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.binary)
            .args(BASE_ARGS)
            .arg(if logging { "info" } else { "error" })
            .args(args)
            .current_dir(self.workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::EngineUnavailable(format!("{}: {}", self.binary.display(), e))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::InternalError("Failed to capture ffmpeg stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DomainError::InternalError("Failed to capture ffmpeg stderr".to_string()))?;

        let input_duration = Arc::new(AtomicU64::new(0));
        let stderr_task = {
            let input_duration = Arc::clone(&input_duration);
            tokio::spawn(async move {
                let mut tail: Vec<String> = Vec::with_capacity(STDERR_TAIL);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(duration) = parse_duration_line(&line) {
                        input_duration.store(duration, Ordering::Relaxed);
                    }
                    if logging {
                        debug!(target: "ffmpeg", "{}", line);
                    }
                    if tail.len() == STDERR_TAIL {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
                tail
            })
        };

        let window = RunWindow::from_args(args);
        let progress = self.current_progress();
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Some(out_time) = parse_out_time(&line) else {
                continue;
            };
            let total = window.effective_duration(input_duration.load(Ordering::Relaxed));
            if let (Some(total), Some(callback)) = (total, progress.as_ref()) {
                callback((out_time as f64 / total as f64).clamp(0.0, 1.0));
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DomainError::EngineFailed(format!("Failed to wait for ffmpeg: {}", e)))?;
        let tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            warn!(status = %status, "ffmpeg run failed");
            return Err(DomainError::EngineFailed(format!(
                "ffmpeg exited with {}: {}",
                status,
                tail.join("\n")
            )));
        }

        if let Some(callback) = progress {
            callback(1.0);
        }
        Ok(())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), DomainError> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to write {}: {}", name, e)))
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, DomainError> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to read {}: {}", name, e)))
    }

    async fn unlink(&self, name: &str) -> Result<(), DomainError> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| DomainError::FsFail(format!("Failed to unlink {}: {}", name, e)))
    }
}

/// Input time window selected by `-ss`/`-to`, in microseconds, plus the
/// `setpts` factor that retimes it on the output side
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct RunWindow {
    start: Option<u64>,
    end: Option<u64>,
    pts_scale: Option<f64>,
}

impl RunWindow {
    fn from_args(args: &[String]) -> Self {
        let mut window = Self::default();
        for pair in args.windows(2) {
            let value = pair[1]
                .parse::<f64>()
                .ok()
                .map(|s| (s * MICROS_PER_SECOND).round() as u64);
            match pair[0].as_str() {
                "-ss" => window.start = value,
                "-to" => window.end = value,
                "-vf" | "-filter:v" => {
                    if let Some(scale) = parse_setpts(&pair[1]) {
                        window.pts_scale = Some(scale);
                    }
                }
                _ => {}
            }
        }
        window
    }

    /// Length of output expected from an input of `input_duration`
    fn effective_duration(&self, input_duration: u64) -> Option<u64> {
        if input_duration == 0 {
            return None;
        }
        let end = self.end.map_or(input_duration, |e| e.min(input_duration));
        let total = end.saturating_sub(self.start.unwrap_or(0));
        let total = (total as f64 * self.pts_scale.unwrap_or(1.0)).round() as u64;
        (total > 0).then_some(total)
    }
}

/// Factor of the first `setpts=F*PTS` in a filter chain
fn parse_setpts(filter: &str) -> Option<f64> {
    filter.split(',').find_map(|f| {
        let factor = f.trim().strip_prefix("setpts=")?.strip_suffix("*PTS")?;
        factor
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v > 0.0)
    })
}

/// `out_time_us=1234567` (also `out_time_ms`, which ffmpeg reports in microseconds)
fn parse_out_time(line: &str) -> Option<u64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => value.parse::<i64>().ok().map(|v| v.max(0) as u64),
        _ => None,
    }
}

/// `  Duration: 00:00:05.04, start: 0.000000, bitrate: 1205 kb/s`
fn parse_duration_line(line: &str) -> Option<u64> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    let stamp = rest.trim_start().split(',').next()?.trim();
    parse_timestamp(stamp)
}

/// `HH:MM:SS.ff` to microseconds
fn parse_timestamp(stamp: &str) -> Option<u64> {
    let mut parts = stamp.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(((hours * 3600.0 + minutes * 60.0 + seconds) * MICROS_PER_SECOND).round() as u64)
}
