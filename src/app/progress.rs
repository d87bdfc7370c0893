//! Progress reporting for a running conversion
//!
//! Observers are driven from the controller's state channel, so they only
//! ever see what the store recorded.

use std::io::Write;

use tokio::sync::watch;

use crate::domain::model::*;
use crate::domain::store::AppState;

/// Receives conversion lifecycle events
pub trait ProgressObserver: Send + Sync {
    /// Called when the conversion enters a new status
    fn on_phase(&self, status: ConversionStatus);

    /// Called when the whole-percent progress changes
    fn on_progress(&self, percent: u32);

    /// Called once the sticker is available
    fn on_complete(&self, output: &OutputFile);

    /// Called when a phase failed
    fn on_error(&self, error: &str);
}

/// Width of the console progress bar in cells
const BAR_WIDTH: usize = 30;

/// Text progress bar, `[#####-----]  50%`
pub fn progress_bar(percent: u32) -> String {
    let percent = percent.min(100);
    let filled = (percent as usize * BAR_WIDTH) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

fn phase_label(status: ConversionStatus) -> &'static str {
    match status {
        ConversionStatus::Idle => "Idle",
        ConversionStatus::ConvertingTrim => "Trimming and cropping",
        ConversionStatus::ConvertingEncode => "Encoding sticker",
        ConversionStatus::Converted => "Converted",
        ConversionStatus::Failed => "Failed",
    }
}

/// Console progress bar redrawn in place on stderr
pub struct ConsoleProgressObserver {
    verbose: bool,
}

impl ConsoleProgressObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressObserver for ConsoleProgressObserver {
    fn on_phase(&self, status: ConversionStatus) {
        if self.verbose && status.is_converting() {
            eprintln!("{}...", phase_label(status));
        }
    }

    fn on_progress(&self, percent: u32) {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r{}", progress_bar(percent));
        let _ = stderr.flush();
    }

    fn on_complete(&self, output: &OutputFile) {
        eprintln!("\r{}", progress_bar(100));
        if self.verbose {
            eprintln!("Sticker ready ({} bytes)", output.file_size);
        }
    }

    fn on_error(&self, error: &str) {
        eprintln!();
        eprintln!("Error: {}", error);
    }
}

/// One JSON object per line on stdout, for scripting
pub struct JsonProgressObserver;

impl JsonProgressObserver {
    fn emit(event: serde_json::Value) {
        println!("{}", event);
    }
}

impl ProgressObserver for JsonProgressObserver {
    fn on_phase(&self, status: ConversionStatus) {
        Self::emit(serde_json::json!({
            "event": "phase",
            "status": status,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn on_progress(&self, percent: u32) {
        Self::emit(serde_json::json!({
            "event": "progress",
            "percent": percent,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn on_complete(&self, output: &OutputFile) {
        Self::emit(serde_json::json!({
            "event": "complete",
            "file_size": output.file_size,
            "size_kb": output.size_kb(),
            "video_src": output.video_src,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn on_error(&self, error: &str) {
        Self::emit(serde_json::json!({
            "event": "error",
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }
}

/// Last values forwarded to an observer
#[derive(Debug, Default)]
struct Reported {
    status: ConversionStatus,
    percent: Option<u32>,
}

/// Forwards state changes to an observer until the controller goes away
/// or the conversion settles
pub async fn watch_progress(mut rx: watch::Receiver<AppState>, observer: &dyn ProgressObserver) {
    let mut reported = Reported::default();

    loop {
        let state = rx.borrow_and_update().clone();
        if forward(&state, observer, &mut reported) {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Returns true once a terminal status was reported
fn forward(state: &AppState, observer: &dyn ProgressObserver, reported: &mut Reported) -> bool {
    let status = state.convertor.convert_status;

    if status != reported.status {
        reported.status = status;
        observer.on_phase(status);
        match status {
            ConversionStatus::Converted => {
                if let Some(output) = &state.output_file {
                    observer.on_complete(output);
                }
                return true;
            }
            ConversionStatus::Failed => {
                let message = state.convertor.error.as_deref().unwrap_or("conversion failed");
                observer.on_error(message);
                return true;
            }
            _ => {}
        }
    }

    if status.is_converting() {
        let percent = state.progress_percent();
        if reported.percent != Some(percent) {
            reported.percent = Some(percent);
            observer.on_progress(percent);
        }
    }
    false
}
