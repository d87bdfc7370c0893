// Inspect interactor - Describes a media file through the probe worker

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::ContainerSniffer;
use crate::ports::*;

/// What `inspect` reports about one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub path: String,
    pub file_size: u64,
    /// Whether the bytes open with an ISO media `ftyp` box
    pub is_mp4: bool,
    pub file_info: FileInfo,
    /// First video stream, when the probe found one
    pub video: Option<VideoInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameInfo>,
}

/// Interactor for media file inspection use case
pub struct InspectInteractor {
    probe_port: Arc<dyn ProbePort>,
    log_port: Arc<dyn LogPort>,
}

impl InspectInteractor {
    /// Create new inspect interactor with injected ports
    pub fn new(probe_port: Arc<dyn ProbePort>, log_port: Arc<dyn LogPort>) -> Self {
        Self {
            probe_port,
            log_port,
        }
    }

    /// Probe `path`, and describe frame `frame` too when given
    pub async fn inspect(&self, path: &Path, frame: Option<u64>) -> Result<InspectReport, DomainError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            DomainError::FsFail(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.inspect_bytes(&path.display().to_string(), data, frame)
            .await
    }

    /// Same as `inspect` for bytes already in memory
    pub async fn inspect_bytes(
        &self,
        name: &str,
        data: Vec<u8>,
        frame: Option<u64>,
    ) -> Result<InspectReport, DomainError> {
        self.log_port
            .info(&format!("Inspecting {} ({} bytes)", name, data.len()))
            .await;

        let file_size = data.len() as u64;
        let is_mp4 = ContainerSniffer::is_mp4(&data);
        let file = ProbeFile::new(file_name(name), data);

        let file_info = match self.probe_port.get_file_info(file.clone()).await {
            Ok(info) => info,
            Err(e) => {
                let _ = self.probe_port.clean_up().await;
                return Err(e);
            }
        };

        let frame = match frame {
            Some(index) => Some(self.probe_port.get_frames(file, index).await?),
            None => None,
        };

        self.log_port
            .debug(&format!(
                "{}: {} video stream(s), {} us",
                file_info.name,
                file_info.streams.len(),
                file_info.duration
            ))
            .await;

        Ok(InspectReport {
            path: name.to_string(),
            file_size,
            is_mp4,
            video: file_info.video_info().ok(),
            file_info,
            frame,
        })
    }
}

/// Last path component, which keeps the extension the probe uses as a hint
fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
