//! Background probe worker
//!
//! Requests are queued on a channel and served one at a time by a dedicated
//! task. Every request carries its own id and reply channel, so a response can
//! only ever resolve the caller that issued it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::{ProbeFile, ProbePort};

/// Does the actual probing on behalf of the worker
#[async_trait]
pub trait ProbeBackend: Send + Sync + 'static {
    async fn file_info(&self, file: &ProbeFile) -> Result<FileInfo, DomainError>;

    async fn frame(&self, file: &ProbeFile, index: u64) -> Result<FrameInfo, DomainError>;

    /// Clear whatever a failed request left behind
    async fn reset(&self);
}

#[derive(Debug)]
enum ProbeRequest {
    FileInfo(ProbeFile),
    Frames(ProbeFile, u64),
    CleanUp,
}

impl ProbeRequest {
    fn name(&self) -> &'static str {
        match self {
            ProbeRequest::FileInfo(_) => "get_file_info",
            ProbeRequest::Frames(..) => "get_frames",
            ProbeRequest::CleanUp => "clean_up",
        }
    }
}

#[derive(Debug)]
enum ProbeResponse {
    FileInfo(FileInfo),
    Frame(FrameInfo),
    CleanedUp,
}

type Reply = (u64, Result<ProbeResponse, DomainError>);

struct Envelope {
    id: u64,
    request: ProbeRequest,
    reply: oneshot::Sender<Reply>,
}

/// Queue-backed probe worker
pub struct ProbeWorker {
    sender: mpsc::Sender<Envelope>,
    next_id: AtomicU64,
    handle: JoinHandle<()>,
}

impl ProbeWorker {
    /// Maximum number of requests waiting for the worker
    const QUEUE_DEPTH: usize = 16;

    /// Start the worker task on the current runtime
    pub fn spawn<B: ProbeBackend>(backend: B) -> Self {
        let (sender, receiver) = mpsc::channel(Self::QUEUE_DEPTH);
        let handle = tokio::spawn(Self::serve(Arc::new(backend), receiver));
        Self {
            sender,
            next_id: AtomicU64::new(1),
            handle,
        }
    }

    async fn serve<B: ProbeBackend>(backend: Arc<B>, mut receiver: mpsc::Receiver<Envelope>) {
        while let Some(Envelope { id, request, reply }) = receiver.recv().await {
            debug!(id, request = request.name(), "Probe request");

            let result = match request {
                ProbeRequest::FileInfo(file) => {
                    backend.file_info(&file).await.map(ProbeResponse::FileInfo)
                }
                ProbeRequest::Frames(file, index) => {
                    backend.frame(&file, index).await.map(ProbeResponse::Frame)
                }
                ProbeRequest::CleanUp => {
                    backend.reset().await;
                    Ok(ProbeResponse::CleanedUp)
                }
            };

            if let Err(e) = &result {
                warn!(id, error = %e, "Probe request failed");
                backend.reset().await;
            }

            // requester may have given up; nothing to deliver to
            let _ = reply.send((id, result));
        }
        debug!("Probe worker stopped");
    }

    async fn request(&self, request: ProbeRequest) -> Result<ProbeResponse, DomainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, response) = oneshot::channel();

        self.sender
            .send(Envelope { id, request, reply })
            .await
            .map_err(|_| DomainError::InternalError("Probe worker is not running".to_string()))?;

        let (reply_id, result) = response.await.map_err(|_| {
            DomainError::InternalError("Probe worker dropped the request".to_string())
        })?;
        if reply_id != id {
            return Err(DomainError::InternalError(format!(
                "Probe reply {} delivered to request {}",
                reply_id, id
            )));
        }
        result
    }
}

impl Drop for ProbeWorker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[async_trait]
impl ProbePort for ProbeWorker {
    async fn get_file_info(&self, file: ProbeFile) -> Result<FileInfo, DomainError> {
        match self.request(ProbeRequest::FileInfo(file)).await? {
            ProbeResponse::FileInfo(info) => Ok(info),
            other => Err(unexpected("get_file_info", &other)),
        }
    }

    async fn get_frames(&self, file: ProbeFile, frame: u64) -> Result<FrameInfo, DomainError> {
        match self.request(ProbeRequest::Frames(file, frame)).await? {
            ProbeResponse::Frame(info) => Ok(info),
            other => Err(unexpected("get_frames", &other)),
        }
    }

    async fn clean_up(&self) -> Result<(), DomainError> {
        match self.request(ProbeRequest::CleanUp).await? {
            ProbeResponse::CleanedUp => Ok(()),
            other => Err(unexpected("clean_up", &other)),
        }
    }
}

fn unexpected(request: &str, response: &ProbeResponse) -> DomainError {
    DomainError::InternalError(format!("Unexpected reply to {}: {:?}", request, response))
}
