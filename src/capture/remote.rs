// Capture provider backed by a client device
//
// Over HTTP the browser owns the camera. It reports the outcome of its
// permission prompt before each start, then pushes encoded chunks to the
// session. This provider turns those pushes into the channel the recording
// loop consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::backend::{CaptureError, CaptureProvider, CaptureRequest, MediaChunk, MediaStream};

/// Raised when a client pushes data the session is not ready for
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("no active capture for this session")]
    NotCapturing,
    #[error("speech recognition is not listening for this session")]
    NotListening,
}

/// Outcome of the client's camera/microphone prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOutcome {
    Granted,
    Denied,
    Error,
}

/// What the client reports when asking to start recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub device: DeviceOutcome,
    /// Human-readable reason for a denial or error
    #[serde(default)]
    pub message: Option<String>,
    /// MIME types the client's recorder accepts (empty = not reported)
    #[serde(default)]
    pub supported_mime_types: Vec<String>,
}

impl DeviceReport {
    pub fn granted(supported_mime_types: Vec<String>) -> Self {
        Self {
            device: DeviceOutcome::Granted,
            message: None,
            supported_mime_types,
        }
    }

    pub fn denied() -> Self {
        Self {
            device: DeviceOutcome::Denied,
            message: None,
            supported_mime_types: Vec::new(),
        }
    }
}

#[derive(Default)]
struct RemoteInner {
    report: Option<DeviceReport>,
    sender: Option<mpsc::Sender<MediaChunk>>,
}

/// Capture provider fed by client pushes
///
/// Clones share the same feed: keep one in the controller and one where
/// requests arrive.
#[derive(Clone)]
pub struct RemoteCapture {
    inner: Arc<Mutex<RemoteInner>>,
    buffer: usize,
}

impl RemoteCapture {
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RemoteInner::default())),
            buffer: buffer.max(1),
        }
    }

    /// Record the client's device outcome for the next acquisition
    pub fn report(&self, report: DeviceReport) {
        lock(&self.inner).report = Some(report);
    }

    /// Whether a take is in progress and accepting chunks
    pub fn is_capturing(&self) -> bool {
        lock(&self.inner).sender.is_some()
    }

    /// Forward one chunk from the client
    pub async fn push(&self, data: Vec<u8>) -> Result<(), FeedError> {
        let sender = lock(&self.inner)
            .sender
            .clone()
            .ok_or(FeedError::NotCapturing)?;

        sender
            .send(MediaChunk::new(data))
            .await
            .map_err(|_| FeedError::NotCapturing)
    }
}

impl Default for RemoteCapture {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl CaptureProvider for RemoteCapture {
    async fn acquire(&self, request: &CaptureRequest) -> Result<Box<dyn MediaStream>, CaptureError> {
        let report = lock(&self.inner).report.take().ok_or_else(|| {
            CaptureError::Device("client did not report camera/microphone access".to_string())
        })?;

        match report.device {
            DeviceOutcome::Granted => {
                info!(
                    "Client granted capture (video={}, audio={})",
                    request.video, request.audio
                );
                Ok(Box::new(RemoteStream {
                    inner: Arc::clone(&self.inner),
                    buffer: self.buffer,
                    supported: report.supported_mime_types,
                    capturing: false,
                }))
            }
            DeviceOutcome::Denied => Err(CaptureError::PermissionDenied(
                report
                    .message
                    .unwrap_or_else(|| "camera/microphone permission was refused".to_string()),
            )),
            DeviceOutcome::Error => Err(CaptureError::Device(
                report
                    .message
                    .unwrap_or_else(|| "client failed to open camera/microphone".to_string()),
            )),
        }
    }

    fn name(&self) -> &str {
        "remote"
    }
}

struct RemoteStream {
    inner: Arc<Mutex<RemoteInner>>,
    buffer: usize,
    supported: Vec<String>,
    capturing: bool,
}

impl RemoteStream {
    fn close_feed(&mut self) {
        // Dropping the sender closes the channel once buffered chunks are read
        lock(&self.inner).sender = None;
        self.capturing = false;
    }
}

#[async_trait]
impl MediaStream for RemoteStream {
    fn supports_mime_type(&self, mime_type: &str) -> bool {
        self.supported.is_empty() || self.supported.iter().any(|s| s == mime_type)
    }

    async fn start(&mut self, mime_type: &str) -> Result<mpsc::Receiver<MediaChunk>, CaptureError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        lock(&self.inner).sender = Some(tx);
        self.capturing = true;
        debug!("Remote capture started ({})", mime_type);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if self.capturing {
            debug!("Remote capture stopped");
        }
        self.close_feed();
        Ok(())
    }

    fn release(&mut self) {
        self.close_feed();
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }
}

impl Drop for RemoteStream {
    fn drop(&mut self) {
        self.close_feed();
    }
}

fn lock(inner: &Mutex<RemoteInner>) -> MutexGuard<'_, RemoteInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_without_report_is_device_error() {
        let capture = RemoteCapture::default();
        let result = capture.acquire(&CaptureRequest::default()).await;
        assert!(matches!(result, Err(CaptureError::Device(_))));
    }

    #[tokio::test]
    async fn test_denied_report_maps_to_permission_denied() {
        let capture = RemoteCapture::default();
        capture.report(DeviceReport::denied());
        let result = capture.acquire(&CaptureRequest::default()).await;
        assert!(matches!(result, Err(CaptureError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_push_is_rejected_until_started() {
        let capture = RemoteCapture::default();
        assert_eq!(capture.push(vec![1, 2, 3]).await, Err(FeedError::NotCapturing));

        capture.report(DeviceReport::granted(vec!["video/webm".to_string()]));
        let mut stream = capture.acquire(&CaptureRequest::default()).await.unwrap();
        assert!(stream.supports_mime_type("video/webm"));
        assert!(!stream.supports_mime_type("video/mp4"));

        let mut rx = stream.start("video/webm").await.unwrap();
        capture.push(vec![1, 2, 3]).await.unwrap();
        stream.stop().await.unwrap();

        // Buffered chunk survives the stop, then the channel closes
        assert_eq!(rx.recv().await.map(|c| c.data), Some(vec![1, 2, 3]));
        assert!(rx.recv().await.is_none());
        assert_eq!(capture.push(vec![4]).await, Err(FeedError::NotCapturing));
    }
}
