use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

/// Container used when the stream supports none of the configured preferences
pub const FALLBACK_MIME_TYPE: &str = "video/webm";

/// One opaque segment of recorded media, in the order the device emitted it
#[derive(Debug, Clone)]
pub struct MediaChunk {
    /// Encoded media bytes (container fragment, not raw samples)
    pub data: Vec<u8>,
    /// When the controller received this chunk
    pub received_at: DateTime<Utc>,
}

impl MediaChunk {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            received_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Which tracks to request from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub video: bool,
    pub audio: bool,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

/// Failures raised while acquiring or driving the capture device
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// The user (or platform policy) refused camera/microphone access
    #[error("camera/microphone access denied: {0}")]
    PermissionDenied(String),
    /// Any other acquisition or capture failure
    #[error("capture device failed: {0}")]
    Device(String),
}

/// Grants access to camera + microphone
///
/// Implementations:
/// - `RemoteCapture`: the client device captures and pushes chunks over HTTP
/// - test fakes that script grants, denials, and chunk delivery
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Request hardware access
    ///
    /// The returned stream is exclusively owned by the caller until released.
    async fn acquire(&self, request: &CaptureRequest) -> Result<Box<dyn MediaStream>, CaptureError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// An acquired camera/microphone stream that can record combined video+audio
#[async_trait]
pub trait MediaStream: Send {
    /// Whether the recorder can produce the given container/codec
    fn supports_mime_type(&self, mime_type: &str) -> bool;

    /// Start recording
    ///
    /// Returns a channel receiver that yields chunks in arrival order. The
    /// channel closes when the device stops on its own.
    async fn start(&mut self, mime_type: &str) -> Result<mpsc::Receiver<MediaChunk>, CaptureError>;

    /// Stop recording
    ///
    /// Every chunk produced before this returns must already be in the channel.
    /// Calling it on a stopped stream is a no-op.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Release camera/microphone tracks. Idempotent.
    fn release(&mut self);

    /// Check if the stream is currently recording
    fn is_capturing(&self) -> bool;
}

/// Pick the first preference the stream supports
pub fn negotiate_mime_type(stream: &dyn MediaStream, preferences: &[String]) -> String {
    preferences
        .iter()
        .find(|mime_type| stream.supports_mime_type(mime_type))
        .cloned()
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyMp4;

    #[async_trait]
    impl MediaStream for OnlyMp4 {
        fn supports_mime_type(&self, mime_type: &str) -> bool {
            mime_type == "video/mp4"
        }

        async fn start(&mut self, _mime_type: &str) -> Result<mpsc::Receiver<MediaChunk>, CaptureError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn stop(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn release(&mut self) {}

        fn is_capturing(&self) -> bool {
            false
        }
    }

    fn prefs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_negotiation_picks_first_supported() {
        let chosen = negotiate_mime_type(
            &OnlyMp4,
            &prefs(&["video/webm;codecs=vp9", "video/webm", "video/mp4"]),
        );
        assert_eq!(chosen, "video/mp4");
    }

    #[test]
    fn test_negotiation_falls_back_to_webm() {
        let chosen = negotiate_mime_type(&OnlyMp4, &prefs(&["video/webm;codecs=vp9"]));
        assert_eq!(chosen, FALLBACK_MIME_TYPE);
    }

    #[test]
    fn test_capture_request_defaults_to_video_and_audio() {
        let request = CaptureRequest::default();
        assert!(request.video);
        assert!(request.audio);
    }
}
