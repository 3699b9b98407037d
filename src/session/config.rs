use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::CaptureRequest;

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Recorder container/codec preferences, best first
    pub codec_preferences: Vec<String>,

    /// Timer period; the elapsed counter advances once per tick
    /// Default: 1000 ms
    pub tick_interval_ms: u64,

    /// Where submitted recordings are written (None = keep in memory only)
    pub media_dir: Option<PathBuf>,

    /// Channel capacity for chunks and recognition events
    pub feed_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            codec_preferences: vec![
                "video/webm;codecs=vp9".to_string(),
                "video/webm".to_string(),
                "video/mp4".to_string(),
            ],
            tick_interval_ms: 1000,
            media_dir: None,
            feed_buffer: 64,
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Camera and microphone together
    pub fn capture_request(&self) -> CaptureRequest {
        CaptureRequest::default()
    }
}
