use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No hardware held
    Idle,
    /// Waiting on camera/microphone access
    Acquiring,
    /// Capture, transcription, and timer running
    Recording,
    /// Take finished; media assembled and hardware released
    Stopped,
    /// Attempt write in flight
    Submitting,
    /// Attempt stored; the session is finished
    Submitted,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Acquiring => "acquiring",
            SessionState::Recording => "recording",
            SessionState::Stopped => "stopped",
            SessionState::Submitting => "submitting",
            SessionState::Submitted => "submitted",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a recording session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: SessionState,

    /// Whole seconds recorded in the current (or last) take
    pub elapsed_seconds: u64,

    /// Timer as shown to the user, "m:ss"
    pub elapsed_display: String,

    /// Final transcript segments received so far
    pub transcript_segments: usize,

    /// Media chunks received so far
    pub media_chunks: usize,

    /// Negotiated recorder format
    pub mime_type: Option<String>,

    /// Size of the assembled recording, once stopped
    pub captured_bytes: Option<usize>,

    /// Whether a speech recognizer is attached
    pub speech_available: bool,
}

impl SessionStatus {
    pub fn idle(speech_available: bool) -> Self {
        Self {
            state: SessionState::Idle,
            elapsed_seconds: 0,
            elapsed_display: format_elapsed(0),
            transcript_segments: 0,
            media_chunks: 0,
            mime_type: None,
            captured_bytes: None,
            speech_available,
        }
    }
}

/// Format seconds as "m:ss"
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
