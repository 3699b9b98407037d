use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// One incremental result from the speech recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionEvent {
    /// Recognized text for this span of speech
    pub text: String,

    /// Settled output (true) or provisional interim result (false)
    pub is_final: bool,

    /// Confidence score (0.0 to 1.0), if available
    #[serde(default)]
    pub confidence: Option<f32>,

    /// When this event was received
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl RecognitionEvent {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence: None,
            received_at: Utc::now(),
        }
    }

    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence: None,
            received_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("speech recognition not allowed: {0}")]
    NotAllowed(String),
    #[error("speech recognizer failed to start: {0}")]
    Failed(String),
}

/// Streaming speech-to-text listener
#[async_trait]
pub trait SpeechRecognizer: Send {
    /// Start listening
    ///
    /// Returns a channel receiver that yields interim and final results.
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognitionEvent>, RecognitionError>;

    /// Stop listening
    ///
    /// Results produced before this returns must already be in the channel.
    /// Safe to call when not listening.
    async fn stop(&mut self);

    /// Recognizer name for logging
    fn name(&self) -> &str;
}

/// Whether the runtime offers speech recognition at all
pub enum SpeechCapability {
    Available(Box<dyn SpeechRecognizer>),
    Unavailable,
}

impl SpeechCapability {
    pub fn available(recognizer: impl SpeechRecognizer + 'static) -> Self {
        Self::Available(Box::new(recognizer))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn recognizer_mut(&mut self) -> Option<&mut (dyn SpeechRecognizer + 'static)> {
        match self {
            Self::Available(recognizer) => Some(recognizer.as_mut()),
            Self::Unavailable => None,
        }
    }
}

impl fmt::Debug for SpeechCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(recognizer) => write!(f, "Available({})", recognizer.name()),
            Self::Unavailable => write!(f, "Unavailable"),
        }
    }
}
