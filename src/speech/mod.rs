//! Speech-to-text listener contract
//!
//! The recognizer runs alongside the media recorder and emits interim and
//! final results. Absence of a recognizer is a supported configuration, not
//! an error: see `SpeechCapability::Unavailable`.

mod recognizer;
mod remote;

pub use recognizer::{RecognitionError, RecognitionEvent, SpeechCapability, SpeechRecognizer};
pub use remote::RemoteRecognizer;
