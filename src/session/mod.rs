//! Recording session management
//!
//! This module provides the `RecordingController` that manages:
//! - Camera/microphone acquisition and release
//! - Concurrent media capture, speech recognition, and the elapsed timer
//! - Assembly of the recorded media and final transcript on stop
//! - Submission of the take as an attempt record

mod config;
mod controller;
mod event_loop;
mod state;
mod timer;
mod transcript;

pub use config::SessionConfig;
pub use controller::{AttemptContext, RecordingController, RecordingError, Submission};
pub use event_loop::LiveCounters;
pub use state::{format_elapsed, SessionState, SessionStatus};
pub use timer::{IntervalTicks, TickSource};
pub use transcript::{TranscriptBuffer, NO_TRANSCRIPT};
