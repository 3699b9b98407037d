use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::event_loop::{LiveCounters, LoopCommand, LoopOutput, RecordingLoop};
use super::state::{format_elapsed, SessionState, SessionStatus};
use super::timer::TickSource;
use super::transcript::TranscriptBuffer;
use crate::capture::{
    negotiate_mime_type, CaptureError, CaptureProvider, CapturedMedia, MediaStream,
    FALLBACK_MIME_TYPE,
};
use crate::speech::SpeechCapability;
use crate::store::{Attempt, NewAttempt, PersistenceError, PersistenceService};

/// Failures reported by the recording controller
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("camera/microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("capture device error: {0}")]
    DeviceError(String),

    #[error("failed to submit recording: {0}")]
    SubmissionFailed(#[source] PersistenceError),

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("recording session already submitted")]
    Closed,
}

impl RecordingError {
    /// Stable identifier for API clients
    pub fn kind(&self) -> &'static str {
        match self {
            RecordingError::PermissionDenied(_) => "permission_denied",
            RecordingError::DeviceError(_) => "device_error",
            RecordingError::SubmissionFailed(_) => "submission_failed",
            RecordingError::InvalidState { .. } => "invalid_state",
            RecordingError::Closed => "closed",
        }
    }
}

impl From<CaptureError> for RecordingError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied(msg) => RecordingError::PermissionDenied(msg),
            CaptureError::Device(msg) => RecordingError::DeviceError(msg),
        }
    }
}

/// Who and what a submitted attempt belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptContext {
    pub user_id: String,
    pub question_id: String,
    pub draft_id: Option<String>,
}

/// Result of a successful submission
#[derive(Debug, Clone)]
pub struct Submission {
    pub attempt: Attempt,
    /// The recording, handed to the caller for playback or archival
    pub media: CapturedMedia,
}

struct ActiveTake {
    stream: Box<dyn MediaStream>,
    commands: mpsc::Sender<LoopCommand>,
    task: JoinHandle<LoopOutput>,
}

/// Drives one recording screen: acquire → record → stop → (re-record | submit)
pub struct RecordingController {
    /// User, question, and draft the submitted attempt belongs to
    context: AttemptContext,

    /// Camera/microphone source
    capture: Arc<dyn CaptureProvider>,

    /// Speech recognizer, if the platform has one
    speech: SpeechCapability,

    /// Timer source; one sequence per take
    ticks: Arc<dyn TickSource>,

    /// Where submitted attempts are written
    store: Arc<dyn PersistenceService>,

    config: SessionConfig,

    /// Current lifecycle state
    state: SessionState,

    /// Elapsed seconds and received counts, shared with the take's loop task
    counters: Arc<LiveCounters>,

    /// Stream, command channel, and loop task of the take in progress
    active: Option<ActiveTake>,

    /// Final segments of the last completed take
    transcript: TranscriptBuffer,

    /// Recorder format negotiated at start
    mime_type: Option<String>,

    /// Assembled recording of the last completed take, until submitted
    captured: Option<CapturedMedia>,

    /// Publishes a status snapshot on every state change
    status_tx: watch::Sender<SessionStatus>,
}

impl RecordingController {
    pub fn new(
        context: AttemptContext,
        capture: Arc<dyn CaptureProvider>,
        speech: SpeechCapability,
        ticks: Arc<dyn TickSource>,
        store: Arc<dyn PersistenceService>,
        config: SessionConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::idle(speech.is_available()));

        debug!(
            "Recording controller for question {} (capture={}, speech={:?})",
            context.question_id,
            capture.name(),
            speech
        );

        Self {
            context,
            capture,
            speech,
            ticks,
            store,
            config,
            state: SessionState::Idle,
            counters: Arc::new(LiveCounters::default()),
            active: None,
            transcript: TranscriptBuffer::new(),
            mime_type: None,
            captured: None,
            status_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &AttemptContext {
        &self.context
    }

    /// The counter behind both the displayed timer and the stored duration
    pub fn elapsed_seconds(&self) -> u64 {
        self.counters.elapsed_seconds()
    }

    /// Final segments of the last completed take
    pub fn transcript(&self) -> &TranscriptBuffer {
        &self.transcript
    }

    /// The last completed take, available for playback while stopped
    pub fn captured_media(&self) -> Option<&CapturedMedia> {
        self.captured.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        let elapsed = self.elapsed_seconds();
        SessionStatus {
            state: self.state,
            elapsed_seconds: elapsed,
            elapsed_display: format_elapsed(elapsed),
            transcript_segments: self.counters.transcript_segments(),
            media_chunks: self.counters.media_chunks(),
            mime_type: self.mime_type.clone(),
            captured_bytes: self.captured.as_ref().map(CapturedMedia::len),
            speech_available: self.speech.is_available(),
        }
    }

    /// Status updates published on every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Begin a take (or re-record from `Stopped`)
    pub async fn start(&mut self) -> Result<(), RecordingError> {
        let resume = match self.state {
            SessionState::Idle | SessionState::Stopped => self.state,
            SessionState::Submitted => return Err(RecordingError::Closed),
            state => {
                return Err(RecordingError::InvalidState {
                    operation: "start",
                    state,
                })
            }
        };

        self.set_state(SessionState::Acquiring);
        info!("Requesting camera/microphone for question {}", self.context.question_id);

        let mut stream = match self.capture.acquire(&self.config.capture_request()).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Capture acquisition failed: {}", e);
                self.set_state(resume);
                return Err(e.into());
            }
        };

        let mime_type = negotiate_mime_type(stream.as_ref(), &self.config.codec_preferences);
        let chunk_rx = match stream.start(&mime_type).await {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Capture failed to start ({}): {}", mime_type, e);
                stream.release();
                self.set_state(resume);
                return Err(e.into());
            }
        };

        // Hardware is ours: the previous take is discarded from here on
        self.transcript.clear();
        self.captured = None;
        self.counters.reset();
        self.mime_type = Some(mime_type.clone());

        let speech_rx = match self.speech.recognizer_mut() {
            Some(recognizer) => match recognizer.start().await {
                Ok(rx) => Some(rx),
                Err(e) => {
                    warn!("Speech recognizer unavailable for this take: {}", e);
                    None
                }
            },
            None => {
                debug!("No speech recognizer; recording without transcript");
                None
            }
        };

        let (command_tx, command_rx) = mpsc::channel(4);
        let task = tokio::spawn(
            RecordingLoop {
                chunks: chunk_rx,
                speech: speech_rx,
                ticks: self.ticks.start(),
                commands: command_rx,
                counters: Arc::clone(&self.counters),
            }
            .run(),
        );

        self.active = Some(ActiveTake {
            stream,
            commands: command_tx,
            task,
        });
        self.set_state(SessionState::Recording);

        info!("Recording started ({})", mime_type);
        Ok(())
    }

    /// End the take; a no-op unless recording
    pub async fn stop(&mut self) -> Result<(), RecordingError> {
        if self.state != SessionState::Recording {
            debug!("Stop ignored while {}", self.state);
            return Ok(());
        }

        let Some(mut take) = self.active.take() else {
            self.set_state(SessionState::Stopped);
            return Ok(());
        };

        // Freeze the timer before waiting on devices so shutdown time is not counted
        let _ = take.commands.send(LoopCommand::FreezeTimer).await;

        let recognizer = self.speech.recognizer_mut();
        let (capture_result, ()) = futures::join!(take.stream.stop(), async move {
            if let Some(recognizer) = recognizer {
                recognizer.stop().await;
            }
        });
        if let Err(e) = capture_result {
            // Device may already be gone (unplugged, revoked); chunks so far still count
            warn!("Capture device did not stop cleanly: {}", e);
        }

        let _ = take.commands.send(LoopCommand::Finish).await;
        let output = match take.task.await {
            Ok(output) => output,
            Err(e) => {
                error!("Recording loop failed: {}", e);
                LoopOutput::default()
            }
        };

        take.stream.release();

        let mime_type = self
            .mime_type
            .clone()
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());
        let media = CapturedMedia::assemble(&output.chunks, &mime_type);

        info!(
            "Recording stopped: {}s, {} bytes, {} transcript segments",
            self.elapsed_seconds(),
            media.len(),
            output.transcript.len()
        );

        self.transcript = output.transcript;
        self.captured = Some(media);
        self.set_state(SessionState::Stopped);
        Ok(())
    }

    /// Store the last take as an attempt
    pub async fn submit(&mut self) -> Result<Submission, RecordingError> {
        match self.state {
            SessionState::Stopped => {}
            SessionState::Submitted => return Err(RecordingError::Closed),
            state => {
                return Err(RecordingError::InvalidState {
                    operation: "submit",
                    state,
                })
            }
        }

        let Some(media) = self.captured.clone() else {
            return Err(RecordingError::InvalidState {
                operation: "submit",
                state: self.state,
            });
        };

        self.set_state(SessionState::Submitting);

        let attempt = NewAttempt {
            user_id: self.context.user_id.clone(),
            question_id: self.context.question_id.clone(),
            draft_id: self.context.draft_id.clone(),
            duration: self.elapsed_seconds(),
            transcript: self.transcript.persisted_text(),
            feedback: None,
        };

        match self.store.create_attempt(&attempt).await {
            Ok(attempt) => {
                info!(
                    "Submitted attempt {} ({}s) for question {}",
                    attempt.id, attempt.duration, attempt.question_id
                );
                self.captured = None;
                self.transcript.clear();
                self.set_state(SessionState::Submitted);
                Ok(Submission { attempt, media })
            }
            Err(e) => {
                error!("Failed to submit recording: {}", e);
                self.set_state(SessionState::Stopped);
                Err(RecordingError::SubmissionFailed(e))
            }
        }
    }

    /// Leave the screen: stop any take and drop everything held
    pub async fn close(&mut self) {
        if self.state == SessionState::Recording {
            // stop() only fails outside Recording, which we just ruled out
            let _ = self.stop().await;
        }

        self.abort_take();
        self.captured = None;
        self.transcript.clear();

        if self.state != SessionState::Submitted {
            self.set_state(SessionState::Idle);
        }
    }

    fn abort_take(&mut self) {
        if let Some(mut take) = self.active.take() {
            take.task.abort();
            take.stream.release();
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("Session state: {} -> {}", self.state, state);
        }
        self.state = state;
        self.status_tx.send_replace(self.status());
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        self.abort_take();
    }
}
