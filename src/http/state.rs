use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use uuid::Uuid;

use crate::capture::RemoteCapture;
use crate::feedback::ReviewService;
use crate::session::{
    AttemptContext, IntervalTicks, RecordingController, SessionConfig, SessionStatus, TickSource,
};
use crate::speech::{RemoteRecognizer, SpeechCapability};
use crate::store::{Draft, PersistenceService, Question};

/// One open recording screen
pub struct StudioSession {
    pub id: Uuid,
    pub user_id: String,
    pub question: Question,
    pub draft: Option<Draft>,

    /// Client-side feeds into the controller's providers
    pub capture: RemoteCapture,
    pub speech: Option<RemoteRecognizer>,

    pub controller: Mutex<RecordingController>,
    status: watch::Receiver<SessionStatus>,
}

impl StudioSession {
    pub fn open(
        user_id: &str,
        question: Question,
        draft: Option<Draft>,
        speech_available: bool,
        state: &AppState,
    ) -> Self {
        let capture = RemoteCapture::new(state.recording.feed_buffer);
        let speech = speech_available.then(|| RemoteRecognizer::new(state.recording.feed_buffer));
        let capability = match &speech {
            Some(recognizer) => SpeechCapability::available(recognizer.clone()),
            None => SpeechCapability::Unavailable,
        };

        let context = AttemptContext {
            user_id: user_id.to_string(),
            question_id: question.id.clone(),
            draft_id: draft.as_ref().map(|d| d.id.clone()),
        };

        let controller = RecordingController::new(
            context,
            Arc::new(capture.clone()),
            capability,
            Arc::clone(&state.ticks),
            Arc::clone(&state.store),
            state.recording.clone(),
        );
        let status = controller.subscribe();

        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            question,
            draft,
            capture,
            speech,
            controller: Mutex::new(controller),
            status,
        }
    }

    /// Live status; falls back to the last published snapshot while an
    /// operation holds the controller
    pub fn status(&self) -> SessionStatus {
        match self.controller.try_lock() {
            Ok(controller) => controller.status(),
            Err(_) => self.status.borrow().clone(),
        }
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Open recording screens (session id → session)
    ///
    /// Entries leave only on submit or DELETE. Takes have no time limit, so a
    /// client that disappears mid-take keeps its session until it is closed.
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<StudioSession>>>>,
    pub store: Arc<dyn PersistenceService>,
    pub review: Arc<ReviewService>,
    pub recording: SessionConfig,
    pub ticks: Arc<dyn TickSource>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PersistenceService>,
        review: Arc<ReviewService>,
        recording: SessionConfig,
    ) -> Self {
        let ticks = Arc::new(IntervalTicks::new(recording.tick_interval()));
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            review,
            recording,
            ticks,
        }
    }

    /// Replace the timer source shared by new sessions
    pub fn with_ticks(mut self, ticks: Arc<dyn TickSource>) -> Self {
        self.ticks = ticks;
        self
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
