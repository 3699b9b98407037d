// Test doubles for the recording controller's providers
//
// Every fake hands its receiving side to the controller and keeps the sending
// side here, so tests decide exactly which chunks, results, and ticks arrive
// before stop().

#![allow(dead_code)]

use async_trait::async_trait;
use star_studio::capture::{CaptureError, CaptureProvider, CaptureRequest, MediaChunk, MediaStream};
use star_studio::feedback::{Feedback, FeedbackError, FeedbackGenerator, FeedbackRequest};
use star_studio::session::{AttemptContext, RecordingController, SessionConfig, TickSource};
use star_studio::speech::{RecognitionError, RecognitionEvent, SpeechCapability, SpeechRecognizer};
use star_studio::store::{
    Attempt, Draft, MemoryStore, NewAttempt, PersistenceError, PersistenceService, Question,
    QuestionFilter, StarText,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const USER: &str = "user-1";
pub const QUESTION: &str = "q-001";

// ============================================================================
// Capture
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
    Broken,
}

struct CaptureState {
    access: Access,
    supported: Vec<String>,
    sender: Option<mpsc::Sender<MediaChunk>>,
    live_streams: usize,
    acquisitions: usize,
    started_mime: Option<String>,
    unplugged: bool,
}

#[derive(Clone)]
pub struct FakeCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl FakeCapture {
    pub fn new(access: Access) -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState {
                access,
                supported: Vec::new(),
                sender: None,
                live_streams: 0,
                acquisitions: 0,
                started_mime: None,
                unplugged: false,
            })),
        }
    }

    pub fn granted() -> Self {
        Self::new(Access::Granted)
    }

    pub fn denied() -> Self {
        Self::new(Access::Denied)
    }

    /// Only these MIME types are recordable (empty = all)
    pub fn supporting(self, types: &[&str]) -> Self {
        self.state.lock().unwrap().supported = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn set_access(&self, access: Access) {
        self.state.lock().unwrap().access = access;
    }

    pub async fn push(&self, data: &[u8]) {
        let sender = self.state.lock().unwrap().sender.clone();
        if let Some(sender) = sender {
            sender.send(MediaChunk::new(data.to_vec())).await.unwrap();
        }
    }

    /// The device disappears mid-take: the stream ends and stop() errors
    pub fn unplug(&self) {
        let mut state = self.state.lock().unwrap();
        state.sender = None;
        state.unplugged = true;
    }

    pub fn live_streams(&self) -> usize {
        self.state.lock().unwrap().live_streams
    }

    pub fn acquisitions(&self) -> usize {
        self.state.lock().unwrap().acquisitions
    }

    pub fn started_mime(&self) -> Option<String> {
        self.state.lock().unwrap().started_mime.clone()
    }
}

#[async_trait]
impl CaptureProvider for FakeCapture {
    async fn acquire(&self, _request: &CaptureRequest) -> Result<Box<dyn MediaStream>, CaptureError> {
        let mut state = self.state.lock().unwrap();
        state.acquisitions += 1;
        match state.access {
            Access::Granted => {
                state.live_streams += 1;
                state.unplugged = false;
                Ok(Box::new(FakeStream {
                    state: Arc::clone(&self.state),
                    released: false,
                }))
            }
            Access::Denied => Err(CaptureError::PermissionDenied("NotAllowedError".to_string())),
            Access::Broken => Err(CaptureError::Device("NotReadableError".to_string())),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeStream {
    state: Arc<Mutex<CaptureState>>,
    released: bool,
}

#[async_trait]
impl MediaStream for FakeStream {
    fn supports_mime_type(&self, mime_type: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.supported.is_empty() || state.supported.iter().any(|t| t == mime_type)
    }

    async fn start(&mut self, mime_type: &str) -> Result<mpsc::Receiver<MediaChunk>, CaptureError> {
        let (tx, rx) = mpsc::channel(64);
        let mut state = self.state.lock().unwrap();
        state.sender = Some(tx);
        state.started_mime = Some(mime_type.to_string());
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        let mut state = self.state.lock().unwrap();
        state.sender = None;
        if state.unplugged {
            return Err(CaptureError::Device("device disconnected".to_string()));
        }
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            let mut state = self.state.lock().unwrap();
            state.sender = None;
            state.live_streams -= 1;
        }
    }

    fn is_capturing(&self) -> bool {
        self.state.lock().unwrap().sender.is_some()
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Speech
// ============================================================================

#[derive(Default)]
struct RecognizerState {
    sender: Option<mpsc::Sender<RecognitionEvent>>,
    starts: usize,
    stops: usize,
    refuse: bool,
}

#[derive(Clone, Default)]
pub struct FakeRecognizer {
    state: Arc<Mutex<RecognizerState>>,
}

impl FakeRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// start() fails as a browser does when speech permission is refused
    pub fn refusing() -> Self {
        let recognizer = Self::default();
        recognizer.state.lock().unwrap().refuse = true;
        recognizer
    }

    pub async fn say(&self, text: &str) {
        self.send(RecognitionEvent::final_text(text)).await;
    }

    pub async fn hear_interim(&self, text: &str) {
        self.send(RecognitionEvent::interim(text)).await;
    }

    async fn send(&self, event: RecognitionEvent) {
        let sender = self.state.lock().unwrap().sender.clone();
        if let Some(sender) = sender {
            sender.send(event).await.unwrap();
        }
    }

    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognitionEvent>, RecognitionError> {
        let mut state = self.state.lock().unwrap();
        state.starts += 1;
        if state.refuse {
            return Err(RecognitionError::NotAllowed("not-allowed".to_string()));
        }
        let (tx, rx) = mpsc::channel(64);
        state.sender = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.stops += 1;
        state.sender = None;
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Timer
// ============================================================================

/// Ticks only when the test says so
#[derive(Clone, Default)]
pub struct ManualTicks {
    sender: Arc<Mutex<Option<mpsc::Sender<()>>>>,
}

impl ManualTicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `n` ticks; ignored once the timer is frozen
    pub async fn tick(&self, n: usize) {
        let sender = self.sender.lock().unwrap().clone();
        if let Some(sender) = sender {
            for _ in 0..n {
                if sender.send(()).await.is_err() {
                    break;
                }
            }
        }
    }
}

impl TickSource for ManualTicks {
    fn start(&self) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(256);
        *self.sender.lock().unwrap() = Some(tx);
        rx
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Memory store whose next `create_attempt` calls can be made to fail
pub struct FlakyStore {
    pub inner: Arc<MemoryStore>,
    failures: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryStore::seeded()),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl PersistenceService for FlakyStore {
    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, PersistenceError> {
        self.inner.list_questions(filter).await
    }

    async fn get_question(&self, question_id: &str) -> Result<Question, PersistenceError> {
        self.inner.get_question(question_id).await
    }

    async fn get_draft(&self, user_id: &str, question_id: &str) -> Result<Option<Draft>, PersistenceError> {
        self.inner.get_draft(user_id, question_id).await
    }

    async fn list_drafts(&self, user_id: &str) -> Result<Vec<Draft>, PersistenceError> {
        self.inner.list_drafts(user_id).await
    }

    async fn save_draft(
        &self,
        user_id: &str,
        question_id: &str,
        star: &StarText,
    ) -> Result<Draft, PersistenceError> {
        self.inner.save_draft(user_id, question_id, star).await
    }

    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, PersistenceError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PersistenceError::Request("connection reset".to_string()));
        }
        self.inner.create_attempt(attempt).await
    }

    async fn get_attempt(&self, user_id: &str, attempt_id: &str) -> Result<Attempt, PersistenceError> {
        self.inner.get_attempt(user_id, attempt_id).await
    }

    async fn list_attempts(&self, user_id: &str) -> Result<Vec<Attempt>, PersistenceError> {
        self.inner.list_attempts(user_id).await
    }

    async fn update_attempt_feedback(
        &self,
        user_id: &str,
        attempt_id: &str,
        transcript: &str,
        feedback: &serde_json::Value,
    ) -> Result<(), PersistenceError> {
        self.inner
            .update_attempt_feedback(user_id, attempt_id, transcript, feedback)
            .await
    }
}

// ============================================================================
// Feedback
// ============================================================================

/// Generator returning a canned answer, or failing, and counting calls
pub struct ScriptedGenerator {
    reply: Option<Feedback>,
    calls: AtomicUsize,
    last_request: Mutex<Option<FeedbackRequest>>,
}

impl ScriptedGenerator {
    pub fn replying(feedback: Feedback) -> Self {
        Self {
            reply: Some(feedback),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<FeedbackRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedbackGenerator for ScriptedGenerator {
    async fn generate(&self, request: &FeedbackRequest) -> Result<Feedback, FeedbackError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.reply.clone().ok_or_else(|| FeedbackError::Api {
            status: 503,
            message: "model overloaded".to_string(),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Assembly
// ============================================================================

pub fn context() -> AttemptContext {
    AttemptContext {
        user_id: USER.to_string(),
        question_id: QUESTION.to_string(),
        draft_id: None,
    }
}

pub struct Rig {
    pub controller: RecordingController,
    pub capture: FakeCapture,
    pub speech: FakeRecognizer,
    pub ticks: ManualTicks,
    pub store: Arc<FlakyStore>,
}

pub fn rig_with(capture: FakeCapture, speech: Option<FakeRecognizer>) -> Rig {
    let recognizer = speech.clone().unwrap_or_default();
    let capability = match speech {
        Some(speech) => SpeechCapability::available(speech),
        None => SpeechCapability::Unavailable,
    };
    let ticks = ManualTicks::new();
    let store = Arc::new(FlakyStore::new());

    let controller = RecordingController::new(
        context(),
        Arc::new(capture.clone()),
        capability,
        Arc::new(ticks.clone()),
        Arc::clone(&store) as Arc<dyn PersistenceService>,
        SessionConfig::default(),
    );

    Rig {
        controller,
        capture,
        speech: recognizer,
        ticks,
        store,
    }
}

pub fn rig() -> Rig {
    rig_with(FakeCapture::granted(), Some(FakeRecognizer::new()))
}
