use super::state::{AppState, StudioSession};
use crate::capture::{DeviceReport, FeedError};
use crate::feedback::{ReviewOutcome, ReviewRequest};
use crate::session::{RecordingError, SessionStatus};
use crate::speech::RecognitionEvent;
use crate::store::{Attempt, Draft, PersistenceError, Question, QuestionFilter, StarText};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Header carrying the caller's user id; authentication happens upstream
pub const USER_HEADER: &str = "x-user-id";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    /// Whether the client can run speech recognition
    #[serde(default)]
    pub speech_available: bool,
}

#[derive(Debug, Serialize)]
pub struct OpenSessionResponse {
    pub session_id: Uuid,
    pub question: Question,
    pub draft: Option<Draft>,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub attempt: Attempt,
    pub media_bytes: usize,
    pub mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Recording(RecordingError),
    Persistence(PersistenceError),
    Feed(FeedError),
    SessionNotFound(Uuid),
    NoMedia,
    MissingUser,
}

impl From<RecordingError> for ApiError {
    fn from(err: RecordingError) -> Self {
        ApiError::Recording(err)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        ApiError::Persistence(err)
    }
}

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        ApiError::Feed(err)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Recording(err) => {
                let status = match err {
                    RecordingError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                    RecordingError::DeviceError(_) => StatusCode::SERVICE_UNAVAILABLE,
                    RecordingError::SubmissionFailed(_) => StatusCode::BAD_GATEWAY,
                    RecordingError::InvalidState { .. } => StatusCode::CONFLICT,
                    RecordingError::Closed => StatusCode::GONE,
                };
                (status, err.kind())
            }
            ApiError::Persistence(PersistenceError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error"),
            ApiError::Feed(_) => (StatusCode::CONFLICT, "not_recording"),
            ApiError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            ApiError::NoMedia => (StatusCode::NOT_FOUND, "no_media"),
            ApiError::MissingUser => (StatusCode::UNAUTHORIZED, "missing_user"),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Recording(err) => err.to_string(),
            ApiError::Persistence(err) => err.to_string(),
            ApiError::Feed(err) => err.to_string(),
            ApiError::SessionNotFound(id) => format!("session {} not found", id),
            ApiError::NoMedia => "no recording available for playback".to_string(),
            ApiError::MissingUser => format!("missing {} header", USER_HEADER),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = self.message();

        if status.is_server_error() {
            error!("{} ({})", message, kind);
        } else {
            warn!("{} ({})", message, kind);
        }

        (
            status,
            Json(ErrorResponse {
                error: message,
                kind: kind.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// Caller identity from `x-user-id`
#[derive(Debug, Clone)]
pub struct UserId(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| UserId(value.to_string()))
            .ok_or(ApiError::MissingUser)
    }
}

async fn find_session(
    state: &AppState,
    user: &UserId,
    session_id: Uuid,
) -> Result<Arc<StudioSession>, ApiError> {
    let sessions = state.sessions.read().await;
    sessions
        .get(&session_id)
        .filter(|session| session.user_id == user.0)
        .cloned()
        .ok_or(ApiError::SessionNotFound(session_id))
}

async fn remove_session(state: &AppState, session_id: Uuid) -> Option<Arc<StudioSession>> {
    state.sessions.write().await.remove(&session_id)
}

// ============================================================================
// Library, drafts, history
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /questions
pub async fn list_questions(
    State(state): State<AppState>,
    Query(filter): Query<QuestionFilter>,
) -> Result<Json<Vec<Question>>, ApiError> {
    Ok(Json(state.store.list_questions(&filter).await?))
}

/// GET /questions/:question_id
pub async fn get_question(
    State(state): State<AppState>,
    Path(question_id): Path<String>,
) -> Result<Json<Question>, ApiError> {
    Ok(Json(state.store.get_question(&question_id).await?))
}

/// GET /drafts
pub async fn list_drafts(
    State(state): State<AppState>,
    user: UserId,
) -> Result<Json<Vec<Draft>>, ApiError> {
    Ok(Json(state.store.list_drafts(&user.0).await?))
}

/// GET /drafts/:question_id
pub async fn get_draft(
    State(state): State<AppState>,
    user: UserId,
    Path(question_id): Path<String>,
) -> Result<Json<Draft>, ApiError> {
    state
        .store
        .get_draft(&user.0, &question_id)
        .await?
        .map(Json)
        .ok_or_else(|| PersistenceError::not_found("draft", question_id).into())
}

/// PUT /drafts/:question_id
pub async fn save_draft(
    State(state): State<AppState>,
    user: UserId,
    Path(question_id): Path<String>,
    Json(star): Json<StarText>,
) -> Result<Json<Draft>, ApiError> {
    // Drafts only exist for real questions
    state.store.get_question(&question_id).await?;
    let draft = state.store.save_draft(&user.0, &question_id, &star).await?;
    info!("Saved draft {} for question {}", draft.id, question_id);
    Ok(Json(draft))
}

/// GET /attempts
pub async fn list_attempts(
    State(state): State<AppState>,
    user: UserId,
) -> Result<Json<Vec<Attempt>>, ApiError> {
    Ok(Json(state.store.list_attempts(&user.0).await?))
}

/// GET /attempts/:attempt_id
pub async fn get_attempt(
    State(state): State<AppState>,
    user: UserId,
    Path(attempt_id): Path<String>,
) -> Result<Json<Attempt>, ApiError> {
    Ok(Json(state.store.get_attempt(&user.0, &attempt_id).await?))
}

/// POST /attempts/:attempt_id/feedback
/// Generate (or return existing) feedback for an attempt
pub async fn generate_feedback(
    State(state): State<AppState>,
    user: UserId,
    Path(attempt_id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ReviewOutcome>, ApiError> {
    let outcome = state
        .review
        .generate_feedback(&user.0, &attempt_id, request)
        .await?;
    Ok(Json(outcome))
}

// ============================================================================
// Recording studio
// ============================================================================

/// POST /studio/:question_id/sessions
/// Open the recording screen for a question
pub async fn open_session(
    State(state): State<AppState>,
    user: UserId,
    Path(question_id): Path<String>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<OpenSessionResponse>), ApiError> {
    let question = state.store.get_question(&question_id).await?;
    let draft = state.store.get_draft(&user.0, &question_id).await?;

    let session = Arc::new(StudioSession::open(
        &user.0,
        question,
        draft,
        req.speech_available,
        &state,
    ));

    let response = OpenSessionResponse {
        session_id: session.id,
        question: session.question.clone(),
        draft: session.draft.clone(),
        status: session.status(),
    };

    state
        .sessions
        .write()
        .await
        .insert(session.id, Arc::clone(&session));

    info!(
        "Opened session {} for question {} (speech={})",
        session.id, question_id, req.speech_available
    );

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /sessions/:session_id
pub async fn session_status(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionStatus>, ApiError> {
    let session = find_session(&state, &user, session_id).await?;
    Ok(Json(session.status()))
}

/// POST /sessions/:session_id/start
/// Begin a take with the client's camera/microphone outcome
pub async fn start_recording(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<Uuid>,
    Json(report): Json<DeviceReport>,
) -> Result<Json<SessionStatus>, ApiError> {
    let session = find_session(&state, &user, session_id).await?;

    let mut controller = session.controller.lock().await;
    session.capture.report(report);
    controller.start().await?;

    info!("Session {} recording", session_id);
    Ok(Json(controller.status()))
}

/// POST /sessions/:session_id/chunks
/// One encoded media chunk, as raw bytes
pub async fn push_chunk(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<Uuid>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let session = find_session(&state, &user, session_id).await?;
    session.capture.push(body.to_vec()).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /sessions/:session_id/speech
/// One recognition result (interim or final)
pub async fn push_speech(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<Uuid>,
    Json(event): Json<RecognitionEvent>,
) -> Result<StatusCode, ApiError> {
    let session = find_session(&state, &user, session_id).await?;
    let recognizer = session.speech.as_ref().ok_or(FeedError::NotListening)?;
    recognizer.push(event).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /sessions/:session_id/stop
pub async fn stop_recording(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionStatus>, ApiError> {
    let session = find_session(&state, &user, session_id).await?;

    let mut controller = session.controller.lock().await;
    controller.stop().await?;
    Ok(Json(controller.status()))
}

/// GET /sessions/:session_id/media
/// The last completed take, for playback
pub async fn get_media(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let session = find_session(&state, &user, session_id).await?;

    let controller = session.controller.lock().await;
    let media = controller.captured_media().ok_or(ApiError::NoMedia)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, media.mime_type().to_string())],
        media.bytes().to_vec(),
    )
        .into_response())
}

/// POST /sessions/:session_id/submit
/// Store the take as an attempt and close the screen
pub async fn submit_recording(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<Uuid>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let session = find_session(&state, &user, session_id).await?;

    let submission = {
        let mut controller = session.controller.lock().await;
        controller.submit().await?
    };
    remove_session(&state, session_id).await;

    if let Some(dir) = &state.recording.media_dir {
        match submission.media.save_to(dir, &submission.attempt.id) {
            Ok(path) => info!("Saved recording to {}", path.display()),
            Err(e) => error!("Failed to save recording for {}: {:#}", submission.attempt.id, e),
        }
    }

    info!(
        "Session {} submitted as attempt {}",
        session_id, submission.attempt.id
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            media_bytes: submission.media.len(),
            mime_type: submission.media.mime_type().to_string(),
            attempt: submission.attempt,
        }),
    ))
}

/// DELETE /sessions/:session_id
/// Leave the recording screen, releasing the devices
pub async fn close_session(
    State(state): State<AppState>,
    user: UserId,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    find_session(&state, &user, session_id).await?;
    let Some(session) = remove_session(&state, session_id).await else {
        return Err(ApiError::SessionNotFound(session_id));
    };

    session.controller.lock().await.close().await;
    info!("Closed session {}", session_id);
    Ok(StatusCode::NO_CONTENT)
}
