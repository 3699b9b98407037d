use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Question library
        .route("/questions", get(handlers::list_questions))
        .route("/questions/:question_id", get(handlers::get_question))
        // STAR drafts
        .route("/drafts", get(handlers::list_drafts))
        .route(
            "/drafts/:question_id",
            get(handlers::get_draft).put(handlers::save_draft),
        )
        // Attempt history and review
        .route("/attempts", get(handlers::list_attempts))
        .route("/attempts/:attempt_id", get(handlers::get_attempt))
        .route(
            "/attempts/:attempt_id/feedback",
            post(handlers::generate_feedback),
        )
        // Recording studio
        .route(
            "/studio/:question_id/sessions",
            post(handlers::open_session),
        )
        .route(
            "/sessions/:session_id",
            get(handlers::session_status).delete(handlers::close_session),
        )
        .route(
            "/sessions/:session_id/start",
            post(handlers::start_recording),
        )
        .route("/sessions/:session_id/chunks", post(handlers::push_chunk))
        .route("/sessions/:session_id/speech", post(handlers::push_speech))
        .route("/sessions/:session_id/stop", post(handlers::stop_recording))
        .route("/sessions/:session_id/media", get(handlers::get_media))
        .route(
            "/sessions/:session_id/submit",
            post(handlers::submit_recording),
        )
        // Request logging; the browser client runs on another origin
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
