//! HTTP API for the practice studio
//!
//! The browser owns the camera, microphone, and speech recognizer; it drives a
//! server-side recording session through these routes:
//! - POST /studio/:question_id/sessions - Open the recording screen
//! - POST /sessions/:id/start - Report device access and begin a take
//! - POST /sessions/:id/chunks, /speech - Stream media and recognition results
//! - POST /sessions/:id/stop, /submit - End the take, store it as an attempt
//! - DELETE /sessions/:id - Leave the screen
//!
//! Library, draft, history, and review routes read and write the store
//! directly. Callers identify themselves with the `x-user-id` header.

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, OpenSessionResponse, SubmitResponse, USER_HEADER};
pub use routes::create_router;
pub use state::{AppState, StudioSession};
