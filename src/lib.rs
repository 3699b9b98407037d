pub mod capture;
pub mod config;
pub mod feedback;
pub mod http;
pub mod session;
pub mod speech;
pub mod store;

pub use capture::{CaptureProvider, CapturedMedia, DeviceReport, MediaChunk, MediaStream, RemoteCapture};
pub use config::Config;
pub use feedback::{Feedback, FeedbackGenerator, OpenAiFeedback, ReviewService};
pub use http::{create_router, AppState};
pub use session::{
    AttemptContext, RecordingController, RecordingError, SessionConfig, SessionState,
    SessionStatus,
};
pub use speech::{RecognitionEvent, RemoteRecognizer, SpeechCapability, SpeechRecognizer};
pub use store::{MemoryStore, PersistenceService, SupabaseStore};
