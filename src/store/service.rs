use async_trait::async_trait;
use thiserror::Error;

use super::models::{Attempt, Draft, NewAttempt, Question, QuestionFilter, StarText};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("request to persistence service failed: {0}")]
    Request(String),

    #[error("persistence service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode persistence response: {0}")]
    Decode(String),
}

impl PersistenceError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Storage for questions, drafts, and attempts
///
/// Implementations:
/// - `SupabaseStore`: hosted PostgREST tables
/// - `MemoryStore`: in-process, for local runs and tests
#[async_trait]
pub trait PersistenceService: Send + Sync {
    /// Library listing, filtered and sorted by question number
    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, PersistenceError>;

    async fn get_question(&self, question_id: &str) -> Result<Question, PersistenceError>;

    async fn get_draft(&self, user_id: &str, question_id: &str) -> Result<Option<Draft>, PersistenceError>;

    /// The user's drafts, most recently updated first
    async fn list_drafts(&self, user_id: &str) -> Result<Vec<Draft>, PersistenceError>;

    /// Update the user's draft for the question, or create it
    async fn save_draft(
        &self,
        user_id: &str,
        question_id: &str,
        star: &StarText,
    ) -> Result<Draft, PersistenceError>;

    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, PersistenceError>;

    async fn get_attempt(&self, user_id: &str, attempt_id: &str) -> Result<Attempt, PersistenceError>;

    /// The user's attempts, newest first
    async fn list_attempts(&self, user_id: &str) -> Result<Vec<Attempt>, PersistenceError>;

    async fn update_attempt_feedback(
        &self,
        user_id: &str,
        attempt_id: &str,
        transcript: &str,
        feedback: &serde_json::Value,
    ) -> Result<(), PersistenceError>;
}
