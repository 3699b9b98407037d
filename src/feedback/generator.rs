use async_trait::async_trait;
use thiserror::Error;

use super::models::{Feedback, FeedbackRequest};

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("feedback API key not configured; set {0}")]
    MissingApiKey(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("feedback API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse feedback: {0}")]
    Parse(String),
}

/// Produces coaching feedback for a spoken response
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn generate(&self, request: &FeedbackRequest) -> Result<Feedback, FeedbackError>;

    fn name(&self) -> &str;
}
