use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::generator::FeedbackGenerator;
use super::models::{Feedback, FeedbackRequest, ReviewOutcome};
use crate::session::NO_TRANSCRIPT;
use crate::store::{PersistenceError, PersistenceService, StarText};

/// What the review screen already knows; anything missing is looked up
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub question_title: Option<String>,
    #[serde(default)]
    pub draft: Option<StarText>,
}

/// Generates feedback for stored attempts, once per attempt
pub struct ReviewService {
    store: Arc<dyn PersistenceService>,
    generator: Arc<dyn FeedbackGenerator>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn PersistenceService>, generator: Arc<dyn FeedbackGenerator>) -> Self {
        Self { store, generator }
    }

    pub async fn generate_feedback(
        &self,
        user_id: &str,
        attempt_id: &str,
        request: ReviewRequest,
    ) -> Result<ReviewOutcome, PersistenceError> {
        let attempt = self.store.get_attempt(user_id, attempt_id).await?;
        let transcript = attempt
            .transcript
            .clone()
            .unwrap_or_else(|| NO_TRANSCRIPT.to_string());

        if let Some(existing) = &attempt.feedback {
            match serde_json::from_value::<Feedback>(existing.clone()) {
                Ok(feedback) => {
                    info!("Attempt {} already reviewed", attempt_id);
                    return Ok(ReviewOutcome {
                        transcript,
                        feedback,
                    });
                }
                Err(e) => warn!("Stored feedback for {} is unreadable, regenerating: {}", attempt_id, e),
            }
        }

        let question_title = match request.question_title {
            Some(title) => title,
            None => self.store.get_question(&attempt.question_id).await?.title,
        };

        let draft = match request.draft {
            Some(draft) => Some(draft),
            None => self
                .store
                .get_draft(user_id, &attempt.question_id)
                .await?
                .map(|draft| draft.star()),
        };

        let feedback = match self
            .generator
            .generate(&FeedbackRequest {
                question_title,
                transcript: transcript.clone(),
                draft,
            })
            .await
        {
            Ok(feedback) => feedback,
            Err(e) => {
                warn!(
                    "Feedback generation via {} failed for attempt {}, using fallback: {}",
                    self.generator.name(),
                    attempt_id,
                    e
                );
                Feedback::fallback()
            }
        };

        let value =
            serde_json::to_value(&feedback).map_err(|e| PersistenceError::Decode(e.to_string()))?;
        self.store
            .update_attempt_feedback(user_id, attempt_id, &transcript, &value)
            .await?;

        info!("Stored feedback for attempt {}", attempt_id);
        Ok(ReviewOutcome {
            transcript,
            feedback,
        })
    }
}
