use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use super::models::{Attempt, Draft, NewAttempt, Question, QuestionFilter, StarText};
use super::service::{PersistenceError, PersistenceService};

#[derive(Default)]
struct Tables {
    questions: Vec<Question>,
    drafts: Vec<Draft>,
    attempts: Vec<Attempt>,
}

/// In-process store
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_questions(Vec::new())
    }

    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                questions,
                ..Default::default()
            }),
        }
    }

    /// Store pre-loaded with a small starter library
    pub fn seeded() -> Self {
        let questions = starter_questions();
        info!("Memory store seeded with {} questions", questions.len());
        Self::with_questions(questions)
    }

    pub async fn attempt_count(&self) -> usize {
        self.tables.read().await.attempts.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceService for MemoryStore {
    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, PersistenceError> {
        let tables = self.tables.read().await;
        Ok(filter.apply(tables.questions.clone()))
    }

    async fn get_question(&self, question_id: &str) -> Result<Question, PersistenceError> {
        let tables = self.tables.read().await;
        tables
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .cloned()
            .ok_or_else(|| PersistenceError::not_found("question", question_id))
    }

    async fn get_draft(&self, user_id: &str, question_id: &str) -> Result<Option<Draft>, PersistenceError> {
        let tables = self.tables.read().await;
        Ok(tables
            .drafts
            .iter()
            .find(|d| d.user_id == user_id && d.question_id == question_id)
            .cloned())
    }

    async fn list_drafts(&self, user_id: &str) -> Result<Vec<Draft>, PersistenceError> {
        let tables = self.tables.read().await;
        let mut drafts: Vec<Draft> = tables
            .drafts
            .iter()
            .rev()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(drafts)
    }

    async fn save_draft(
        &self,
        user_id: &str,
        question_id: &str,
        star: &StarText,
    ) -> Result<Draft, PersistenceError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        if let Some(draft) = tables
            .drafts
            .iter_mut()
            .find(|d| d.user_id == user_id && d.question_id == question_id)
        {
            draft.situation = star.situation.clone();
            draft.task = star.task.clone();
            draft.action = star.action.clone();
            draft.result = star.result.clone();
            draft.updated_at = Some(now);
            return Ok(draft.clone());
        }

        let draft = Draft {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            question_id: question_id.to_string(),
            situation: star.situation.clone(),
            task: star.task.clone(),
            action: star.action.clone(),
            result: star.result.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        tables.drafts.push(draft.clone());
        Ok(draft)
    }

    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, PersistenceError> {
        let mut tables = self.tables.write().await;

        let created = Attempt {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: attempt.user_id.clone(),
            question_id: attempt.question_id.clone(),
            draft_id: attempt.draft_id.clone(),
            duration: attempt.duration,
            transcript: Some(attempt.transcript.clone()),
            feedback: attempt.feedback.clone(),
            created_at: Some(Utc::now()),
        };
        tables.attempts.push(created.clone());
        Ok(created)
    }

    async fn get_attempt(&self, user_id: &str, attempt_id: &str) -> Result<Attempt, PersistenceError> {
        let tables = self.tables.read().await;
        tables
            .attempts
            .iter()
            .find(|a| a.id == attempt_id && a.user_id == user_id)
            .cloned()
            .ok_or_else(|| PersistenceError::not_found("attempt", attempt_id))
    }

    async fn list_attempts(&self, user_id: &str) -> Result<Vec<Attempt>, PersistenceError> {
        let tables = self.tables.read().await;
        let mut attempts: Vec<Attempt> = tables
            .attempts
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(attempts)
    }

    async fn update_attempt_feedback(
        &self,
        user_id: &str,
        attempt_id: &str,
        transcript: &str,
        feedback: &serde_json::Value,
    ) -> Result<(), PersistenceError> {
        let mut tables = self.tables.write().await;
        let attempt = tables
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id && a.user_id == user_id)
            .ok_or_else(|| PersistenceError::not_found("attempt", attempt_id))?;

        attempt.transcript = Some(transcript.to_string());
        attempt.feedback = Some(feedback.clone());
        Ok(())
    }
}

fn starter_question(number: i32, title: &str, category: &str, difficulty: &str) -> Question {
    Question {
        id: format!("q-{:03}", number),
        title: title.to_string(),
        category: category.to_string(),
        difficulty: Some(difficulty.to_string()),
        description: None,
        question_number: Some(number),
        companies: None,
        tags: None,
        example_situation: None,
        example_task: None,
        example_action: None,
        example_result: None,
    }
}

fn starter_questions() -> Vec<Question> {
    vec![
        starter_question(
            1,
            "Tell me about a time you led a team through a difficult project",
            "Leadership",
            "Medium",
        ),
        starter_question(
            2,
            "Describe a disagreement with a teammate and how you resolved it",
            "Conflict",
            "Easy",
        ),
        starter_question(
            3,
            "Tell me about a time you failed and what you learned",
            "Failure",
            "Medium",
        ),
        starter_question(
            4,
            "Describe a time you had to juggle competing deadlines",
            "Time Management",
            "Easy",
        ),
        starter_question(
            5,
            "Tell me about a time you persuaded someone to change their mind",
            "Influence",
            "Hard",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_draft_updates_existing_row() {
        let store = MemoryStore::seeded();
        let first = store
            .save_draft(
                "user-1",
                "q-001",
                &StarText {
                    situation: Some("Old".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let second = store
            .save_draft(
                "user-1",
                "q-001",
                &StarText {
                    situation: Some("New".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.situation.as_deref(), Some("New"));
        assert_eq!(store.list_drafts("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_scoped_to_their_user() {
        let store = MemoryStore::new();
        let attempt = store
            .create_attempt(&NewAttempt {
                user_id: "user-1".to_string(),
                question_id: "q-001".to_string(),
                draft_id: None,
                duration: 12,
                transcript: "Hello".to_string(),
                feedback: None,
            })
            .await
            .unwrap();

        assert!(store.get_attempt("user-1", &attempt.id).await.is_ok());
        assert!(matches!(
            store.get_attempt("user-2", &attempt.id).await,
            Err(PersistenceError::NotFound { .. })
        ));
    }
}
