//! Supabase (PostgREST) persistence client
//!
//! Talks to the hosted `questions`, `drafts`, and `attempts` tables over the
//! REST interface. Filters use PostgREST `eq.` operators; writes ask for the
//! stored row back with `Prefer: return=representation`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

use super::models::{Attempt, Draft, NewAttempt, Question, QuestionFilter, StarText};
use super::service::{PersistenceError, PersistenceService};

const RETURN_REPRESENTATION: &str = "return=representation";

pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
}

/// PostgREST error body
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
}

#[derive(Serialize)]
struct DraftInsert<'a> {
    user_id: &'a str,
    question_id: &'a str,
    #[serde(flatten)]
    star: &'a StarText,
}

#[derive(Serialize)]
struct DraftUpdate<'a> {
    #[serde(flatten)]
    star: &'a StarText,
    updated_at: String,
}

#[derive(Serialize)]
struct FeedbackUpdate<'a> {
    transcript: &'a str,
    feedback: &'a serde_json::Value,
}

impl SupabaseStore {
    pub fn new(url: &str, api_key: String, timeout: Duration) -> Result<Self, PersistenceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PersistenceError::Request(e.to_string()))?;

        info!("Supabase store targeting {}", url);

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// GET every column of the rows matching `filters`
    fn select(&self, table: &str, filters: &[(&str, String)]) -> RequestBuilder {
        self.request(Method::GET, table)
            .query(&[("select", "*")])
            .query(filters)
    }

    /// POST one row and ask for it back
    fn insert<T: Serialize + ?Sized>(&self, table: &str, row: &T) -> RequestBuilder {
        self.request(Method::POST, table)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(row)
    }

    /// PATCH the rows matching `filters` and ask for them back
    fn update<T: Serialize + ?Sized>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        changes: &T,
    ) -> RequestBuilder {
        self.request(Method::PATCH, table)
            .query(filters)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(changes)
    }

    async fn send(builder: RequestBuilder) -> Result<Response, PersistenceError> {
        let response = builder
            .send()
            .await
            .map_err(|e| PersistenceError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = status_error(status.as_u16(), &body);
        error!("Supabase request failed: {}", err);
        Err(err)
    }

    async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, PersistenceError> {
        Self::send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PersistenceError::Decode(e.to_string()))
    }

    async fn fetch_one<T: DeserializeOwned>(
        builder: RequestBuilder,
        entity: &'static str,
        id: &str,
    ) -> Result<T, PersistenceError> {
        let rows: Vec<T> = Self::fetch(builder).await?;
        first_row(rows, entity, id)
    }
}

/// Map a non-2xx response; PostgREST puts the reason in `{"message": ...}`
fn status_error(status: u16, body: &str) -> PersistenceError {
    let message = match serde_json::from_str::<PostgrestError>(body) {
        Ok(parsed) => parsed.message,
        Err(_) => body.to_string(),
    };
    PersistenceError::Status { status, message }
}

/// First returned row, or `entity id` as missing
fn first_row<T>(rows: Vec<T>, entity: &'static str, id: &str) -> Result<T, PersistenceError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| PersistenceError::not_found(entity, id))
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl PersistenceService for SupabaseStore {
    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, PersistenceError> {
        let questions: Vec<Question> = Self::fetch(self.select(
            "questions",
            &[("order", "question_number.asc".to_string())],
        ))
        .await?;

        debug!("Fetched {} questions", questions.len());
        Ok(filter.apply(questions))
    }

    async fn get_question(&self, question_id: &str) -> Result<Question, PersistenceError> {
        Self::fetch_one(
            self.select("questions", &[("id", eq(question_id))]),
            "question",
            question_id,
        )
        .await
    }

    async fn get_draft(&self, user_id: &str, question_id: &str) -> Result<Option<Draft>, PersistenceError> {
        let drafts: Vec<Draft> = Self::fetch(self.select(
            "drafts",
            &[("question_id", eq(question_id)), ("user_id", eq(user_id))],
        ))
        .await?;

        Ok(drafts.into_iter().next())
    }

    async fn list_drafts(&self, user_id: &str) -> Result<Vec<Draft>, PersistenceError> {
        Self::fetch(self.select(
            "drafts",
            &[
                ("user_id", eq(user_id)),
                ("order", "updated_at.desc".to_string()),
            ],
        ))
        .await
    }

    async fn save_draft(
        &self,
        user_id: &str,
        question_id: &str,
        star: &StarText,
    ) -> Result<Draft, PersistenceError> {
        match self.get_draft(user_id, question_id).await? {
            Some(existing) => {
                let update = DraftUpdate {
                    star,
                    updated_at: Utc::now().to_rfc3339(),
                };
                Self::fetch_one(
                    self.update("drafts", &[("id", eq(&existing.id))], &update),
                    "draft",
                    &existing.id,
                )
                .await
            }
            None => {
                let insert = DraftInsert {
                    user_id,
                    question_id,
                    star,
                };
                Self::fetch_one(self.insert("drafts", &insert), "draft", question_id).await
            }
        }
    }

    async fn create_attempt(&self, attempt: &NewAttempt) -> Result<Attempt, PersistenceError> {
        let created: Attempt = Self::fetch_one(
            self.insert("attempts", attempt),
            "attempt",
            &attempt.question_id,
        )
        .await?;

        info!(
            "Attempt {} stored for question {} ({}s)",
            created.id, created.question_id, created.duration
        );
        Ok(created)
    }

    async fn get_attempt(&self, user_id: &str, attempt_id: &str) -> Result<Attempt, PersistenceError> {
        Self::fetch_one(
            self.select(
                "attempts",
                &[("id", eq(attempt_id)), ("user_id", eq(user_id))],
            ),
            "attempt",
            attempt_id,
        )
        .await
    }

    async fn list_attempts(&self, user_id: &str) -> Result<Vec<Attempt>, PersistenceError> {
        Self::fetch(self.select(
            "attempts",
            &[
                ("user_id", eq(user_id)),
                ("order", "created_at.desc".to_string()),
            ],
        ))
        .await
    }

    async fn update_attempt_feedback(
        &self,
        user_id: &str,
        attempt_id: &str,
        transcript: &str,
        feedback: &serde_json::Value,
    ) -> Result<(), PersistenceError> {
        let rows: Vec<Attempt> = Self::fetch(self.update(
            "attempts",
            &[("id", eq(attempt_id)), ("user_id", eq(user_id))],
            &FeedbackUpdate {
                transcript,
                feedback,
            },
        ))
        .await?;

        first_row(rows, "attempt", attempt_id).map(|_| ())
    }
}
