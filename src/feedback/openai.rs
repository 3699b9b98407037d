//! OpenAI chat-completions client for interview feedback

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::generator::{FeedbackError, FeedbackGenerator};
use super::models::{Feedback, FeedbackRequest};
use super::prompt::{build_prompt, parse_feedback};
use crate::config::FeedbackConfig;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct OpenAiFeedback {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl OpenAiFeedback {
    /// Build from config; the key is read from `api_key_env` now, and a
    /// missing key surfaces as `MissingApiKey` on each call
    pub fn from_config(config: &FeedbackConfig) -> Result<Self, FeedbackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeedbackError::Network(e.to_string()))?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty());

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            api_key_env: config.api_key_env.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn completion_request(&self, api_key: &str, prompt: &str) -> RequestBuilder {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        self.client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&body)
    }
}

/// Map a non-2xx reply, preferring the API's own error message
fn api_error(status: u16, body: &str) -> FeedbackError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.to_string(),
    };
    FeedbackError::Api { status, message }
}

fn reply_content(chat: ChatResponse) -> Result<String, FeedbackError> {
    chat.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| FeedbackError::Parse("response had no message content".to_string()))
}

#[async_trait]
impl FeedbackGenerator for OpenAiFeedback {
    async fn generate(&self, request: &FeedbackRequest) -> Result<Feedback, FeedbackError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| FeedbackError::MissingApiKey(self.api_key_env.clone()))?;

        let prompt = build_prompt(request);

        info!(
            "Requesting feedback from {} for \"{}\" ({} chars of transcript)",
            self.model,
            request.question_title,
            request.transcript.len()
        );

        let response = self
            .completion_request(api_key, &prompt)
            .send()
            .await
            .map_err(|e| FeedbackError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| FeedbackError::Parse(e.to_string()))?;
        let content = reply_content(chat)?;

        debug!("Feedback response: {} chars", content.len());
        parse_feedback(&content).map_err(|e| FeedbackError::Parse(e.to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
