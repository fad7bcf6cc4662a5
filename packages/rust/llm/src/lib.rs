//! Client for OpenAI-compatible chat-completions services.
//!
//! Analysts and the narrative writer are remote models reached through
//! `POST {api_base}/chat/completions`. This crate owns the HTTP exchange
//! and the decoding of score replies; deciding what to do when a call
//! fails is left to the caller.

mod parser;

use std::time::Duration;

use jobplanner_shared::{JobPlannerError, LlmConfig, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

pub use parser::{ScoreEntry, extract_json_object, parse_score_reply};

/// User-Agent string for outgoing requests.
const USER_AGENT: &str = concat!("jobplanner/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A chat message with role and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Request body for `/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

/// Response from `/chat/completions`.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// Thin chat-completions client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatClient {
    /// Build a client from the `[llm]` config section.
    ///
    /// `timeout` bounds each HTTP exchange; callers usually add their own
    /// outer deadline as well.
    pub fn new(config: &LlmConfig, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| JobPlannerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: api_key.into(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Send a system + user prompt and return the first choice's content.
    #[instrument(skip_all, fields(model = %model))]
    pub async fn complete(&self, model: &str, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let messages = [ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)];
        self.chat(model, &messages).await
    }

    /// Send an arbitrary message list and return the first choice's content.
    pub async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        if model.trim().is_empty() {
            return Err(JobPlannerError::validation("model name cannot be empty"));
        }
        if messages.is_empty() {
            return Err(JobPlannerError::validation("messages cannot be empty"));
        }

        let body = ChatRequest {
            model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(endpoint = %self.endpoint, messages = messages.len(), "calling model");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| JobPlannerError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let detail: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(JobPlannerError::Collaborator(format!(
                "{model}: HTTP {status}: {detail}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            JobPlannerError::Collaborator(format!("{model}: invalid response body: {e}"))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(JobPlannerError::Collaborator(format!("{model}: empty reply")));
        }

        debug!(chars = content.len(), "model replied");
        Ok(content)
    }
}
