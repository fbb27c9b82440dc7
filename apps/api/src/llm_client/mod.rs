//! Anthropic Messages client. The only module that talks to the Claude API.
//!
//! Callers own their prompts and output types; this module sends one user turn, retries
//! transient failures and hands back either the reply text or a parsed JSON value.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
/// Cover-letter prose varies a little between runs; the JSON shape does not.
const TEMPERATURE: f32 = 0.4;
const ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// The model answered, but not with something usable.
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, LlmError::Parse(_) | LlmError::EmptyContent)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Turn<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<Block>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesReply {
    /// All text blocks, concatenated in order.
    fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS << attempt.saturating_sub(1))
}

/// Prefers the API's own error message over the raw body.
fn api_error(status: StatusCode, body: String) -> LlmError {
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}

#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self { http, api_key })
    }

    /// Sends one user turn and returns the reply text. 429 and 5xx are retried with
    /// exponential backoff; other failures return immediately.
    pub async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system,
            messages: [Turn {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error = None;
        for attempt in 0..ATTEMPTS {
            if attempt > 0 {
                let delay = backoff(attempt);
                warn!("Narrative model retry {attempt} in {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .http
                .post(MESSAGES_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let err = api_error(status, text);
                if is_transient(status) {
                    warn!("Anthropic API returned {status}");
                    last_error = Some(err);
                    continue;
                }
                return Err(err);
            }

            let reply: MessagesReply = response.json().await?;
            if let Some(usage) = &reply.usage {
                debug!(
                    "Narrative model tokens: in={} out={}",
                    usage.input_tokens, usage.output_tokens
                );
            }
            return Ok(reply.joined_text());
        }

        Err(last_error.unwrap_or(LlmError::Exhausted { attempts: ATTEMPTS }))
    }

    /// `complete`, then a strict parse of the reply as `T`.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let text = self.complete(prompt, system).await?;
        parse_json_reply(&text)
    }
}

/// Parses a model reply as JSON. Only a surrounding markdown fence is tolerated.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let body = unfence(text);
    if body.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    Ok(serde_json::from_str(body)?)
}

fn unfence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest).trim_start();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
