//! Anthropic Messages API client for the tailored-profile pipeline.
//!
//! ARCHITECTURAL RULE: no other module may call the Anthropic API directly.
//! Callers ask for either plain text (`call_text`) or JSON decoded into a
//! caller-supplied type (`call_json`); the raw wire exchange stays private.
//!
//! Transient failures (429, 5xx, transport errors) are retried on a fixed
//! backoff schedule. Anything else surfaces immediately — the backing model
//! is nondeterministic, so callers must never retry partially.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls. Intentionally hardcoded so prompt
/// tuning and model choice never drift apart.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
/// Backoff before each retry; total attempts = this length + 1.
const RETRY_DELAYS_MS: [u64; 2] = [1000, 2000];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("response contained no text")]
    EmptyContent,
}

impl LlmError {
    /// Worth another attempt: rate limits, server errors, transport faults.
    fn transient(&self) -> bool {
        match self {
            LlmError::Http(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<Block>,
    usage: TokenUsage,
}

#[derive(Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct TokenUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Carried in `AppState` via the profile generator; cheap to clone.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Calls the model and returns the trimmed plain-text content.
    pub async fn call_text(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let text = self.request(prompt, system).await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(trimmed.to_string())
    }

    /// Calls the model and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let text = self.request(prompt, system).await?;
        Ok(serde_json::from_str(strip_json_fences(&text))?)
    }

    /// One prompt in, the first text block out, with transient failures
    /// retried per `RETRY_DELAYS_MS`.
    async fn request(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: [UserMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut delays = RETRY_DELAYS_MS.iter();
        loop {
            match self.send(&body).await {
                Ok(text) => return Ok(text),
                Err(err) if err.transient() => match delays.next() {
                    Some(&ms) => {
                        warn!("Messages API call failed ({err}), retrying in {ms}ms");
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                    None => return Err(err),
                },
                Err(err) => return Err(err),
            }
        }
    }

    async fn send(&self, body: &MessagesRequest<'_>) -> Result<String, LlmError> {
        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&raw)
                .map(|b| b.error.message)
                .unwrap_or(raw);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "Messages API call succeeded"
        );

        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Peels a markdown code fence (```json … ``` or ``` … ```) off model
/// output. Leaves unfenced text untouched.
fn strip_json_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tagged_fence() {
        let wrapped = "```json\n{\"points\": [\"a\"]}\n```";
        assert_eq!(strip_json_fences(wrapped), r#"{"points": ["a"]}"#);
    }

    #[test]
    fn test_strips_bare_fence() {
        let wrapped = "```\n{\"points\": []}\n```";
        assert_eq!(strip_json_fences(wrapped), r#"{"points": []}"#);
    }

    #[test]
    fn test_plain_json_passes_through() {
        let plain = r#"{"summary": "unfenced"}"#;
        assert_eq!(strip_json_fences(plain), plain);
    }

    #[test]
    fn test_unclosed_fence_still_strips_opening() {
        assert_eq!(strip_json_fences("```json\n{\"a\": 1}"), r#"{"a": 1}"#);
    }

    #[test]
    fn test_transient_errors_are_retry_candidates() {
        let api = |status| LlmError::Api {
            status,
            message: String::new(),
        };
        assert!(api(429).transient());
        assert!(api(503).transient());
        assert!(!api(400).transient(), "Client errors never retry");
        assert!(!LlmError::EmptyContent.transient());
    }
}
