//! Embedding Provider — external collaborator turning text into fixed-length
//! float vectors.
//!
//! The provider is opaque and may fail; callers degrade gracefully. The
//! retriever skips a failed query and completes the batch, and the scorer
//! records the affected requirement as a gap rather than erroring.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider returned no embedding")]
    Empty,
}

/// `text -> fixed-length float vector`. Implemented over HTTP in production
/// and by in-memory stubs in tests.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// HTTP client for an OpenAI-compatible embeddings endpoint.
/// Retries transient failures (429, 5xx) with exponential backoff.
#[derive(Clone)]
pub struct HttpEmbeddingClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl HttpEmbeddingClient {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request_body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = std::time::Duration::from_millis(500 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EmbeddingError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Embeddings API returned {}: {}", status, body);
                last_error = Some(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let parsed: EmbeddingResponse = response.json().await?;
            let vector = parsed
                .data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .ok_or(EmbeddingError::Empty)?;

            debug!("Embedded {} chars into {} dims", text.len(), vector.len());
            return Ok(vector);
        }

        Err(last_error.unwrap_or(EmbeddingError::Empty))
    }
}
