//! Embedding provider abstraction
//!
//! Defines the [`EmbeddingProvider`] trait and [`OpenAiEmbedder`], which
//! calls an OpenAI-compatible embeddings endpoint.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: `retry-delay-ms * 2^(attempt - 1)`, exponent capped at 5

use crate::config::EmbeddingConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors from the embedding provider
///
/// Any of these reaching the run coordinator is fatal for the run.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("embedding failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Text → fixed-length vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`)
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1536`)
    fn dims(&self) -> usize;

    /// Embeds one text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Embedding provider backed by an OpenAI-compatible HTTP endpoint
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dims: usize,
    api_key: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            dims: config.dims,
            api_key: api_key.to_string(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let mut last_err = String::from("no attempt made");

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay.saturating_mul(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        let vector = parse_embedding_response(&json)?;
                        if vector.len() != self.dims {
                            return Err(EmbeddingError::Dimension {
                                expected: self.dims,
                                actual: vector.len(),
                            });
                        }
                        return Ok(vector);
                    }

                    let body_text = response.text().await.unwrap_or_default();

                    // Rate limited or server error
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(
                            "Embedding API returned {} (attempt {}/{})",
                            status,
                            attempt + 1,
                            self.max_retries + 1
                        );
                        last_err = format!("HTTP {}: {}", status, body_text);
                        continue;
                    }

                    return Err(EmbeddingError::Api {
                        status: status.as_u16(),
                        body: body_text,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Embedding request failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );
                    last_err = e.to_string();
                }
            }
        }

        Err(EmbeddingError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last: last_err,
        })
    }
}

/// Extracts `data[0].embedding` from an embeddings API response
fn parse_embedding_response(json: &Value) -> Result<Vec<f32>, EmbeddingError> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            EmbeddingError::InvalidResponse("missing data[0].embedding".to_string())
        })?;

    embedding
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                EmbeddingError::InvalidResponse(format!("non-numeric component {}", v))
            })
        })
        .collect()
}
