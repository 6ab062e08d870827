//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests against the content API, including:
//! - Building the HTTP client
//! - Cursor-following pagination (`paging.next`)
//! - Retry with exponential backoff for transient failures
//! - Error classification
//!
//! Exhausting retries never raises: pagination stops, the records gathered
//! so far are returned, and the [`Page`] is marked incomplete. Callers must
//! treat an incomplete page as possibly missing data.

use crate::config::ApiConfig;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors from a single request attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid JSON from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// Returns true if the same request may succeed when repeated
    ///
    /// | Condition | Retry |
    /// |-----------|-------|
    /// | Network error / timeout | yes |
    /// | HTTP 429 | yes |
    /// | HTTP 5xx | yes |
    /// | Other HTTP 4xx | no |
    /// | Undecodable body | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            Self::Decode { .. } => false,
        }
    }
}

/// Attempt and delay limits for one fetch call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per page or entity
    pub max_retries: u32,
    /// Backoff base; the n-th failure waits `base_delay * 2^n`
    pub base_delay: Duration,
    /// Courtesy delay before following a `next` cursor
    pub page_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.rate_limit_delay(),
            page_delay: config.rate_limit_delay(),
        }
    }

    /// Delay after the `failures`-th consecutive failure
    pub fn backoff(&self, failures: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(failures.min(16)))
    }
}

/// Records gathered by a paginated fetch
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records from every page, in API order
    pub records: Vec<Value>,
    /// False if pagination stopped early because a request kept failing
    pub complete: bool,
}

/// Builds the HTTP client used for the content API
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("social-sync/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Cursor-following fetcher with bounded retry
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches every page starting at `url`
    ///
    /// The first request carries `query`; subsequent requests use the
    /// provider's `next` URL verbatim. A page without a `data` array counts
    /// as zero records. Pagination ends when no `next` cursor remains or a
    /// page cannot be fetched within the retry budget.
    pub async fn fetch_all(&self, url: &str, query: &[(&str, String)]) -> Page {
        let mut page = Page {
            records: Vec::new(),
            complete: true,
        };
        let mut next = Some(url.to_string());
        let mut first = true;

        while let Some(current) = next.take() {
            let params: &[(&str, String)] = if first { query } else { &[] };
            first = false;

            let body = match self.get_with_retry(&current, params).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        "Giving up on {}: {}. Some data may be missing.",
                        redact(&current),
                        e
                    );
                    page.complete = false;
                    break;
                }
            };

            match body.get("data").and_then(|d| d.as_array()) {
                Some(records) => page.records.extend(records.iter().cloned()),
                None => tracing::warn!(
                    "Page from {} has no data array, treating as empty",
                    redact(&current)
                ),
            }

            next = next_cursor(&body);
            if next.is_some() {
                tokio::time::sleep(self.policy.page_delay).await;
            }
        }

        tracing::debug!("Fetched {} record(s) from {}", page.records.len(), redact(url));
        page
    }

    /// Fetches a single entity, retrying transient failures
    ///
    /// Returns `None` once the retry budget is spent or the request fails
    /// permanently.
    pub async fn fetch_one(&self, url: &str, query: &[(&str, String)]) -> Option<Value> {
        match self.get_with_retry(url, query).await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", redact(url), e);
                None
            }
        }
    }

    /// Performs one GET and decodes the JSON body, without retrying
    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        tracing::debug!("GET {}", redact(url));

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: redact(url),
                source: source.without_url(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: redact(url),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|source| FetchError::Transport {
            url: redact(url),
            source: source.without_url(),
        })?;

        serde_json::from_str(&text).map_err(|e| FetchError::Decode {
            url: redact(url),
            message: e.to_string(),
        })
    }

    /// Repeats one request until it succeeds, fails permanently, or the
    /// attempt budget is spent
    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let max_attempts = self.policy.max_retries.max(1);
        let mut failures = 0;

        loop {
            match self.get_json(url, query).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    failures += 1;
                    if failures >= max_attempts {
                        return Err(e);
                    }

                    let delay = self.policy.backoff(failures);
                    tracing::warn!(
                        "Request failed: {}. Retrying ({}/{}) in {:?}",
                        e,
                        failures,
                        max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Extracts the `paging.next` URL, if any
fn next_cursor(body: &Value) -> Option<String> {
    body.get("paging")
        .and_then(|p| p.get("next"))
        .and_then(|n| n.as_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Hides the access token in URLs that end up in logs and errors
pub fn redact(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    if !parsed.query_pairs().any(|(k, _)| k == "access_token") {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "access_token" {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();

    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}
