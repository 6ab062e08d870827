//! Pinecone-compatible vector index over HTTP
//!
//! The control plane (`/indexes`) is used once to find or create the
//! index; all writes then go to the data-plane host it reports.

use crate::config::VectorIndexConfig;
use crate::index::{check_dimensions, IndexError, IndexStats, VectorIndex, METRIC};
use crate::model::EmbeddableRecord;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

const API_VERSION: &str = "2024-07";

/// Handle to one serverless index
pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: String,
    dimension: usize,
    batch_size: usize,
}

impl PineconeIndex {
    /// Finds the configured index, creating it if it does not exist
    ///
    /// Fails with [`IndexError::Dimension`] if an existing index was
    /// created with a different dimensionality.
    pub async fn connect(
        config: &VectorIndexConfig,
        dimension: usize,
        api_key: &str,
    ) -> Result<Self, IndexError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let control = config.control_url.trim_end_matches('/');

        let existing = describe_index(&client, control, &config.index_name, api_key).await?;
        let description = match existing {
            Some(description) => description,
            None => {
                tracing::info!(
                    "Index '{}' not found, creating it ({} dimensions, {})",
                    config.index_name,
                    dimension,
                    METRIC
                );
                let body = json!({
                    "name": config.index_name,
                    "dimension": dimension,
                    "metric": METRIC,
                    "spec": {"serverless": {"cloud": config.cloud, "region": config.region}}
                });
                let created = with_headers(client.post(format!("{}/indexes", control)), api_key)
                    .json(&body)
                    .send()
                    .await?;
                read_json(created).await?
            }
        };

        Self::from_description(client, config, &description, dimension, api_key)
    }

    /// Finds the configured index without creating it
    ///
    /// Returns `Ok(None)` if the control plane does not know the index.
    pub async fn find(
        config: &VectorIndexConfig,
        dimension: usize,
        api_key: &str,
    ) -> Result<Option<Self>, IndexError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let control = config.control_url.trim_end_matches('/');

        match describe_index(&client, control, &config.index_name, api_key).await? {
            Some(description) => {
                Self::from_description(client, config, &description, dimension, api_key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn from_description(
        client: Client,
        config: &VectorIndexConfig,
        description: &Value,
        dimension: usize,
        api_key: &str,
    ) -> Result<Self, IndexError> {
        if let Some(existing) = description.get("dimension").and_then(|d| d.as_u64()) {
            if existing as usize != dimension {
                return Err(IndexError::Dimension {
                    id: config.index_name.clone(),
                    expected: dimension,
                    actual: existing as usize,
                });
            }
        }

        let host = description
            .get("host")
            .and_then(|h| h.as_str())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| IndexError::InvalidResponse("index description has no host".to_string()))?;

        Ok(Self::with_host(
            client,
            host,
            api_key,
            dimension,
            config.upsert_batch_size,
        ))
    }

    /// Builds a handle for a known data-plane host
    pub fn with_host(
        client: Client,
        host: &str,
        api_key: &str,
        dimension: usize,
        batch_size: usize,
    ) -> Self {
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };

        Self {
            client,
            host,
            api_key: api_key.to_string(),
            dimension,
            batch_size: batch_size.max(1),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, records: &[EmbeddableRecord]) -> Result<usize, IndexError> {
        if records.is_empty() {
            return Ok(0);
        }
        check_dimensions(records, self.dimension)?;

        let mut written = 0;
        for chunk in records.chunks(self.batch_size) {
            let response = with_headers(
                self.client.post(format!("{}/vectors/upsert", self.host)),
                &self.api_key,
            )
            .json(&json!({ "vectors": chunk }))
            .send()
            .await?;

            let body = read_json(response).await?;
            let count = body
                .get("upsertedCount")
                .and_then(|c| c.as_u64())
                .map(|c| c as usize)
                .unwrap_or(chunk.len());
            tracing::debug!("Upserted {} vectors", count);
            written += count;
        }

        Ok(written)
    }

    async fn describe(&self) -> Result<IndexStats, IndexError> {
        let response = with_headers(
            self.client
                .post(format!("{}/describe_index_stats", self.host)),
            &self.api_key,
        )
        .json(&json!({}))
        .send()
        .await?;

        let body = read_json(response).await?;
        Ok(IndexStats {
            dimension: body
                .get("dimension")
                .and_then(|d| d.as_u64())
                .map(|d| d as usize),
            total_vector_count: body
                .get("totalVectorCount")
                .and_then(|c| c.as_u64())
                .unwrap_or(0),
        })
    }
}

async fn describe_index(
    client: &Client,
    control: &str,
    name: &str,
    api_key: &str,
) -> Result<Option<Value>, IndexError> {
    let response = with_headers(client.get(format!("{}/indexes/{}", control, name)), api_key)
        .send()
        .await?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    read_json(response).await.map(Some)
}

fn with_headers(request: RequestBuilder, api_key: &str) -> RequestBuilder {
    request
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
}

async fn read_json(response: Response) -> Result<Value, IndexError> {
    let status = response.status();
    if !status.is_success() {
        return Err(IndexError::Api {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| IndexError::InvalidResponse(e.to_string()))
}
