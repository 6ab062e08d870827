use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Social-Sync
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(rename = "vector-index", default)]
    pub vector_index: VectorIndexConfig,
    pub storage: StorageConfig,
}

/// Remote content API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the Graph API, including the version segment
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable holding the access token
    #[serde(rename = "access-token-env")]
    pub access_token_env: String,

    /// Page size requested for the media listing
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// Delay between pages and between posts, also the backoff base (milliseconds)
    #[serde(rename = "rate-limit-delay-ms")]
    pub rate_limit_delay_ms: u64,

    /// Total attempts per page or entity before giving up
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.instagram.com/v17.0".to_string(),
            access_token_env: "INSTAGRAM_ACCESS_TOKEN".to_string(),
            page_size: 100,
            rate_limit_delay_ms: 1000,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

/// Embedding provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embeddings endpoint (OpenAI-compatible)
    pub endpoint: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Output dimensionality of the model
    pub dims: usize,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Retries after the first attempt for 429/5xx/network failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Backoff base between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            model: "text-embedding-3-small".to_string(),
            dims: 1536,
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_secs: 30,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorIndexConfig {
    /// Control-plane URL used to describe or create the index
    #[serde(rename = "control-url")]
    pub control_url: String,

    /// Name of the single index all records go into
    #[serde(rename = "index-name")]
    pub index_name: String,

    /// Serverless cloud used when the index has to be created
    pub cloud: String,

    /// Serverless region used when the index has to be created
    pub region: String,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Maximum vectors per upsert request
    #[serde(rename = "upsert-batch-size")]
    pub upsert_batch_size: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            control_url: "https://api.pinecone.io".to_string(),
            index_name: "instagram-data".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            api_key_env: "PINECONE_API_KEY".to_string(),
            upsert_batch_size: 100,
        }
    }
}

/// Relational store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
