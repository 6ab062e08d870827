//! Crawler module for content fetching and sync orchestration
//!
//! This module contains the core sync logic, including:
//! - HTTP fetching with cursor pagination and retry
//! - Content API access behind the `ContentSource` trait
//! - The post → comment → reply crawl
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod hierarchy;
mod source;

pub use coordinator::{stage_writes, Coordinator, RunReport, StagedWrites};
pub use fetcher::{build_http_client, redact, FetchError, Fetcher, Page, RetryPolicy};
pub use hierarchy::{
    CrawlEngine, CrawlReport, CrawlResult, FailedPost, PostOutcome, PostUnit,
};
pub use source::{ContentSource, GraphApiClient, COMMENT_FIELDS, POST_FIELDS, REPLY_FIELDS};

use crate::config::{Config, Credentials};
use crate::embedding::{EmbeddingProvider, OpenAiEmbedder};
use crate::index::PineconeIndex;
use crate::storage::open_storage;
use crate::Result;
use std::path::Path;

/// Runs one complete sync pass against the configured services
///
/// This is the main entry point for a sync. It will:
/// 1. Open the SQLite store
/// 2. Build the content API client and embedding provider
/// 3. Find or create the vector index
/// 4. Run the coordinator once
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `credentials` - Secrets resolved from the environment
/// * `config_hash` - Hash of the config file, recorded on the run row
///
/// # Returns
///
/// * `Ok(RunReport)` - Sync completed and the watermark advanced
/// * `Err(SyncError)` - Sync failed; the watermark is unchanged
pub async fn sync_once(
    config: &Config,
    credentials: &Credentials,
    config_hash: &str,
) -> Result<RunReport> {
    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let source = GraphApiClient::new(&config.api, &credentials.access_token)?;
    let embedder = OpenAiEmbedder::new(&config.embedding, &credentials.embedding_api_key)?;

    tracing::info!(
        "Connecting to vector index '{}' ({} dimensions, model {})",
        config.vector_index.index_name,
        embedder.dims(),
        embedder.model_name()
    );
    let index = PineconeIndex::connect(
        &config.vector_index,
        config.embedding.dims,
        &credentials.vector_index_api_key,
    )
    .await?;

    let mut coordinator = Coordinator::new(
        Box::new(source),
        Box::new(embedder),
        Box::new(index),
        Box::new(storage),
    )
    .with_post_delay(config.api.rate_limit_delay())
    .with_config_hash(config_hash);

    coordinator.run().await
}
