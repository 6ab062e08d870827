//! Run coordinator - one end-to-end sync pass
//!
//! A run is a fixed sequence:
//! 1. Read the watermark
//! 2. Crawl the hierarchy against it
//! 3. Normalize, embed and stage every new entity
//! 4. Apply the relational upserts
//! 5. Upsert the vector batch, if any
//! 6. Advance the watermark
//!
//! Any error out of steps 2-6 is fatal: the run row is marked failed and
//! the watermark stays where it was, so the next run covers the same window.
//! Once the watermark has moved the run has succeeded, even if its run row
//! cannot be marked completed.

use crate::crawler::hierarchy::{CrawlEngine, CrawlReport, CrawlResult};
use crate::crawler::source::ContentSource;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::index::VectorIndex;
use crate::model::{EmbeddableRecord, WriteSet};
use crate::storage::{RunStats, Storage, WriteCounts};
use crate::text::normalize;
use crate::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: i64,
    /// Watermark the run started from; `None` on the first sync
    pub watermark_from: Option<DateTime<Utc>>,
    pub watermark_to: DateTime<Utc>,
    pub crawl: CrawlReport,
    pub writes: WriteCounts,
    pub vectors_written: usize,
    /// New entities whose normalized text was empty
    pub skipped_embeddings: usize,
}

impl RunReport {
    /// Counters persisted on the run row
    pub fn stats(&self) -> RunStats {
        RunStats {
            posts_written: self.writes.posts,
            comments_written: self.writes.comments,
            replies_written: self.writes.replies,
            vectors_written: self.vectors_written,
            failed_posts: self.crawl.failed_posts.len(),
            degraded_fetches: self.crawl.degraded_fetches,
        }
    }
}

/// Write-set built from one crawl
#[derive(Debug, Default)]
pub struct StagedWrites {
    pub write_set: WriteSet,
    pub skipped_embeddings: usize,
}

/// Main sync coordinator structure
pub struct Coordinator {
    source: Box<dyn ContentSource>,
    embedder: Box<dyn EmbeddingProvider>,
    index: Box<dyn VectorIndex>,
    storage: Box<dyn Storage>,
    post_delay: Duration,
    config_hash: String,
}

impl Coordinator {
    pub fn new(
        source: Box<dyn ContentSource>,
        embedder: Box<dyn EmbeddingProvider>,
        index: Box<dyn VectorIndex>,
        storage: Box<dyn Storage>,
    ) -> Self {
        Self {
            source,
            embedder,
            index,
            storage,
            post_delay: Duration::ZERO,
            config_hash: String::new(),
        }
    }

    /// Sets the pause after each post unit
    pub fn with_post_delay(mut self, post_delay: Duration) -> Self {
        self.post_delay = post_delay;
        self
    }

    /// Sets the config hash recorded on each run row
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Runs one sync pass
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - Run completed and the watermark was advanced
    /// * `Err(SyncError)` - Fatal error; the watermark is unchanged
    pub async fn run(&mut self) -> Result<RunReport> {
        let watermark_from = self.storage.get_watermark()?;
        let run_id = self.storage.create_run(&self.config_hash, watermark_from)?;

        match watermark_from {
            Some(w) => tracing::info!("Starting sync run {} from watermark {}", run_id, w),
            None => tracing::info!("Starting sync run {} (first sync)", run_id),
        }

        match self.execute(run_id, watermark_from).await {
            Ok(report) => {
                if let Err(e) = self.storage.complete_run(run_id, &report.stats()) {
                    tracing::warn!("Could not record completion of run {}: {}", run_id, e);
                }
                tracing::info!(
                    "Sync run {} complete: {} posts, {} comments, {} replies, {} vectors; watermark now {}",
                    run_id,
                    report.writes.posts,
                    report.writes.comments,
                    report.writes.replies,
                    report.vectors_written,
                    report.watermark_to
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!("Sync run {} failed: {}", run_id, e);
                if let Err(store_err) = self.storage.fail_run(run_id, &e.to_string()) {
                    tracing::warn!("Could not record failure of run {}: {}", run_id, store_err);
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &mut self,
        run_id: i64,
        watermark_from: Option<DateTime<Utc>>,
    ) -> Result<RunReport> {
        let watermark = watermark_from.unwrap_or(DateTime::<Utc>::MIN_UTC);

        let crawl = CrawlEngine::new(self.source.as_ref(), self.post_delay)
            .crawl(watermark)
            .await;

        let staged = stage_writes(self.embedder.as_ref(), &crawl).await?;
        let writes = self.storage.apply_write_set(&staged.write_set)?;

        let vectors = staged.write_set.vectors();
        let vectors_written = if vectors.is_empty() {
            tracing::info!("No new vectors to upsert");
            0
        } else {
            self.index.upsert(vectors).await?
        };

        let watermark_to = self.storage.set_watermark(Utc::now())?;

        Ok(RunReport {
            run_id,
            watermark_from,
            watermark_to,
            crawl: crawl.report,
            writes,
            vectors_written,
            skipped_embeddings: staged.skipped_embeddings,
        })
    }
}

/// Normalizes and embeds every new entity in `crawl` and stages the writes
///
/// Entities whose text normalizes to nothing are still staged for the
/// relational store but get no vector record. Any embedding error aborts
/// staging.
pub async fn stage_writes(
    embedder: &dyn EmbeddingProvider,
    crawl: &CrawlResult,
) -> std::result::Result<StagedWrites, EmbeddingError> {
    let mut staged = StagedWrites::default();

    for post in &crawl.posts {
        let text = normalize(post.caption.as_deref());
        if let Some(vector) = embed_text(embedder, &text, &post.id).await? {
            staged
                .write_set
                .stage_vector(EmbeddableRecord::for_post(post, text, vector));
        } else {
            staged.skipped_embeddings += 1;
        }
        staged.write_set.stage_post(post.clone());
    }

    for comment in &crawl.comments {
        let text = normalize(comment.text.as_deref());
        if let Some(vector) = embed_text(embedder, &text, &comment.id).await? {
            staged
                .write_set
                .stage_vector(EmbeddableRecord::for_comment(comment, text, vector));
        } else {
            staged.skipped_embeddings += 1;
        }
        staged.write_set.stage_comment(comment.clone());
    }

    for reply in &crawl.replies {
        let text = normalize(reply.text.as_deref());
        if let Some(vector) = embed_text(embedder, &text, &reply.id).await? {
            staged
                .write_set
                .stage_vector(EmbeddableRecord::for_reply(reply, text, vector));
        } else {
            staged.skipped_embeddings += 1;
        }
        staged.write_set.stage_reply(reply.clone());
    }

    tracing::info!(
        "Staged {} entities and {} vectors",
        staged.write_set.entity_count(),
        staged.write_set.vectors().len()
    );

    Ok(staged)
}

async fn embed_text(
    embedder: &dyn EmbeddingProvider,
    text: &str,
    id: &str,
) -> std::result::Result<Option<Vec<f32>>, EmbeddingError> {
    if text.is_empty() {
        tracing::debug!("Entity {} has no text to embed", id);
        return Ok(None);
    }
    embedder.embed(text).await.map(Some)
}
