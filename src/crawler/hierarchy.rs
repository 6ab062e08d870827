//! Hierarchical crawl engine
//!
//! Walks posts → comments → replies and keeps every entity newer than the
//! watermark. The rules:
//!
//! - Every post is expanded, old or new: comments may be newer than their post.
//! - Each level is filtered independently by `timestamp > watermark`.
//! - Replies listed inline on a comment are resolved one by one.
//! - Within a level, API order is kept.
//! - A post is one unit. If anything in its subtree is malformed the whole
//!   unit is dropped, the post included, and the crawl moves on.

use crate::crawler::source::ContentSource;
use crate::model::{
    is_new, parse_comment, parse_post, parse_reply, Comment, ParseError, Post, Reply,
};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// New entities discovered under one post
#[derive(Debug, Clone, Default)]
pub struct PostUnit {
    /// The post itself, when it is new
    pub post: Option<Post>,
    pub comments: Vec<Comment>,
    pub replies: Vec<Reply>,
    pub comments_seen: usize,
    pub replies_seen: usize,
    /// Paginated or single fetches that ended incomplete
    pub degraded_fetches: usize,
}

/// Result of expanding one post
#[derive(Debug, Clone)]
pub enum PostOutcome {
    Success(PostUnit),
    Failed { post_id: String, reason: String },
}

/// A post whose subtree could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPost {
    pub post_id: String,
    pub reason: String,
}

/// Counters describing one crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub posts_seen: usize,
    pub comments_seen: usize,
    pub replies_seen: usize,
    /// Post payloads that could not be parsed at all
    pub skipped_posts: usize,
    pub failed_posts: Vec<FailedPost>,
    pub degraded_fetches: usize,
}

/// Flat write-set candidates from one crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub replies: Vec<Reply>,
    pub report: CrawlReport,
}

impl CrawlResult {
    /// Folds one post outcome into the result
    ///
    /// Successful units contribute all their entities; failed units
    /// contribute nothing but a [`FailedPost`] entry.
    pub fn absorb(&mut self, outcome: PostOutcome) {
        self.report.posts_seen += 1;

        match outcome {
            PostOutcome::Success(unit) => {
                self.report.comments_seen += unit.comments_seen;
                self.report.replies_seen += unit.replies_seen;
                self.report.degraded_fetches += unit.degraded_fetches;
                self.posts.extend(unit.post);
                self.comments.extend(unit.comments);
                self.replies.extend(unit.replies);
            }
            PostOutcome::Failed { post_id, reason } => {
                self.report.failed_posts.push(FailedPost { post_id, reason });
            }
        }
    }

    pub fn new_entity_count(&self) -> usize {
        self.posts.len() + self.comments.len() + self.replies.len()
    }
}

/// Crawl engine over a [`ContentSource`]
pub struct CrawlEngine<'a> {
    source: &'a dyn ContentSource,
    post_delay: Duration,
}

impl<'a> CrawlEngine<'a> {
    pub fn new(source: &'a dyn ContentSource, post_delay: Duration) -> Self {
        Self { source, post_delay }
    }

    /// Crawls the full hierarchy and returns everything newer than `watermark`
    pub async fn crawl(&self, watermark: DateTime<Utc>) -> CrawlResult {
        let mut result = CrawlResult::default();

        let page = self.source.fetch_posts().await;
        if !page.complete {
            result.report.degraded_fetches += 1;
        }
        tracing::info!("Fetched {} posts", page.records.len());

        for raw in &page.records {
            let post = match parse_post(raw) {
                Ok(post) => post,
                Err(e) => {
                    tracing::warn!("Skipping malformed post: {}", e);
                    result.report.skipped_posts += 1;
                    continue;
                }
            };

            let outcome = self.crawl_post(post, watermark).await;
            if let PostOutcome::Failed { post_id, reason } = &outcome {
                tracing::error!("Error processing post {}: {}", post_id, reason);
            }
            result.absorb(outcome);

            tokio::time::sleep(self.post_delay).await;
        }

        tracing::info!(
            "Crawl found {} new posts, {} new comments, {} new replies ({} failed posts)",
            result.posts.len(),
            result.comments.len(),
            result.replies.len(),
            result.report.failed_posts.len()
        );

        result
    }

    /// Expands one post into its unit of new entities
    pub async fn crawl_post(&self, post: Post, watermark: DateTime<Utc>) -> PostOutcome {
        let post_id = post.id.clone();

        match self.expand_post(post, watermark).await {
            Ok(unit) => PostOutcome::Success(unit),
            Err(e) => PostOutcome::Failed {
                post_id,
                reason: e.to_string(),
            },
        }
    }

    async fn expand_post(
        &self,
        post: Post,
        watermark: DateTime<Utc>,
    ) -> Result<PostUnit, ParseError> {
        let mut unit = PostUnit::default();

        let page = self.source.fetch_comments(&post.id).await;
        if !page.complete {
            unit.degraded_fetches += 1;
        }
        tracing::info!("Fetched {} comments for post {}", page.records.len(), post.id);

        for raw in &page.records {
            let comment = parse_comment(raw, &post.id)?;
            unit.comments_seen += 1;

            for reply_id in &comment.reply_ids {
                let Some(raw_reply) = self.source.fetch_reply(reply_id).await else {
                    tracing::warn!(
                        "Could not resolve reply {} on comment {}",
                        reply_id,
                        comment.id
                    );
                    unit.degraded_fetches += 1;
                    continue;
                };

                let reply = parse_reply(&raw_reply, &post.id, &comment.id)?;
                unit.replies_seen += 1;
                if is_new(reply.timestamp, watermark) {
                    unit.replies.push(reply);
                }
            }

            if is_new(comment.timestamp, watermark) {
                unit.comments.push(comment);
            }
        }

        tracing::debug!(
            "Post {}: {} new comments, {} new replies",
            post.id,
            unit.comments.len(),
            unit.replies.len()
        );

        if is_new(post.timestamp, watermark) {
            unit.post = Some(post);
        }

        Ok(unit)
    }
}
