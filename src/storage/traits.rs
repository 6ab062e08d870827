//! Storage traits and error types
//!
//! This module defines the trait interface for the relational store and
//! associated error types.

use crate::model::WriteSet;
use crate::storage::{CommentRow, PostRow, RunRecord, RunStats, WriteCounts};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt value for {key}: {value}")]
    CorruptValue { key: String, value: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for relational store implementations
///
/// The watermark is read once at the start of a run and written once at
/// the end; entity writes for a run are applied together.
pub trait Storage: Send {
    // ===== Watermark =====

    /// Gets the last successful sync time, if any run has completed
    fn get_watermark(&self) -> StorageResult<Option<DateTime<Utc>>>;

    /// Advances the watermark to `at`
    ///
    /// The stored value never moves backward; returns the value now stored.
    fn set_watermark(&mut self, at: DateTime<Utc>) -> StorageResult<DateTime<Utc>>;

    // ===== Entities =====

    /// Upserts every post, comment and reply in one transaction
    ///
    /// Rows are keyed by id and the last write wins, except `replied`,
    /// which is only ever set on insert.
    fn apply_write_set(&mut self, write_set: &WriteSet) -> StorageResult<WriteCounts>;

    /// Gets a post by id
    fn get_post(&self, id: &str) -> StorageResult<Option<PostRow>>;

    /// Gets a comment or reply by id
    fn get_comment(&self, id: &str) -> StorageResult<Option<CommentRow>>;

    /// Counts stored posts
    fn count_posts(&self) -> StorageResult<u64>;

    /// Counts stored top-level comments
    fn count_comments(&self) -> StorageResult<u64>;

    /// Counts stored replies
    fn count_replies(&self) -> StorageResult<u64>;

    // ===== Run History =====

    /// Records the start of a sync run and returns its id
    fn create_run(
        &mut self,
        config_hash: &str,
        watermark_from: Option<DateTime<Utc>>,
    ) -> StorageResult<i64>;

    /// Marks a run completed with its final counters
    fn complete_run(&mut self, run_id: i64, stats: &RunStats) -> StorageResult<()>;

    /// Marks a run failed with the fatal error message
    fn fail_run(&mut self, run_id: i64, message: &str) -> StorageResult<()>;

    /// Gets a run by id
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
