//! Storage module for the relational side of a sync
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - The sync watermark (`metadata` table)
//! - Post, comment and reply upserts
//! - Sync run history

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::SyncError;
use std::path::Path;

/// Metadata key under which the watermark is stored
pub const WATERMARK_KEY: &str = "last_fetch_time";

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SyncError> {
    SqliteStorage::new(path)
}

/// Opens the database read-only for reports
///
/// Returns `Ok(None)` when no database file exists yet, so looking at the
/// state of a fresh install never creates one.
pub fn open_existing_storage(path: &Path) -> Result<Option<SqliteStorage>, SyncError> {
    if !path.exists() {
        return Ok(None);
    }
    SqliteStorage::open_read_only(path).map(Some)
}

/// A stored post
#[derive(Debug, Clone, PartialEq)]
pub struct PostRow {
    pub id: String,
    pub caption: Option<String>,
    pub media_type: Option<String>,
    pub timestamp: String,
    pub like_count: u64,
    pub comments_count: u64,
}

/// A stored comment or reply
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub parent_comment_id: Option<String>,
    pub text: Option<String>,
    pub timestamp: String,
    pub username: String,
    pub replied: bool,
}

impl CommentRow {
    pub fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}

/// Rows written by one `apply_write_set`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub posts: usize,
    pub comments: usize,
    pub replies: usize,
}

impl WriteCounts {
    pub fn total(&self) -> usize {
        self.posts + self.comments + self.replies
    }
}

/// Counters recorded when a run completes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub posts_written: usize,
    pub comments_written: usize,
    pub replies_written: usize,
    pub vectors_written: usize,
    pub failed_posts: usize,
    pub degraded_fetches: usize,
}

/// Represents a sync run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub watermark_from: Option<String>,
    pub stats: RunStats,
    pub error_message: Option<String>,
}

/// Status of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
